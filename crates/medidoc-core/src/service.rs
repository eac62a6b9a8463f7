//! Document service: upload, list, fetch-for-download, delete.
//!
//! Each operation is a fixed sequence over the two stores with a documented
//! failure policy per step:
//!
//! | Operation | Sequence | If the second write fails |
//! |-----------|----------|---------------------------|
//! | upload | blob `write` → metadata `insert` | blob is orphaned on disk |
//! | delete | metadata `get` → blob `delete` → metadata `delete` | record dangles with no blob |
//!
//! Blob-first ordering means the common failure leaves unreferenced bytes
//! rather than a record that cannot be downloaded. Neither gap is rolled
//! back; [`DocumentService::drift_report`] finds both.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{DocumentError, Result};
use crate::models::{DocumentRecord, Download, DriftReport};
use crate::store::{BlobRemoval, BlobStore, MetadataStore};

/// The only media type accepted for upload.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Default upload ceiling: 50 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Ties a [`MetadataStore`] and a [`BlobStore`] together.
///
/// Cheap to clone; both stores are behind `Arc`.
#[derive(Clone)]
pub struct DocumentService {
    metadata: Arc<dyn MetadataStore>,
    blobs: Arc<dyn BlobStore>,
    max_upload_bytes: u64,
}

impl DocumentService {
    pub fn new(metadata: Arc<dyn MetadataStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            metadata,
            blobs,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Checks an upload without touching either store.
    pub fn validate_upload(&self, size: usize, content_type: Option<&str>) -> Result<()> {
        match content_type {
            Some(PDF_MEDIA_TYPE) => {}
            Some(other) => {
                return Err(DocumentError::validation(format!(
                    "Only PDF files are allowed (got {})",
                    other
                )))
            }
            None => {
                return Err(DocumentError::validation(
                    "Only PDF files are allowed (no content type given)",
                ))
            }
        }

        if size as u64 > self.max_upload_bytes {
            return Err(DocumentError::validation(format!(
                "File size must not exceed {} bytes (got {})",
                self.max_upload_bytes, size
            )));
        }
        Ok(())
    }

    /// Store `bytes` and record them under `original_filename`.
    ///
    /// Validation happens before any blob is written. If the metadata
    /// insert fails the blob stays where it is and the error is returned.
    pub async fn upload(
        &self,
        bytes: &[u8],
        original_filename: &str,
        content_type: Option<&str>,
    ) -> Result<DocumentRecord> {
        self.validate_upload(bytes.len(), content_type)?;

        let storage_path = self.blobs.write(bytes, original_filename).await?;

        let record = match self
            .metadata
            .insert(original_filename, &storage_path, bytes.len() as i64)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    storage_path = %storage_path,
                    error = %e,
                    "metadata insert failed after blob write; blob left orphaned"
                );
                return Err(e);
            }
        };

        tracing::info!(
            id = record.id,
            filename = %record.original_filename,
            size_bytes = record.size_bytes,
            "document uploaded"
        );
        Ok(record)
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<DocumentRecord>> {
        self.metadata.list_all().await
    }

    /// Resolve `id` and read its blob.
    ///
    /// A record whose blob is missing yields `NotFound`, same as a missing
    /// record.
    pub async fn fetch_for_download(&self, id: i64) -> Result<Download> {
        let record = self.metadata.get(id).await?;
        let bytes = self.blobs.read(&record.storage_path).await.map_err(|e| {
            if e.is_not_found() {
                tracing::warn!(
                    id,
                    storage_path = %record.storage_path,
                    "record exists but blob is missing"
                );
                DocumentError::not_found("File not found on server")
            } else {
                e
            }
        })?;
        Ok(Download { record, bytes })
    }

    /// Remove the blob, then the record.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let record = self.metadata.get(id).await?;

        if self.blobs.delete(&record.storage_path).await? == BlobRemoval::AlreadyAbsent {
            tracing::warn!(
                id,
                storage_path = %record.storage_path,
                "blob already absent during delete"
            );
        }

        if let Err(e) = self.metadata.delete(id).await {
            tracing::error!(
                id,
                storage_path = %record.storage_path,
                error = %e,
                "record delete failed after blob removal; record left dangling"
            );
            return Err(e);
        }

        tracing::info!(id, filename = %record.original_filename, "document deleted");
        Ok(())
    }

    /// Compare blob keys with recorded storage paths. Read-only.
    pub async fn drift_report(&self) -> Result<DriftReport> {
        let records = self.metadata.list_all().await?;
        let keys: HashSet<String> = self.blobs.list_keys().await?.into_iter().collect();
        let referenced: HashSet<&str> = records.iter().map(|r| r.storage_path.as_str()).collect();

        let mut orphan_blobs: Vec<String> = keys
            .iter()
            .filter(|k| !referenced.contains(k.as_str()))
            .cloned()
            .collect();
        orphan_blobs.sort();

        let dangling_records = records
            .into_iter()
            .filter(|r| !keys.contains(&r.storage_path))
            .collect();

        Ok(DriftReport {
            orphan_blobs,
            dangling_records,
        })
    }
}
