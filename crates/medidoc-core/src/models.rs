//! Data types that flow through the document service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata describing one stored blob.
///
/// Records are immutable once created; the only transition after insert
/// is deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Store-assigned identifier, never reused after deletion.
    pub id: i64,
    /// Name supplied by the uploading client. Display only.
    pub original_filename: String,
    /// Generated key under which the blob lives, relative to the blob root.
    pub storage_path: String,
    /// Byte length of the stored blob.
    pub size_bytes: i64,
    /// Assigned by the metadata store at insert time.
    pub created_at: DateTime<Utc>,
}

/// Bytes of a stored document paired with the record that names them.
#[derive(Debug, Clone)]
pub struct Download {
    pub record: DocumentRecord,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn filename(&self) -> &str {
        &self.record.original_filename
    }
}

/// Disagreements between the blob directory and the metadata table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DriftReport {
    /// Blob keys no record references (failed insert after a blob write).
    pub orphan_blobs: Vec<String>,
    /// Records whose blob is missing (failed record delete after blob removal).
    pub dangling_records: Vec<DocumentRecord>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_blobs.is_empty() && self.dangling_records.is_empty()
    }
}
