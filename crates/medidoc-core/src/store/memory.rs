//! In-memory [`MetadataStore`] and [`BlobStore`] implementations for
//! testing and embedding.
//!
//! Both use `std::sync::RwLock` for thread safety. The metadata store
//! hands out ids from a counter that never rewinds, so deleted ids are
//! not reused.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{DocumentError, Result};
use crate::models::DocumentRecord;
use crate::naming::{generate_storage_name, is_valid_storage_key};

use super::{BlobRemoval, BlobStore, MetadataStore};

struct MetadataTable {
    next_id: i64,
    rows: BTreeMap<i64, DocumentRecord>,
}

/// In-memory metadata table.
pub struct InMemoryMetadataStore {
    table: RwLock<MetadataTable>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(MetadataTable {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> DocumentError {
    DocumentError::Persistence("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn insert(
        &self,
        original_filename: &str,
        storage_path: &str,
        size_bytes: i64,
    ) -> Result<DocumentRecord> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        if table.rows.values().any(|r| r.storage_path == storage_path) {
            return Err(DocumentError::Persistence(format!(
                "storage path already recorded: {}",
                storage_path
            )));
        }

        let id = table.next_id;
        table.next_id += 1;
        let record = DocumentRecord {
            id,
            original_filename: original_filename.to_string(),
            storage_path: storage_path.to_string(),
            size_bytes,
            created_at: Utc::now(),
        };
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn list_all(&self) -> Result<Vec<DocumentRecord>> {
        let table = self.table.read().map_err(|_| poisoned())?;
        let mut records: Vec<DocumentRecord> = table.rows.values().cloned().collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(records)
    }

    async fn get(&self, id: i64) -> Result<DocumentRecord> {
        let table = self.table.read().map_err(|_| poisoned())?;
        table
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| DocumentError::not_found(format!("document not found: {}", id)))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut table = self.table.write().map_err(|_| poisoned())?;
        table
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DocumentError::not_found(format!("document not found: {}", id)))
    }
}

/// In-memory blob store keyed by generated storage names.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn blob_poisoned() -> DocumentError {
    DocumentError::Storage("in-memory blob lock poisoned".to_string())
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn write(&self, bytes: &[u8], suggested_name: &str) -> Result<String> {
        let mut blobs = self.blobs.write().map_err(|_| blob_poisoned())?;
        let mut key = generate_storage_name(suggested_name);
        while blobs.contains_key(&key) {
            key = generate_storage_name(suggested_name);
        }
        blobs.insert(key.clone(), bytes.to_vec());
        Ok(key)
    }

    async fn read(&self, storage_path: &str) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().map_err(|_| blob_poisoned())?;
        blobs
            .get(storage_path)
            .cloned()
            .ok_or_else(|| DocumentError::not_found(format!("file not found: {}", storage_path)))
    }

    async fn delete(&self, storage_path: &str) -> Result<BlobRemoval> {
        if !is_valid_storage_key(storage_path) {
            return Ok(BlobRemoval::AlreadyAbsent);
        }
        let mut blobs = self.blobs.write().map_err(|_| blob_poisoned())?;
        Ok(match blobs.remove(storage_path) {
            Some(_) => BlobRemoval::Removed,
            None => BlobRemoval::AlreadyAbsent,
        })
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let blobs = self.blobs.read().map_err(|_| blob_poisoned())?;
        Ok(blobs.keys().cloned().collect())
    }
}
