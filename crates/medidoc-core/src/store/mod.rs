//! Storage abstractions for medidoc.
//!
//! A document lives in two places: its bytes in a [`BlobStore`] and its
//! bookkeeping row in a [`MetadataStore`]. Neither store knows about the
//! other; [`DocumentService`](crate::service::DocumentService) sequences
//! them.
//!
//! Implementations must be `Send + Sync` to be shared across request
//! handlers.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::DocumentRecord;

/// Durable table of [`DocumentRecord`]s.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert`](MetadataStore::insert) | Create a record with a fresh id and timestamp |
/// | [`list_all`](MetadataStore::list_all) | Snapshot of all records, newest first |
/// | [`get`](MetadataStore::get) | Fetch one record by id |
/// | [`delete`](MetadataStore::delete) | Remove one record by id |
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Create a record. The store assigns `id` and `created_at`.
    ///
    /// Fails with `Persistence` if the store is unreachable or
    /// `storage_path` is already taken.
    async fn insert(
        &self,
        original_filename: &str,
        storage_path: &str,
        size_bytes: i64,
    ) -> Result<DocumentRecord>;

    /// All records ordered by `created_at` descending, ties by `id` descending.
    async fn list_all(&self) -> Result<Vec<DocumentRecord>>;

    /// Fails with `NotFound` when no record has this id.
    async fn get(&self, id: i64) -> Result<DocumentRecord>;

    /// Fails with `NotFound` when no record has this id.
    async fn delete(&self, id: i64) -> Result<()>;
}

/// Outcome of [`BlobStore::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobRemoval {
    Removed,
    /// Nothing was stored under the key; the desired end state already holds.
    AlreadyAbsent,
}

/// Byte storage addressed by generated keys.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` under a new key derived from `suggested_name` and
    /// return that key. Never overwrites an existing blob.
    async fn write(&self, bytes: &[u8], suggested_name: &str) -> Result<String>;

    /// Fails with `NotFound` if nothing is stored under `storage_path`.
    async fn read(&self, storage_path: &str) -> Result<Vec<u8>>;

    async fn delete(&self, storage_path: &str) -> Result<BlobRemoval>;

    /// Every key currently stored, in no particular order.
    async fn list_keys(&self) -> Result<Vec<String>>;
}
