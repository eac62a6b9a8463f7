//! Local filesystem [`BlobStore`].
//!
//! Blobs sit flat in one directory, each file named by its storage key:
//!
//! ```text
//! {root}/
//!   1718000000000-123456789-lab_results.pdf
//!   1718000000042-987654321-scan.pdf
//! ```

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use medidoc_core::error::{DocumentError, Result};
use medidoc_core::naming::{generate_storage_name, is_valid_storage_key};
use medidoc_core::store::{BlobRemoval, BlobStore};

const WRITE_ATTEMPTS: usize = 3;

/// Blob store rooted at a configured directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Option<PathBuf> {
        is_valid_storage_key(key).then(|| self.root.join(key))
    }
}

fn storage(context: &str, e: std::io::Error) -> DocumentError {
    DocumentError::Storage(format!("{}: {}", context, e))
}

async fn write_contents(file: &mut fs::File, bytes: &[u8]) -> Result<()> {
    file.write_all(bytes)
        .await
        .map_err(|e| storage("failed to write blob", e))?;
    file.flush()
        .await
        .map_err(|e| storage("failed to write blob", e))?;
    file.sync_all()
        .await
        .map_err(|e| storage("failed to flush blob", e))
}

/// Best-effort removal of a blob whose write failed part way, so a
/// truncated file never sits under a fresh key.
async fn discard_partial(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => tracing::warn!(path = %path.display(), "removed partially written blob"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "failed to remove partially written blob"
        ),
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn write(&self, bytes: &[u8], suggested_name: &str) -> Result<String> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| storage("failed to create upload directory", e))?;

        for _ in 0..WRITE_ATTEMPTS {
            let key = generate_storage_name(suggested_name);
            let path = self.root.join(&key);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(storage("failed to create blob", e)),
            };

            if let Err(e) = write_contents(&mut file, bytes).await {
                drop(file);
                discard_partial(&path).await;
                return Err(e);
            }
            return Ok(key);
        }

        Err(DocumentError::Storage(format!(
            "could not allocate a unique storage name for {}",
            suggested_name
        )))
    }

    async fn read(&self, storage_path: &str) -> Result<Vec<u8>> {
        let path = self
            .key_path(storage_path)
            .ok_or_else(|| DocumentError::not_found(format!("File not found: {}", storage_path)))?;

        fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                DocumentError::not_found(format!("File not found: {}", storage_path))
            } else {
                storage("failed to read blob", e)
            }
        })
    }

    async fn delete(&self, storage_path: &str) -> Result<BlobRemoval> {
        let Some(path) = self.key_path(storage_path) else {
            return Ok(BlobRemoval::AlreadyAbsent);
        };

        match fs::remove_file(&path).await {
            Ok(()) => Ok(BlobRemoval::Removed),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BlobRemoval::AlreadyAbsent),
            Err(e) => Err(storage("failed to delete blob", e)),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage("failed to list upload directory", e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage("failed to list upload directory", e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            if is_file {
                keys.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(keys)
    }
}
