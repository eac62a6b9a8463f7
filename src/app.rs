//! Wiring of the configured stores into a [`DocumentService`].

use anyhow::{Context, Result};
use std::sync::Arc;

use medidoc_core::DocumentService;

use crate::config::Config;
use crate::db;
use crate::fs_blob::FsBlobStore;
use crate::migrate;
use crate::sqlite_store::SqliteMetadataStore;

/// Opens the SQLite database (applying the schema) and the upload
/// directory named in `config`.
pub async fn open_service(config: &Config) -> Result<DocumentService> {
    std::fs::create_dir_all(&config.storage.root).with_context(|| {
        format!(
            "Failed to create upload directory: {}",
            config.storage.root.display()
        )
    })?;

    let pool = db::connect(config)
        .await
        .with_context(|| format!("Failed to open database: {}", config.db.path.display()))?;
    migrate::apply_schema(&pool).await?;

    let metadata = Arc::new(SqliteMetadataStore::new(pool));
    let blobs = Arc::new(FsBlobStore::new(config.storage.root.clone()));

    Ok(DocumentService::new(metadata, blobs).with_max_upload_bytes(config.upload.max_bytes))
}
