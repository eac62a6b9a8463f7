//! SQLite-backed [`MetadataStore`] implementation.
//!
//! One row per document in the `documents` table created by
//! [`migrate::apply_schema`](crate::migrate::apply_schema). `created_at`
//! is stored as unix milliseconds so rapid uploads still order correctly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use medidoc_core::error::{DocumentError, Result};
use medidoc_core::models::DocumentRecord;
use medidoc_core::store::MetadataStore;

/// SQLite implementation of the [`MetadataStore`] trait.
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn persistence(e: sqlx::Error) -> DocumentError {
    DocumentError::Persistence(e.to_string())
}

fn not_found(id: i64) -> DocumentError {
    DocumentError::not_found(format!("Document not found: {}", id))
}

fn ts_from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        DocumentError::Persistence(format!("created_at out of range: {}", ms))
    })
}

fn record_from_row(row: &SqliteRow) -> Result<DocumentRecord> {
    Ok(DocumentRecord {
        id: row.get("id"),
        original_filename: row.get("original_filename"),
        storage_path: row.get("storage_path"),
        size_bytes: row.get("size_bytes"),
        created_at: ts_from_millis(row.get("created_at"))?,
    })
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn insert(
        &self,
        original_filename: &str,
        storage_path: &str,
        size_bytes: i64,
    ) -> Result<DocumentRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO documents (original_filename, storage_path, size_bytes, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, original_filename, storage_path, size_bytes, created_at
            "#,
        )
        .bind(original_filename)
        .bind(storage_path)
        .bind(size_bytes)
        .bind(Utc::now().timestamp_millis())
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;

        record_from_row(&row)
    }

    async fn list_all(&self) -> Result<Vec<DocumentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, original_filename, storage_path, size_bytes, created_at
            FROM documents
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.iter().map(record_from_row).collect()
    }

    async fn get(&self, id: i64) -> Result<DocumentRecord> {
        let row = sqlx::query(
            "SELECT id, original_filename, storage_path, size_bytes, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        match row {
            Some(row) => record_from_row(&row),
            None => Err(not_found(id)),
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}
