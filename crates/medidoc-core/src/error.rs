//! Error kinds surfaced by every document operation.

use thiserror::Error;

/// The four failure kinds a document operation can produce.
///
/// Each variant carries a human-readable message that is safe to show to
/// the caller. The HTTP layer maps them to `400`, `404`, `500` and `500`
/// respectively.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Rejected input: wrong media type, oversize payload, missing form fields.
    #[error("{0}")]
    Validation(String),

    /// The requested id or storage path does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The metadata store is unreachable or rejected the write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Disk I/O failure in the blob store.
    #[error("storage error: {0}")]
    Storage(String),
}

impl DocumentError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, DocumentError>;
