//! Document HTTP server.
//!
//! Exposes the [`DocumentService`] operations as a small JSON + multipart
//! API consumed by the browser client and by [`DocumentClient`](crate::client::DocumentClient).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST`   | `/documents` | Upload one PDF (multipart field `file`), returns `201` + record |
//! | `POST`   | `/documents/upload` | Same as above, kept for older clients |
//! | `GET`    | `/documents` | `{ "documents": [...] }`, newest first |
//! | `GET`    | `/documents/{id}` | Raw bytes as an attachment named after the original file |
//! | `DELETE` | `/documents/{id}` | Remove blob and record |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Document not found: 7" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser client
//! can be served from a different origin.

use anyhow::Context;
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use medidoc_core::models::DocumentRecord;
use medidoc_core::naming::FALLBACK_NAME;
use medidoc_core::service::PDF_MEDIA_TYPE;
use medidoc_core::{DocumentError, DocumentService};

use crate::app::open_service;
use crate::config::Config;

/// Allowance for multipart boundaries and part headers on top of the
/// upload ceiling.
const MULTIPART_OVERHEAD: u64 = 1024 * 1024;

/// Bytes escaped in an RFC 5987 `filename*` value: everything except
/// alphanumerics and `attr-char` punctuation.
const RFC5987_ATTR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    documents: DocumentService,
}

/// Opens the configured stores and serves the API on `[server].bind`.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = open_service(config).await?;
    let app = router(service);

    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!(
        addr = %bind_addr,
        db = %config.db.path.display(),
        uploads = %config.storage.root.display(),
        "document server listening"
    );
    println!("Document server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the router over an already-opened service.
pub fn router(service: DocumentService) -> Router {
    let body_limit = service
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD)
        .try_into()
        .unwrap_or(usize::MAX);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/documents", get(handle_list).post(handle_upload))
        .route("/documents/upload", post(handle_upload))
        .route(
            "/documents/{id}",
            get(handle_download).delete(handle_delete),
        )
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState {
            documents: service,
        })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Validation(msg) => bad_request(msg),
            DocumentError::NotFound(msg) => not_found(msg),
            DocumentError::Persistence(_) | DocumentError::Storage(_) => {
                tracing::error!(error = %err, "document operation failed");
                internal(err.to_string())
            }
        }
    }
}

fn multipart_error(err: MultipartError, max_upload_bytes: u64) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        bad_request(format!(
            "File size must not exceed {} bytes",
            max_upload_bytes
        ))
    } else {
        bad_request(err.body_text())
    }
}

fn parse_id(raw: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| not_found(format!("Document not found: {}", raw)))
}

/// `Content-Disposition` value naming the attachment after `filename`.
///
/// The quoted `filename` is ASCII-only with quotes, backslashes and control
/// characters replaced; non-ASCII names additionally get an RFC 5987
/// `filename*` parameter.
pub fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();

    if filename.is_ascii() {
        return format!("attachment; filename=\"{}\"", ascii);
    }

    let encoded = utf8_percent_encode(filename, RFC5987_ATTR);
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii, encoded
    )
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /documents ============

/// Handler for `POST /documents`.
///
/// Reads the first multipart field named `file`. Other fields are ignored.
/// A part without a file name is stored as `document.pdf`.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocumentRecord>), AppError> {
    let max = state.documents.max_upload_bytes();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_NAME)
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, max))?;
        upload = Some((filename, content_type, bytes));
        break;
    }

    let (filename, content_type, bytes) = upload.ok_or_else(|| bad_request("No file uploaded"))?;

    let record = state
        .documents
        .upload(&bytes, &filename, content_type.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

// ============ GET /documents ============

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<DocumentRecord>,
}

async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let documents = state.documents.list().await?;
    Ok(Json(DocumentListResponse { documents }))
}

// ============ GET /documents/{id} ============

async fn handle_download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id)?;
    let download = state.documents.fetch_for_download(id).await?;

    let disposition = HeaderValue::from_str(&content_disposition(download.filename()))
        .map_err(|e| internal(format!("invalid Content-Disposition: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(PDF_MEDIA_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}

// ============ DELETE /documents/{id} ============

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    state.documents.delete(id).await?;
    Ok(Json(MessageResponse {
        message: "Document deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("lab results.pdf"),
            "attachment; filename=\"lab results.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_escapes_quotes() {
        assert_eq!(
            content_disposition("a\"b\\c.pdf"),
            "attachment; filename=\"a_b_c.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_non_ascii() {
        let value = content_disposition("résumé.pdf");
        assert!(value.starts_with("attachment; filename=\"r_sum_.pdf\""));
        assert!(value.ends_with("filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }

    #[test]
    fn test_content_disposition_keeps_attr_chars() {
        let value = content_disposition("ü a+b~c.pdf");
        assert!(
            value.ends_with("filename*=UTF-8''%C3%BC%20a+b~c.pdf"),
            "{}",
            value
        );
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").ok(), Some(42));
        assert_eq!(parse_id("abc").err().map(|e| e.status), Some(StatusCode::NOT_FOUND));
    }
}
