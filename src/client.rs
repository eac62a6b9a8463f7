//! HTTP client for the document server.
//!
//! Speaks the API served by [`server`](crate::server). Failures carry the
//! server's `error.message` when one is present; callers are not expected
//! to distinguish finer error kinds.

use anyhow::{anyhow, bail, Context, Result};
use percent_encoding::percent_decode_str;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::Deserialize;

use medidoc_core::models::DocumentRecord;

#[derive(Deserialize)]
struct DocumentListResponse {
    documents: Vec<DocumentRecord>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Client for one document server.
#[derive(Clone)]
pub struct DocumentClient {
    http: reqwest::Client,
    base_url: String,
}

impl DocumentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<DocumentRecord> {
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .with_context(|| format!("invalid content type: {}", content_type))?;
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(self.url("/documents"))
            .multipart(form)
            .send()
            .await
            .context("Error uploading document")?;
        let resp = check(resp, "Failed to upload document").await?;
        Ok(resp.json().await?)
    }

    /// All records, newest first.
    pub async fn list(&self) -> Result<Vec<DocumentRecord>> {
        let resp = self
            .http
            .get(self.url("/documents"))
            .send()
            .await
            .context("Error fetching documents")?;
        let resp = check(resp, "Failed to fetch documents").await?;
        let body: DocumentListResponse = resp.json().await?;
        Ok(body.documents)
    }

    /// Bytes of document `id` and the file name the server suggests.
    pub async fn download(&self, id: i64) -> Result<(String, Vec<u8>)> {
        let resp = self
            .http
            .get(self.url(&format!("/documents/{}", id)))
            .send()
            .await
            .context("Error downloading document")?;
        let resp = check(resp, "Failed to download document").await?;

        let filename = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| format!("document-{}.pdf", id));
        let bytes = resp.bytes().await?.to_vec();
        Ok((filename, bytes))
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("/documents/{}", id)))
            .send()
            .await
            .context("Error deleting document")?;
        check(resp, "Failed to delete document").await?;
        Ok(())
    }
}

/// Pass successful responses through; turn failures into an error carrying
/// the server's message, or `fallback` when the body has none.
async fn check(resp: Response, fallback: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let message = resp
        .json::<ErrorBody>()
        .await
        .map(|b| b.error.message)
        .unwrap_or_else(|_| fallback.to_string());

    if status == StatusCode::NOT_FOUND {
        bail!("not found: {}", message);
    }
    Err(anyhow!("{} ({})", message, status))
}

/// Extracts the file name from a `Content-Disposition` value, preferring
/// the UTF-8 `filename*` parameter over the quoted ASCII `filename`.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let params: Vec<&str> = value.split(';').map(str::trim).collect();

    let extended = params.iter().find_map(|param| {
        let encoded = param.strip_prefix("filename*=UTF-8''")?;
        if !well_formed_escapes(encoded) {
            return None;
        }
        percent_decode_str(encoded)
            .decode_utf8()
            .ok()
            .filter(|n| !n.is_empty())
            .map(|n| n.into_owned())
    });
    if extended.is_some() {
        return extended;
    }

    params.iter().find_map(|param| {
        let rest = param.strip_prefix("filename=")?;
        let name = rest.trim_matches('"');
        (!name.is_empty()).then(|| name.to_string())
    })
}

/// Every `%` starts a two-hex-digit escape.
fn well_formed_escapes(encoded: &str) -> bool {
    encoded
        .split('%')
        .skip(1)
        .all(|chunk| chunk.len() >= 2 && chunk.as_bytes()[..2].iter().all(u8::is_ascii_hexdigit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(
            filename_from_disposition("attachment; filename=\"a b.pdf\"").as_deref(),
            Some("a b.pdf")
        );
        assert_eq!(
            filename_from_disposition(
                "attachment; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
            )
            .as_deref(),
            Some("résumé.pdf")
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=\"x.pdf\"; filename*=UTF-8''%ZZ")
                .as_deref(),
            Some("x.pdf")
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[test]
    fn test_malformed_extended_filename_falls_back() {
        for value in [
            "attachment; filename=\"a.pdf\"; filename*=UTF-8''a%+1",
            "attachment; filename=\"a.pdf\"; filename*=UTF-8''a%-1.pdf",
            "attachment; filename=\"a.pdf\"; filename*=UTF-8''a%C3",
            "attachment; filename=\"a.pdf\"; filename*=UTF-8''%C3%28",
        ] {
            assert_eq!(filename_from_disposition(value).as_deref(), Some("a.pdf"), "{}", value);
        }
        assert_eq!(
            filename_from_disposition("attachment; filename*=UTF-8''a%+1"),
            None
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = DocumentClient::new("http://127.0.0.1:5000/");
        assert_eq!(client.url("/documents"), "http://127.0.0.1:5000/documents");
    }
}
