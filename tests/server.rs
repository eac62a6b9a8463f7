//! HTTP API tests against a server running in-process.

use medidoc::client::DocumentClient;
use medidoc::config::Config;
use medidoc::server;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tempfile::TempDir;

const TEN_BYTES: &[u8] = b"%PDF-1.4\n\n";

fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn wait_for_server(port: u16) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{}/health", port);
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        if let Ok(resp) = client.get(&url).send().await {
            if resp.status().is_success() {
                return;
            }
        }
    }
    panic!("Server did not become ready within 5 seconds");
}

fn test_config_with_port(tmp: &TempDir, port: u16) -> Config {
    let mut cfg = Config::minimal(tmp.path());
    cfg.server.bind = format!("127.0.0.1:{}", port);
    cfg
}

async fn start(cfg: Config) -> (tokio::task::JoinHandle<()>, String) {
    let port: u16 = cfg
        .server
        .bind
        .rsplit(':')
        .next()
        .unwrap()
        .parse()
        .unwrap();
    let handle = tokio::spawn(async move {
        server::run_server(&cfg).await.unwrap();
    });
    wait_for_server(port).await;
    (handle, format!("http://127.0.0.1:{}", port))
}

fn file_form(bytes: &[u8], filename: &str, content_type: &str) -> Form {
    let part = Part::bytes(bytes.to_vec())
        .file_name(filename.to_string())
        .mime_str(content_type)
        .unwrap();
    Form::new().part("file", part)
}

fn blob_count(tmp: &TempDir) -> usize {
    match std::fs::read_dir(tmp.path().join("uploads")) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}

#[tokio::test]
async fn test_document_lifecycle_over_http() {
    let tmp = TempDir::new().unwrap();
    let (handle, base) = start(test_config_with_port(&tmp, find_free_port())).await;
    let http = reqwest::Client::new();

    let resp = http
        .post(format!("{}/documents", base))
        .multipart(file_form(TEN_BYTES, "a.pdf", "application/pdf"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["original_filename"], "a.pdf");
    assert_eq!(created["size_bytes"], 10);
    let id = created["id"].as_i64().unwrap();
    assert!(created["storage_path"].as_str().unwrap().ends_with("-a.pdf"));

    let listed: Value = http
        .get(format!("{}/documents", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let docs = listed["documents"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["id"], id);

    let resp = http
        .get(format!("{}/documents/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"a.pdf\""
    );
    assert_eq!(resp.bytes().await.unwrap().as_ref(), TEN_BYTES);

    let resp = http
        .delete(format!("{}/documents/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Document deleted successfully");
    assert_eq!(blob_count(&tmp), 0);

    let resp = http
        .delete(format!("{}/documents/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = http
        .get(format!("{}/documents/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    handle.abort();
}

#[tokio::test]
async fn test_upload_alias_route() {
    let tmp = TempDir::new().unwrap();
    let (handle, base) = start(test_config_with_port(&tmp, find_free_port())).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/documents/upload", base))
        .multipart(file_form(TEN_BYTES, "b.pdf", "application/pdf"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    handle.abort();
}

#[tokio::test]
async fn test_rejected_uploads_write_nothing() {
    let tmp = TempDir::new().unwrap();
    let mut cfg = test_config_with_port(&tmp, find_free_port());
    cfg.upload.max_bytes = 16;
    let (handle, base) = start(cfg).await;
    let http = reqwest::Client::new();

    let resp = http
        .post(format!("{}/documents", base))
        .multipart(file_form(b"hello", "notes.txt", "text/plain"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Only PDF files are allowed"));

    let resp = http
        .post(format!("{}/documents", base))
        .multipart(file_form(&[b'x'; 32], "big.pdf", "application/pdf"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("File size must not exceed"));

    // Past the request body limit, not just the upload ceiling
    let resp = http
        .post(format!("{}/documents", base))
        .multipart(file_form(&vec![b'x'; 3 * 1024 * 1024], "huge.pdf", "application/pdf"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert_eq!(
        body["error"]["message"],
        "File size must not exceed 16 bytes"
    );

    let resp = http
        .post(format!("{}/documents", base))
        .multipart(Form::new().text("note", "no file here"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "No file uploaded");

    assert_eq!(blob_count(&tmp), 0);
    let listed: Value = http
        .get(format!("{}/documents", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed["documents"].as_array().unwrap().is_empty());

    handle.abort();
}

#[tokio::test]
async fn test_non_numeric_id_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let (handle, base) = start(test_config_with_port(&tmp, find_free_port())).await;

    let resp = reqwest::Client::new()
        .get(format!("{}/documents/abc", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    handle.abort();
}

#[tokio::test]
async fn test_document_client_round_trip() {
    let tmp = TempDir::new().unwrap();
    let (handle, base) = start(test_config_with_port(&tmp, find_free_port())).await;
    let client = DocumentClient::new(format!("{}/", base));

    let first = client
        .upload(TEN_BYTES.to_vec(), "first.pdf", "application/pdf")
        .await
        .unwrap();
    let second = client
        .upload(TEN_BYTES.to_vec(), "second-scan.pdf", "application/pdf")
        .await
        .unwrap();

    let docs = client.list().await.unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0].id, second.id, "newest first");
    assert_eq!(docs[1].id, first.id);

    let (name, bytes) = client.download(second.id).await.unwrap();
    assert_eq!(name, "second-scan.pdf");
    assert_eq!(bytes, TEN_BYTES);

    client.delete(first.id).await.unwrap();
    let err = client.delete(first.id).await.unwrap_err();
    assert!(err.to_string().starts_with("not found:"), "{}", err);

    let err = client
        .upload(b"hi".to_vec(), "x.txt", "text/plain")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Only PDF files are allowed"));

    handle.abort();
}
