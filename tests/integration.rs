use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn medidoc_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("medidoc");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(files_dir.join("a.pdf"), b"%PDF-1.4\n\n").unwrap();
    fs::write(files_dir.join("notes.txt"), b"plain text").unwrap();
    fs::write(
        files_dir.join("intake.toml"),
        r#"
full_name = "Jane Doe"
date_of_birth = "1990-06-15"
gender = "female"
allergies = "Penicillin"
report_type = "blood_test"
description = "Lipid panel follow-up"
consent = true
"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/medidoc.sqlite"

[storage]
root = "{root}/data/uploads"

[server]
bind = "127.0.0.1:5999"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("medidoc.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_medidoc(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = medidoc_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run medidoc binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn files(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("files")
}

fn list_json(config_path: &Path) -> serde_json::Value {
    let (stdout, stderr, success) = run_medidoc(config_path, &["list", "--json"]);
    assert!(success, "list failed: stderr={}", stderr);
    serde_json::from_str(&stdout).unwrap()
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_medidoc(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    let root = config_path.parent().unwrap().parent().unwrap();
    assert!(root.join("data/medidoc.sqlite").exists());
    assert!(root.join("data/uploads").is_dir());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_medidoc(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_medidoc(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_upload_list_download_delete() {
    let (tmp, config_path) = setup_test_env();
    let pdf = files(&config_path).join("a.pdf");

    let (stdout, stderr, success) = run_medidoc(&config_path, &["upload", pdf.to_str().unwrap()]);
    assert!(success, "upload failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("uploaded successfully"));

    let listed = list_json(&config_path);
    let docs = listed["documents"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0]["original_filename"], "a.pdf");
    assert_eq!(docs[0]["size_bytes"], 10);
    let id = docs[0]["id"].as_i64().unwrap().to_string();

    let out = tmp.path().join("downloaded.pdf");
    let (_, stderr, success) = run_medidoc(
        &config_path,
        &["download", &id, "--out", out.to_str().unwrap()],
    );
    assert!(success, "download failed: stderr={}", stderr);
    assert_eq!(fs::read(&out).unwrap(), b"%PDF-1.4\n\n");

    let (stdout, stderr, success) = run_medidoc(&config_path, &["delete", &id]);
    assert!(success, "delete failed: stderr={}", stderr);
    assert!(stdout.contains("deleted"));

    let listed = list_json(&config_path);
    assert!(listed["documents"].as_array().unwrap().is_empty());

    let (_, _, success) = run_medidoc(&config_path, &["delete", &id]);
    assert!(!success, "second delete should fail");
}

#[test]
fn test_upload_non_pdf_rejected() {
    let (_tmp, config_path) = setup_test_env();
    let txt = files(&config_path).join("notes.txt");

    let (_, stderr, success) = run_medidoc(&config_path, &["upload", txt.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("Only PDF files are allowed"), "stderr={}", stderr);

    let listed = list_json(&config_path);
    assert!(listed["documents"].as_array().unwrap().is_empty());
}

#[test]
fn test_download_unknown_id_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_medidoc(&config_path, &["init"]);

    let (_, stderr, success) = run_medidoc(&config_path, &["download", "4242"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr={}", stderr);
}

#[test]
fn test_intake_render_writes_pdf() {
    let (tmp, config_path) = setup_test_env();
    let form = files(&config_path).join("intake.toml");
    let out = tmp.path().join("intake.pdf");

    let (stdout, stderr, success) = run_medidoc(
        &config_path,
        &["intake", "render", form.to_str().unwrap(), "--out", out.to_str().unwrap()],
    );
    assert!(success, "render failed: stdout={}, stderr={}", stdout, stderr);
    assert!(fs::read(&out).unwrap().starts_with(b"%PDF"));
}

#[test]
fn test_intake_submit_then_check_clean() {
    let (_tmp, config_path) = setup_test_env();
    let form = files(&config_path).join("intake.toml");

    let (stdout, stderr, success) =
        run_medidoc(&config_path, &["intake", "submit", form.to_str().unwrap()]);
    assert!(success, "submit failed: stdout={}, stderr={}", stdout, stderr);

    let listed = list_json(&config_path);
    let docs = listed["documents"].as_array().unwrap();
    assert_eq!(docs.len(), 1);
    assert!(docs[0]["original_filename"]
        .as_str()
        .unwrap()
        .starts_with("medical_document_jane_doe_"));

    let (stdout, _, success) = run_medidoc(&config_path, &["check"]);
    assert!(success);
    assert!(stdout.contains("ok"));
}

#[test]
fn test_check_reports_orphan_blob() {
    let (_tmp, config_path) = setup_test_env();
    run_medidoc(&config_path, &["init"]);

    let uploads = config_path.parent().unwrap().parent().unwrap().join("data/uploads");
    fs::write(uploads.join("stray.pdf"), b"x").unwrap();

    let (stdout, _, success) = run_medidoc(&config_path, &["check"]);
    assert!(success);
    assert!(stdout.contains("Orphan blobs"));
    assert!(stdout.contains("stray.pdf"));
}
