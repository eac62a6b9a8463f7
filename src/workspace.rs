//! Client document workspace.
//!
//! The user-facing layer over the four document operations plus intake
//! submission. A [`Workspace`] talks either to a local
//! [`DocumentService`] (same machine, same config) or to a running server
//! through [`DocumentClient`]. The `run_*` functions are the CLI entry
//! points and print to stdout.

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use std::path::{Path, PathBuf};

use medidoc_core::intake::PatientIntake;
use medidoc_core::models::DocumentRecord;
use medidoc_core::naming::FALLBACK_NAME;
use medidoc_core::service::PDF_MEDIA_TYPE;
use medidoc_core::DocumentService;

use crate::client::DocumentClient;
use crate::intake_pdf;

/// Where document operations are sent.
pub enum Workspace {
    Local(DocumentService),
    Remote(DocumentClient),
}

impl Workspace {
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> Result<DocumentRecord> {
        match self {
            Workspace::Local(svc) => Ok(svc.upload(&bytes, filename, Some(content_type)).await?),
            Workspace::Remote(client) => client.upload(bytes, filename, content_type).await,
        }
    }

    /// Upload a file from disk under its own name. The media type is
    /// inferred from the extension unless given.
    pub async fn upload_file(
        &self,
        path: &Path,
        content_type: Option<&str>,
    ) -> Result<DocumentRecord> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| FALLBACK_NAME.to_string());
        let content_type = content_type.unwrap_or_else(|| infer_content_type(path));
        self.upload(bytes, &filename, content_type).await
    }

    pub async fn list(&self) -> Result<Vec<DocumentRecord>> {
        match self {
            Workspace::Local(svc) => Ok(svc.list().await?),
            Workspace::Remote(client) => client.list().await,
        }
    }

    /// Suggested file name and bytes of document `id`.
    pub async fn download(&self, id: i64) -> Result<(String, Vec<u8>)> {
        match self {
            Workspace::Local(svc) => {
                let dl = svc.fetch_for_download(id).await?;
                Ok((dl.record.original_filename, dl.bytes))
            }
            Workspace::Remote(client) => client.download(id).await,
        }
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        match self {
            Workspace::Local(svc) => Ok(svc.delete(id).await?),
            Workspace::Remote(client) => client.delete(id).await,
        }
    }

    /// Validate, render and upload an intake form as a PDF.
    pub async fn submit_intake(&self, form: &PatientIntake) -> Result<DocumentRecord> {
        form.validate()?;
        let pdf = intake_pdf::render(form, Local::now())?;
        let filename = form.upload_filename(Utc::now());
        self.upload(pdf, &filename, PDF_MEDIA_TYPE).await
    }
}

/// Media type for a local file: PDF by extension, otherwise opaque bytes.
pub fn infer_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => PDF_MEDIA_TYPE,
        _ => "application/octet-stream",
    }
}

pub fn load_intake(path: &Path) -> Result<PatientIntake> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read intake form: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse intake form: {}", path.display()))
}

fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes <= 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

fn print_record(rec: &DocumentRecord) {
    println!("id:           {}", rec.id);
    println!("filename:     {}", rec.original_filename);
    println!("size:         {}", format_size(rec.size_bytes));
    println!("created_at:   {}", rec.created_at.format("%Y-%m-%dT%H:%M:%SZ"));
    println!("storage_path: {}", rec.storage_path);
}

pub async fn run_upload(ws: &Workspace, path: &Path, content_type: Option<&str>) -> Result<()> {
    let rec = ws.upload_file(path, content_type).await?;
    println!("Document uploaded successfully.");
    print_record(&rec);
    Ok(())
}

pub async fn run_list(ws: &Workspace, json: bool) -> Result<()> {
    let docs = ws.list().await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "documents": docs }))?
        );
        return Ok(());
    }

    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    println!("{:>6}  {:<20}  {:>10}  FILENAME", "ID", "CREATED", "SIZE");
    for d in &docs {
        println!(
            "{:>6}  {:<20}  {:>10}  {}",
            d.id,
            d.created_at.format("%Y-%m-%d %H:%M:%S"),
            format_size(d.size_bytes),
            d.original_filename
        );
    }
    println!("\n{} document(s)", docs.len());
    Ok(())
}

/// Saves document `id`. `out` may be a file path or an existing directory;
/// by default the original file name in the current directory is used.
pub async fn run_download(ws: &Workspace, id: i64, out: Option<PathBuf>) -> Result<()> {
    let (filename, bytes) = ws.download(id).await?;
    let safe_name = medidoc_core::naming::sanitize_filename(&filename);

    let target = match out {
        Some(p) if p.is_dir() => p.join(&safe_name),
        Some(p) => p,
        None => PathBuf::from(&safe_name),
    };

    std::fs::write(&target, &bytes)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    println!("Saved {} ({}) to {}", filename, format_size(bytes.len() as i64), target.display());
    Ok(())
}

pub async fn run_delete(ws: &Workspace, id: i64) -> Result<()> {
    ws.delete(id).await?;
    println!("Document {} deleted successfully.", id);
    Ok(())
}

pub fn run_intake_render(form_path: &Path, out: Option<PathBuf>) -> Result<()> {
    let form = load_intake(form_path)?;
    form.validate()?;
    let pdf = intake_pdf::render(&form, Local::now())?;
    let target = out.unwrap_or_else(|| PathBuf::from(form.upload_filename(Utc::now())));
    std::fs::write(&target, &pdf)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    println!("Rendered intake form to {} ({})", target.display(), format_size(pdf.len() as i64));
    Ok(())
}

pub async fn run_intake_submit(ws: &Workspace, form_path: &Path) -> Result<()> {
    let form = load_intake(form_path)?;
    let rec = ws.submit_intake(&form).await?;
    println!("Document generated and uploaded successfully.");
    print_record(&rec);
    Ok(())
}

/// Prints blob/record disagreements. Changes nothing.
pub async fn run_check(svc: &DocumentService) -> Result<()> {
    let report = svc.drift_report().await?;
    if report.is_clean() {
        println!("ok: uploads and records agree");
        return Ok(());
    }

    if !report.orphan_blobs.is_empty() {
        println!("Orphan blobs (no record): {}", report.orphan_blobs.len());
        for key in &report.orphan_blobs {
            println!("  {}", key);
        }
    }
    if !report.dangling_records.is_empty() {
        println!("Dangling records (blob missing): {}", report.dangling_records.len());
        for rec in &report.dangling_records {
            println!("  {}  {}  {}", rec.id, rec.original_filename, rec.storage_path);
        }
    }
    Ok(())
}
