//! Ingestion collaborators: uploaded tables, uploaded documents, and
//! remote API payloads.
//!
//! Each collaborator turns an external input into an in-memory source the
//! pool assembler can pick up on the next query. Empty extractions are
//! rejected here so the pool invariant (raw_text is never empty) holds.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::extract;
use crate::loader;
use crate::models::RecordFields;

/// A secondary table uploaded alongside the primary dataset.
#[derive(Debug, Clone)]
pub struct UploadedTable {
    /// Display name, usually the source file name.
    pub name: String,
    pub rows: Vec<RecordFields>,
    pub ingested_at: DateTime<Utc>,
}

/// Flat text extracted from one uploaded document.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    /// Source file name.
    pub origin: String,
    pub text: String,
    pub ingested_at: DateTime<Utc>,
}

/// One fetched remote payload, kept as pretty-printed JSON text.
#[derive(Debug, Clone)]
pub struct ApiSource {
    pub url: String,
    pub body: String,
    pub ingested_at: DateTime<Utc>,
}

/// Request timeout for remote API fetches.
const API_TIMEOUT_SECS: u64 = 10;

/// Ingest one table file as a secondary table.
pub fn ingest_table(path: &Path) -> Result<UploadedTable> {
    let rows = loader::load_table(path)?;
    Ok(UploadedTable {
        name: file_name(path),
        rows,
        ingested_at: Utc::now(),
    })
}

/// Ingest one document file, extracting its text by extension.
///
/// Extractions that come back empty (a scanned PDF with no text layer, an
/// empty workbook) are rejected rather than silently pooled.
pub fn ingest_document(path: &Path) -> Result<DocumentSource> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    if !extract::is_supported_extension(extension) {
        anyhow::bail!(
            "Unsupported document type: {} (supported: pdf, docx, xlsx, txt, md, csv)",
            path.display()
        );
    }

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    let text = extract::extract_text(&bytes, extension)
        .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
    if text.trim().is_empty() {
        anyhow::bail!("No text could be extracted from {}", path.display());
    }

    Ok(DocumentSource {
        origin: file_name(path),
        text,
        ingested_at: Utc::now(),
    })
}

/// Ingest every supported document under a directory.
///
/// Individual failures are reported to stderr and skipped; one bad file
/// never aborts the batch. Files are visited in sorted order so repeat runs
/// produce the same pool order.
pub fn ingest_document_dir(dir: &Path) -> Result<Vec<DocumentSource>> {
    let mut documents = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let extension = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        if !extract::is_supported_extension(extension) {
            continue;
        }
        match ingest_document(entry.path()) {
            Ok(doc) => documents.push(doc),
            Err(e) => eprintln!("warning: skipping {}: {:#}", entry.path().display(), e),
        }
    }
    Ok(documents)
}

/// Fetch one remote API endpoint and keep its payload as searchable text.
///
/// JSON responses are pretty-printed so field names become matchable
/// tokens; non-JSON responses are kept verbatim.
pub fn fetch_api(url: &str, api_key: Option<&str>) -> Result<ApiSource> {
    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(API_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")?;

    let mut request = client.get(url);
    if let Some(key) = api_key {
        request = request
            .header("Authorization", format!("Bearer {}", key))
            .header("X-API-Key", key);
    }

    let response = request
        .send()
        .with_context(|| format!("Request to {} failed", url))?;
    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("API request to {} returned {}", url, status);
    }

    let raw = response
        .text()
        .with_context(|| format!("Failed to read response body from {}", url))?;
    let body = match serde_json::from_str::<serde_json::Value>(&raw) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or(raw),
        Err(_) => raw,
    };
    if body.trim().is_empty() {
        anyhow::bail!("API response from {} was empty", url);
    }

    Ok(ApiSource {
        url: url.to_string(),
        body,
        ingested_at: Utc::now(),
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
