//! Core data models used throughout medfind.
//!
//! These types represent the structured records, unstructured source items,
//! and search hits that flow through the indexing and retrieval pipeline.

use chrono::{DateTime, Utc};

use crate::normalize::normalize;

/// Literal marker rendered for missing field values (matches the upstream
/// data exports, which spell missing cells as `nan`).
pub const MISSING_MARKER: &str = "nan";

/// A single cell value from a tabular source.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Missing,
}

impl FieldValue {
    /// Renderable form, or `None` when the value is missing/blank.
    pub fn as_display(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) if !s.trim().is_empty() => Some(s.clone()),
            FieldValue::Text(_) => None,
            FieldValue::Number(n) => {
                // Integral numbers print without a trailing ".0".
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(format!("{}", n))
                }
            }
            FieldValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

/// An ordered column-name → value mapping for one table row.
pub type RecordFields = Vec<(String, FieldValue)>;

/// One row of the primary knowledge table, with derived search text.
///
/// Records are created in bulk when a dataset is loaded and are immutable
/// afterwards; replacing the dataset rebuilds the whole set.
#[derive(Debug, Clone)]
pub struct StructuredRecord {
    pub fields: RecordFields,
    /// Space-joined concatenation of all text-typed column values.
    pub combined_text: String,
    /// `combined_text` run through the shared normalizer.
    pub normalized_text: String,
}

impl StructuredRecord {
    pub fn from_fields(fields: RecordFields) -> Self {
        let combined_text = fields
            .iter()
            .filter_map(|(_, v)| match v {
                FieldValue::Text(s) if !s.trim().is_empty() => Some(s.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ");
        let normalized_text = normalize(&combined_text);
        Self {
            fields,
            combined_text,
            normalized_text,
        }
    }

    /// Value of the named column, rendered, if present and non-empty.
    pub fn field(&self, column: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .and_then(|(_, v)| v.as_display())
    }

    /// All non-missing values joined with spaces, numbers included.
    /// This is the row's contribution to the unstructured pool.
    pub fn row_text(&self) -> String {
        self.fields
            .iter()
            .filter_map(|(_, v)| v.as_display())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Where a pool item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A row of the primary knowledge table.
    PrimaryRow,
    /// A row of an uploaded secondary table.
    UploadedRow,
    /// Text extracted from an uploaded document.
    DocumentText,
    /// Serialized payload of a remote API response.
    ApiPayload,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::PrimaryRow => "primary-table-row",
            SourceKind::UploadedRow => "uploaded-table-row",
            SourceKind::DocumentText => "document-text",
            SourceKind::ApiPayload => "api-payload-text",
        }
    }
}

/// A unit of unstructured or semi-structured content in the source pool.
///
/// `raw_text` is never empty: ingestion collaborators reject empty
/// extractions before an item reaches the pool.
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub kind: SourceKind,
    /// Filename, URL, or table identifier.
    pub origin: String,
    pub raw_text: String,
    /// Present for table-row kinds only.
    pub fields: Option<RecordFields>,
    pub ingested_at: DateTime<Utc>,
}

/// A match against the structured vector index.
#[derive(Debug, Clone)]
pub struct StructuredHit {
    pub record_index: usize,
    /// Cosine similarity in `[0, 1]`.
    pub score: f64,
    /// 1-based position after ranking.
    pub rank: usize,
}

/// A match against the unstructured source pool.
#[derive(Debug, Clone)]
pub struct SourceHit {
    pub kind: SourceKind,
    pub origin: String,
    /// Token-overlap ratio in `(0, 1]`.
    pub score: f64,
    /// Raw-text excerpt around the first query occurrence.
    pub context: String,
    /// First 500 chars of the item's raw text; dedup key and snippet fallback.
    pub full_text: String,
    /// Structured fields carried over from table-row items.
    pub fields: Option<RecordFields>,
    /// 1-based position after ranking.
    pub rank: usize,
}
