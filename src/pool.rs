//! Unstructured source pool assembly.
//!
//! The pool is a flat, ordered list of [`SourceItem`]s rebuilt from scratch
//! on every search call: primary table rows first, then uploaded-table rows,
//! then document texts, then API payloads. Rebuilding wholesale trades
//! recomputation cost for the invariant that newly ingested sources are
//! searchable immediately, with no reindex step or staleness window.
//!
//! No filtering and no deduplication happens here; that is the ranker's
//! job. Individual malformed items (rows whose values are all missing) are
//! skipped without aborting the rest of the assembly.

use crate::ingest::{ApiSource, DocumentSource, UploadedTable};
use crate::models::{SourceItem, SourceKind, StructuredRecord};

/// Rebuild the pool from every collaborator's current contents.
pub fn assemble(
    primary: &[StructuredRecord],
    primary_origin: &str,
    tables: &[UploadedTable],
    documents: &[DocumentSource],
    api_payloads: &[ApiSource],
) -> Vec<SourceItem> {
    let mut pool = Vec::new();
    let now = chrono::Utc::now();

    for rec in primary {
        let raw_text = rec.row_text();
        if raw_text.is_empty() {
            continue;
        }
        pool.push(SourceItem {
            kind: SourceKind::PrimaryRow,
            origin: primary_origin.to_string(),
            raw_text,
            fields: Some(rec.fields.clone()),
            ingested_at: now,
        });
    }

    for table in tables {
        for row in &table.rows {
            let rec = StructuredRecord::from_fields(row.clone());
            let raw_text = rec.row_text();
            if raw_text.is_empty() {
                continue;
            }
            pool.push(SourceItem {
                kind: SourceKind::UploadedRow,
                origin: table.name.clone(),
                raw_text,
                fields: Some(row.clone()),
                ingested_at: table.ingested_at,
            });
        }
    }

    for doc in documents {
        pool.push(SourceItem {
            kind: SourceKind::DocumentText,
            origin: doc.origin.clone(),
            raw_text: doc.text.clone(),
            fields: None,
            ingested_at: doc.ingested_at,
        });
    }

    for api in api_payloads {
        pool.push(SourceItem {
            kind: SourceKind::ApiPayload,
            origin: api.url.clone(),
            raw_text: api.body.clone(),
            fields: None,
            ingested_at: api.ingested_at,
        });
    }

    pool
}
