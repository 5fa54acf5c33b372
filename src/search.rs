//! Query execution: keyword-overlap scoring, adaptive thresholds, ranking,
//! and deduplication.
//!
//! Two scorers run per query. The structured TF-IDF index answers with
//! cosine similarity; the unstructured pool is scored with a cheaper
//! token-containment ratio that works on short, uncurated free text
//! (document excerpts, API JSON dumps) without any reindexing. Their result
//! sets stay separate; the formatter decides how to present each.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::config::RetrievalConfig;
use crate::context;
use crate::index::StructuredIndex;
use crate::models::{SourceHit, SourceItem, StructuredHit};
use crate::normalize::{is_single_token, tokenize};

/// Characters of raw text kept as the dedup prefix and snippet fallback.
const FULL_TEXT_PREFIX: usize = 500;

/// Both result sets for one query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub structured: Vec<StructuredHit>,
    pub unstructured: Vec<SourceHit>,
}

/// Search the structured index with adaptive thresholding.
///
/// A single-token query (≥ 2 chars) uses the lowered threshold and raised
/// top_k to surface a broader information set; multi-token queries use the
/// stricter default threshold and the requested top_k. The two constant
/// pairs live in `[retrieval]` config.
pub fn search_structured(
    index: &StructuredIndex,
    query: &str,
    top_k: usize,
    retrieval: &RetrievalConfig,
) -> Vec<StructuredHit> {
    let (threshold, k) = if is_single_token(query) {
        (
            retrieval.single_token_threshold,
            retrieval.single_token_top_k,
        )
    } else {
        (retrieval.multi_token_threshold, top_k)
    };

    index
        .search(query, k, threshold)
        .into_iter()
        .enumerate()
        .map(|(i, (record_index, score))| StructuredHit {
            record_index,
            score,
            rank: i + 1,
        })
        .collect()
}

/// Score the unstructured pool by distinct-token overlap.
///
/// `score = |query tokens ∩ source tokens| / |query tokens|`; only items
/// with a positive score survive. Duplicates are collapsed by origin plus
/// the first 500 characters of raw text, so two distinct passages from the
/// same file both survive while identical ones do not. The sort is stable:
/// equal scores keep pool encounter order.
pub fn search_unstructured(
    pool: &[SourceItem],
    query: &str,
    top_k: usize,
    return_all: bool,
    window: usize,
) -> Vec<SourceHit> {
    let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();
    if query_tokens.is_empty() {
        return Vec::new();
    }

    let mut seen: HashSet<[u8; 32]> = HashSet::new();
    let mut hits: Vec<SourceHit> = Vec::new();

    for item in pool {
        let source_tokens: HashSet<String> = tokenize(&item.raw_text).into_iter().collect();
        let matches = query_tokens
            .iter()
            .filter(|t| source_tokens.contains(*t))
            .count();
        if matches == 0 {
            continue;
        }

        let prefix: String = item.raw_text.chars().take(FULL_TEXT_PREFIX).collect();
        if !seen.insert(dedup_key(&item.origin, &prefix)) {
            continue;
        }

        let full_text = if item.raw_text.chars().count() > FULL_TEXT_PREFIX {
            format!("{}...", prefix)
        } else {
            prefix
        };

        hits.push(SourceHit {
            kind: item.kind,
            origin: item.origin.clone(),
            score: matches as f64 / query_tokens.len() as f64,
            context: context::extract(&item.raw_text, query, window),
            full_text,
            fields: item.fields.clone(),
            rank: 0,
        });
    }

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    if !return_all {
        hits.truncate(top_k);
    }
    for (i, hit) in hits.iter_mut().enumerate() {
        hit.rank = i + 1;
    }
    hits
}

/// Run both scorers for one query.
///
/// Single-token queries return the whole unstructured candidate set rather
/// than the requested top_k, mirroring the broader structured search.
pub fn run_query(
    index: &StructuredIndex,
    pool: &[SourceItem],
    query: &str,
    top_k: usize,
    retrieval: &RetrievalConfig,
) -> QueryOutcome {
    let structured = search_structured(index, query, top_k, retrieval);
    let unstructured = search_unstructured(
        pool,
        query,
        top_k,
        is_single_token(query),
        retrieval.context_window,
    );
    QueryOutcome {
        structured,
        unstructured,
    }
}

fn dedup_key(origin: &str, prefix: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(origin.as_bytes());
    hasher.update([0u8]);
    hasher.update(prefix.as_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    fn item(origin: &str, text: &str) -> SourceItem {
        SourceItem {
            kind: SourceKind::DocumentText,
            origin: origin.to_string(),
            raw_text: text.to_string(),
            fields: None,
            ingested_at: chrono::Utc::now(),
        }
    }

    fn retrieval() -> RetrievalConfig {
        RetrievalConfig::default()
    }

    #[test]
    fn overlap_score_is_matched_fraction() {
        let pool = vec![item("a.txt", "paracetamol treats fever")];
        let hits = search_unstructured(&pool, "paracetamol dosage", 5, false, 200);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_overlap_items_are_dropped() {
        let pool = vec![item("a.txt", "gastric tablets")];
        assert!(search_unstructured(&pool, "paracetamol", 5, false, 200).is_empty());
    }

    #[test]
    fn empty_query_matches_nothing() {
        let pool = vec![item("a.txt", "paracetamol")];
        assert!(search_unstructured(&pool, "", 5, false, 200).is_empty());
        assert!(search_unstructured(&pool, "???", 5, false, 200).is_empty());
    }

    #[test]
    fn identical_passages_from_same_origin_collapse() {
        let pool = vec![
            item("a.txt", "diabetes overview text"),
            item("a.txt", "diabetes overview text"),
        ];
        let hits = search_unstructured(&pool, "diabetes", 5, false, 200);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn distinct_passages_from_same_origin_survive() {
        let pool = vec![
            item("a.txt", "diabetes overview text"),
            item("a.txt", "diabetes dosage advice"),
        ];
        let hits = search_unstructured(&pool, "diabetes", 5, false, 200);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn same_passage_from_distinct_origins_survives() {
        let pool = vec![
            item("a.txt", "diabetes overview text"),
            item("b.txt", "diabetes overview text"),
        ];
        let hits = search_unstructured(&pool, "diabetes", 5, false, 200);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn ties_keep_encounter_order() {
        let pool = vec![
            item("first.txt", "fever notes"),
            item("second.txt", "fever advice"),
        ];
        let hits = search_unstructured(&pool, "fever", 5, false, 200);
        assert_eq!(hits[0].origin, "first.txt");
        assert_eq!(hits[1].origin, "second.txt");
        assert_eq!(hits[0].rank, 1);
        assert_eq!(hits[1].rank, 2);
    }

    #[test]
    fn return_all_ignores_top_k() {
        let pool: Vec<SourceItem> = (0..8)
            .map(|i| item(&format!("f{}.txt", i), &format!("fever note {}", i)))
            .collect();
        assert_eq!(search_unstructured(&pool, "fever", 2, false, 200).len(), 2);
        assert_eq!(search_unstructured(&pool, "fever", 2, true, 200).len(), 8);
    }

    #[test]
    fn single_token_query_broadens_structured_search() {
        use crate::models::FieldValue;
        let rows: Vec<crate::models::RecordFields> = (0..20)
            .map(|i| {
                vec![
                    (
                        "Name".to_string(),
                        FieldValue::Text(format!("Napa variant {}", i)),
                    ),
                    ("Uses".to_string(), FieldValue::Text("fever".to_string())),
                ]
            })
            .collect();
        let index = StructuredIndex::build(rows);
        let cfg = retrieval();
        let single = search_structured(&index, "napa", 5, &cfg);
        // The adaptive branch raises top_k beyond the requested 5.
        assert!(single.len() > 5);
        assert!(single.len() <= cfg.single_token_top_k);
    }

    #[test]
    fn multi_token_query_respects_requested_top_k() {
        use crate::models::FieldValue;
        let rows: Vec<crate::models::RecordFields> = (0..20)
            .map(|i| {
                vec![(
                    "Name".to_string(),
                    FieldValue::Text(format!("Napa extra {}", i)),
                )]
            })
            .collect();
        let index = StructuredIndex::build(rows);
        let hits = search_structured(&index, "napa extra", 5, &retrieval());
        assert!(hits.len() <= 5);
    }

    #[test]
    fn run_query_returns_separate_result_sets() {
        use crate::models::FieldValue;
        let index = StructuredIndex::build(vec![vec![
            ("Name".to_string(), FieldValue::Text("Napa".to_string())),
            ("Uses".to_string(), FieldValue::Text("fever pain".to_string())),
        ]]);
        let pool = vec![item("doc.pdf", "Napa treats fever")];
        let outcome = run_query(&index, &pool, "napa", 5, &retrieval());
        assert!(!outcome.structured.is_empty());
        assert!(!outcome.unstructured.is_empty());
    }
}
