//! Structured TF-IDF vector index.
//!
//! Built once per dataset load over each record's `normalized_text`, using
//! word n-grams of length 1–3, a vocabulary capped at 2000 terms, and a
//! minimum document frequency of 1. Document vectors are L2-normalized at
//! build time so cosine similarity reduces to a sparse dot product.
//!
//! The index holds no global state: callers own the handle and pass it into
//! every search. Rebuilds replace the handle wholesale; build and query are
//! sequenced phases, never interleaved.

use std::collections::HashMap;

use crate::models::{RecordFields, StructuredRecord};
use crate::normalize::normalize;

/// Vocabulary cap: highest-corpus-frequency n-grams win.
const MAX_FEATURES: usize = 2000;
/// Word n-gram lengths included in the vocabulary.
const NGRAM_MAX: usize = 3;
/// Minimum number of documents a term must appear in.
const MIN_DF: usize = 1;

/// TF-IDF index over the structured record set.
///
/// An index built from zero records is valid: every search returns no
/// results instead of raising.
pub struct StructuredIndex {
    records: Vec<StructuredRecord>,
    vocab: HashMap<String, usize>,
    idf: Vec<f64>,
    /// Per-record sparse vectors `(term_id, weight)`, sorted by term id.
    doc_vectors: Vec<Vec<(usize, f64)>>,
}

impl StructuredIndex {
    /// Build the index from raw table rows.
    pub fn build(rows: Vec<RecordFields>) -> Self {
        let records: Vec<StructuredRecord> = rows
            .into_iter()
            .map(StructuredRecord::from_fields)
            .collect();

        // Per-document n-gram counts plus corpus-wide df and tf.
        let mut doc_counts: Vec<HashMap<String, usize>> = Vec::with_capacity(records.len());
        let mut corpus_tf: HashMap<String, usize> = HashMap::new();
        let mut df: HashMap<String, usize> = HashMap::new();

        for rec in &records {
            let counts = ngram_counts(&rec.normalized_text);
            for (term, count) in &counts {
                *corpus_tf.entry(term.clone()).or_insert(0) += count;
                *df.entry(term.clone()).or_insert(0) += 1;
            }
            doc_counts.push(counts);
        }

        // Vocabulary selection: df >= MIN_DF, then top MAX_FEATURES by corpus
        // frequency, ties broken alphabetically for determinism.
        let mut terms: Vec<(String, usize)> = corpus_tf
            .into_iter()
            .filter(|(term, _)| df.get(term).copied().unwrap_or(0) >= MIN_DF)
            .collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(MAX_FEATURES);
        terms.sort_by(|a, b| a.0.cmp(&b.0));

        let vocab: HashMap<String, usize> = terms
            .iter()
            .enumerate()
            .map(|(i, (term, _))| (term.clone(), i))
            .collect();

        // Smooth IDF: ln((1 + n) / (1 + df)) + 1.
        let n_docs = records.len() as f64;
        let mut idf = vec![0.0; vocab.len()];
        for (term, &term_id) in &vocab {
            let term_df = df.get(term).copied().unwrap_or(0) as f64;
            idf[term_id] = ((1.0 + n_docs) / (1.0 + term_df)).ln() + 1.0;
        }

        let doc_vectors = doc_counts
            .iter()
            .map(|counts| weight_and_normalize(counts, &vocab, &idf))
            .collect();

        Self {
            records,
            vocab,
            idf,
            doc_vectors,
        }
    }

    pub fn records(&self) -> &[StructuredRecord] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&StructuredRecord> {
        self.records.get(index)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cosine search over every document vector.
    ///
    /// Out-of-vocabulary query terms are ignored; a query that normalizes to
    /// the empty string (or to nothing but unknown terms) returns no results.
    /// Results carry `score > threshold`, sorted by descending score with
    /// ties kept in original record order.
    pub fn search(&self, query: &str, top_k: usize, threshold: f64) -> Vec<(usize, f64)> {
        if self.records.is_empty() {
            return Vec::new();
        }
        let cleaned = normalize(query);
        if cleaned.is_empty() {
            return Vec::new();
        }

        let query_counts = ngram_counts(&cleaned);
        let query_vec = weight_and_normalize(&query_counts, &self.vocab, &self.idf);
        if query_vec.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .doc_vectors
            .iter()
            .enumerate()
            .filter_map(|(idx, doc_vec)| {
                let sim = sparse_dot(&query_vec, doc_vec);
                if sim > threshold {
                    Some((idx, sim))
                } else {
                    None
                }
            })
            .collect();

        // Stable sort keeps original record order on equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    /// Exact record lookup for strict mode: case-insensitive containment on
    /// the first column, falling back to the top cosine hit.
    pub fn lookup_by_name(&self, name: &str, fallback_threshold: f64) -> Option<usize> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        for (idx, rec) in self.records.iter().enumerate() {
            if let Some((_, value)) = rec.fields.first() {
                if let Some(text) = value.as_display() {
                    if text.to_lowercase().contains(&needle) {
                        return Some(idx);
                    }
                }
            }
        }
        self.search(name, 1, fallback_threshold)
            .first()
            .map(|(idx, _)| *idx)
    }
}

/// Count word n-grams (lengths 1..=NGRAM_MAX) in normalized text.
fn ngram_counts(normalized: &str) -> HashMap<String, usize> {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let mut counts = HashMap::new();
    for n in 1..=NGRAM_MAX {
        if tokens.len() < n {
            break;
        }
        for window in tokens.windows(n) {
            *counts.entry(window.join(" ")).or_insert(0) += 1;
        }
    }
    counts
}

/// Project term counts into the vocabulary, apply IDF, L2-normalize.
/// Sparse entries come back sorted by term id.
fn weight_and_normalize(
    counts: &HashMap<String, usize>,
    vocab: &HashMap<String, usize>,
    idf: &[f64],
) -> Vec<(usize, f64)> {
    let mut entries: Vec<(usize, f64)> = counts
        .iter()
        .filter_map(|(term, &count)| {
            vocab
                .get(term)
                .map(|&term_id| (term_id, count as f64 * idf[term_id]))
        })
        .collect();

    let norm: f64 = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm < f64::EPSILON {
        return Vec::new();
    }
    for (_, w) in entries.iter_mut() {
        *w /= norm;
    }
    entries.sort_by_key(|(id, _)| *id);
    entries
}

/// Dot product of two sparse vectors sorted by term id.
fn sparse_dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let mut sum = 0.0;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;

    fn row(name: &str, uses: &str) -> RecordFields {
        vec![
            ("Name".to_string(), FieldValue::Text(name.to_string())),
            ("Uses".to_string(), FieldValue::Text(uses.to_string())),
        ]
    }

    #[test]
    fn empty_index_returns_no_results() {
        let index = StructuredIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.search("paracetamol", 5, 0.05).is_empty());
    }

    #[test]
    fn exact_name_query_ranks_its_record_first() {
        let index = StructuredIndex::build(vec![
            row("Paracetamol", "fever pain"),
            row("Omeprazole", "gastric acidity"),
            row("Metformin", "diabetes control"),
        ]);
        let hits = index.search("Paracetamol", 5, 0.05);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].0, 0);
        assert!(hits[0].1 > 0.05);
    }

    #[test]
    fn out_of_vocabulary_query_is_empty_not_error() {
        let index = StructuredIndex::build(vec![row("Paracetamol", "fever pain")]);
        assert!(index.search("xyzzynotreal", 5, 0.05).is_empty());
    }

    #[test]
    fn empty_query_matches_nothing() {
        let index = StructuredIndex::build(vec![row("Paracetamol", "fever pain")]);
        assert!(index.search("", 5, 0.05).is_empty());
        assert!(index.search("!!! ???", 5, 0.05).is_empty());
    }

    #[test]
    fn scores_sorted_descending() {
        let index = StructuredIndex::build(vec![
            row("Paracetamol", "fever pain headache"),
            row("Paracetamol Plus", "fever pain headache cold congestion"),
            row("Metformin", "diabetes"),
        ]);
        let hits = index.search("fever pain", 5, 0.05);
        assert!(hits.len() >= 2);
        for pair in hits.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
    }

    #[test]
    fn lower_threshold_never_returns_fewer_results() {
        let index = StructuredIndex::build(vec![
            row("Napa", "fever"),
            row("Napa Extra", "fever headache"),
            row("Seclo", "gastric"),
            row("Napa Syrup", "child fever"),
        ]);
        let strict = index.search("napa", 15, 0.1);
        let relaxed = index.search("napa", 15, 0.05);
        assert!(relaxed.len() >= strict.len());
    }

    #[test]
    fn deterministic_across_rebuilds() {
        let rows = vec![
            row("Paracetamol", "fever pain"),
            row("Omeprazole", "gastric acidity"),
        ];
        let a = StructuredIndex::build(rows.clone());
        let b = StructuredIndex::build(rows);
        assert_eq!(a.search("fever", 5, 0.05), b.search("fever", 5, 0.05));
    }

    #[test]
    fn lookup_by_name_prefers_exact_column_match() {
        let index = StructuredIndex::build(vec![
            row("Seclo", "gastric paracetamol mention"),
            row("Paracetamol", "fever pain"),
        ]);
        assert_eq!(index.lookup_by_name("paracetamol", 0.05), Some(1));
    }

    #[test]
    fn lookup_falls_back_to_vector_search() {
        let index = StructuredIndex::build(vec![
            row("Napa", "fever pain paracetamol group"),
            row("Seclo", "gastric"),
        ]);
        // "fever" does not appear in any Name column.
        assert_eq!(index.lookup_by_name("fever", 0.05), Some(0));
    }
}
