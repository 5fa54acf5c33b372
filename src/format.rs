//! Response formatting: three mutually exclusive presentation modes.
//!
//! Exactly one mode is active per call: expert takes priority over strict,
//! which takes priority over the structured default. Every mode is a pure
//! function of `(query, result sets)` to an answer string; no I/O, no
//! shared state. Failure modes degrade to deterministic user-facing
//! not-found messages, never to an error escaping this boundary.

use crate::config::Config;
use crate::index::StructuredIndex;
use crate::models::{SourceHit, StructuredRecord, MISSING_MARKER};
use crate::normalize::tokenize;
use crate::search::QueryOutcome;

/// Presentation mode for a formatted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Structured,
    Strict,
    Expert,
}

impl Mode {
    /// Resolve mode flags with fixed priority: expert > strict > structured.
    pub fn resolve(expert: bool, strict: bool) -> Self {
        if expert {
            Mode::Expert
        } else if strict {
            Mode::Strict
        } else {
            Mode::Structured
        }
    }
}

const NOT_FOUND: &str = "❌ **দুঃখিত, আপনার প্রশ্নের সাথে মিলে এমন তথ্য পাওয়া যায়নি।**\n";
const NOT_FOUND_SUGGESTION: &str = "💡 **পরামর্শ:** ভিন্ন শব্দ ব্যবহার করে আবার চেষ্টা করুন।\n";
const NOT_FOUND_STRICT: &str = "❌ **দুঃখিত, প্রাসঙ্গিক তথ্য পাওয়া যায়নি।**\n";
const DETAILS_HEADING: &str = "\n### 📋 বিস্তারিত তথ্য\n";

/// Maximum field lines rendered from the top structured match.
const MAX_FIELD_LINES: usize = 8;
/// Maximum snippets in structured/strict modes.
const MAX_SNIPPETS: usize = 3;
/// Snippet caps, in characters.
const SNIPPET_CAP: usize = 200;
const EXPERT_SNIPPET_CAP: usize = 300;

/// Format the answer for one query in the given mode.
pub fn format_answer(
    mode: Mode,
    query: &str,
    index: &StructuredIndex,
    outcome: &QueryOutcome,
    config: &Config,
) -> String {
    match mode {
        Mode::Structured => format_structured(query, index, outcome),
        Mode::Strict => format_strict(query, index, outcome, config),
        Mode::Expert => format_expert(index, outcome, config),
    }
}

fn header(query: &str) -> String {
    format!("## 💊 {} সম্পর্কে তথ্য\n", query)
}

/// Default mode: top structured match's fields, then up to three snippets.
fn format_structured(query: &str, index: &StructuredIndex, outcome: &QueryOutcome) -> String {
    let mut parts = header(query);

    if outcome.structured.is_empty() && outcome.unstructured.is_empty() {
        parts.push_str(NOT_FOUND);
        parts.push_str(NOT_FOUND_SUGGESTION);
        return parts;
    }

    if let Some(top) = outcome
        .structured
        .first()
        .and_then(|hit| index.record(hit.record_index))
    {
        push_field_lines(&mut parts, top, MAX_FIELD_LINES);
    }

    if !outcome.unstructured.is_empty() {
        parts.push_str(DETAILS_HEADING);
        push_snippets(&mut parts, &outcome.unstructured, MAX_SNIPPETS, SNIPPET_CAP);
    }

    parts
}

/// Strict mode: exact record lookup wins; otherwise only snippets containing
/// every query token literally.
fn format_strict(
    query: &str,
    index: &StructuredIndex,
    outcome: &QueryOutcome,
    config: &Config,
) -> String {
    let mut parts = header(query);

    if let Some(rec) = index
        .lookup_by_name(query, config.retrieval.single_token_threshold)
        .and_then(|idx| index.record(idx))
    {
        push_field_lines(&mut parts, rec, usize::MAX);
        return parts;
    }

    let query_tokens: std::collections::HashSet<String> = tokenize(query).into_iter().collect();
    if query_tokens.is_empty() {
        parts.push_str(NOT_FOUND_STRICT);
        return parts;
    }

    let matches: Vec<&SourceHit> = outcome
        .unstructured
        .iter()
        .filter(|hit| {
            let text = snippet_text(hit);
            let tokens: std::collections::HashSet<String> = tokenize(text).into_iter().collect();
            query_tokens.is_subset(&tokens)
        })
        .collect();

    if matches.is_empty() {
        parts.push_str(NOT_FOUND_STRICT);
        return parts;
    }

    parts.push_str(DETAILS_HEADING);
    let shown: Vec<SourceHit> = matches.iter().take(MAX_SNIPPETS).map(|h| (*h).clone()).collect();
    push_snippets(&mut parts, &shown, MAX_SNIPPETS, SNIPPET_CAP);
    parts
}

/// Expert mode: a fixed sequence of named fields in a frozen layout.
///
/// Field order and literal labels are frozen; downstream consumers match on
/// them. Columns are resolved through the configurable schema map.
fn format_expert(index: &StructuredIndex, outcome: &QueryOutcome, config: &Config) -> String {
    let mut parts = String::new();

    if outcome.structured.is_empty() && outcome.unstructured.is_empty() {
        parts.push_str(NOT_FOUND);
        return parts;
    }

    if let Some(top) = outcome
        .structured
        .first()
        .and_then(|hit| index.record(hit.record_index))
    {
        let schema = &config.expert;
        let get = |column: &str, default: &str| {
            top.field(column).unwrap_or_else(|| default.to_string())
        };

        parts.push_str(&format!("**Name:**{}\n", get(&schema.name, "N/A")));
        parts.push_str(&format!("**Regular Price:**{}\n", get(&schema.price, "N/A")));
        parts.push_str(&format!(
            "**Company Name:**{}\n",
            get(&schema.manufacturer, "N/A")
        ));
        parts.push_str(&format!(
            "**Medicine Group:**{}\n",
            get(&schema.category, "N/A")
        ));

        let uses = strip_prefix(&get(&schema.indication, "N/A"), &schema.indication_prefix);
        parts.push_str(&format!("**ওষুধের কার্যকারিতা:**{}\n", uses));

        parts.push_str(&format!(
            "**খাওয়ার নিয়ম (প্রাপ্তবয়স্ক ক্ষেত্রে):**{}\n",
            get(&schema.adult_dosage, MISSING_MARKER)
        ));
        parts.push_str(&format!(
            "**খাওয়ার নিয়ম (কিশোরদের ক্ষেত্রে):**{}\n",
            get(&schema.child_dosage, MISSING_MARKER)
        ));

        let details = strip_prefix(&get(&schema.indication, "N/A"), &schema.indication_prefix);
        parts.push_str("**বিস্তারিত তথ্য:**\n");
        parts.push_str(&format!("**ওষুধের বিস্তারিত তথ্য:**{}\n", details));
    }

    // At most one supplementary snippet.
    if let Some(hit) = outcome.unstructured.first() {
        let text = snippet_text(hit);
        if !text.is_empty() {
            parts.push_str(&format!("{}\n", clip(text, EXPERT_SNIPPET_CAP)));
        }
    }

    parts
}

/// Remove the literal indication prefix the upstream dataset embeds in its
/// indication column.
fn strip_prefix(text: &str, prefix: &str) -> String {
    if !prefix.is_empty() && text.contains(prefix) {
        text.replace(prefix, "").trim().to_string()
    } else {
        text.to_string()
    }
}

fn snippet_text(hit: &SourceHit) -> &str {
    if !hit.context.trim().is_empty() {
        &hit.context
    } else {
        &hit.full_text
    }
}

fn push_field_lines(parts: &mut String, record: &StructuredRecord, max_lines: usize) {
    let mut shown = 0;
    for (column, value) in &record.fields {
        if let Some(text) = value.as_display() {
            parts.push_str(&format!("**{}:** {}\n", column, text));
            shown += 1;
            if shown >= max_lines {
                break;
            }
        }
    }
}

fn push_snippets(parts: &mut String, hits: &[SourceHit], max: usize, cap: usize) {
    let shown = hits.len().min(max);
    for (i, hit) in hits.iter().take(max).enumerate() {
        let text = snippet_text(hit);
        if text.is_empty() {
            continue;
        }
        parts.push_str(&format!("{}\n", clip(text, cap)));
        if i + 1 < shown {
            parts.push_str("---\n");
        }
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > max_chars {
        let head: String = trimmed.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldValue, RecordFields, SourceKind};
    use crate::search::run_query;

    fn paracetamol_row() -> RecordFields {
        vec![
            (
                "Name".to_string(),
                FieldValue::Text("Paracetamol".to_string()),
            ),
            (
                "Regular Price".to_string(),
                FieldValue::Number(2.0),
            ),
            (
                "Company Name".to_string(),
                FieldValue::Text("Beximco".to_string()),
            ),
            (
                "Medicine Group".to_string(),
                FieldValue::Text("Analgesic".to_string()),
            ),
            (
                "ওষুধের কার্যকারিতা".to_string(),
                FieldValue::Text("কার্যকারিতা : fever, pain".to_string()),
            ),
            (
                "খাওয়ার নিয়ম( প্রাপ্তবয়স্ক ক্ষেত্রে)".to_string(),
                FieldValue::Text("1-2 tablets".to_string()),
            ),
            (
                "খাওয়ার নিয়ম( কিশোরদের  ক্ষেত্রে)".to_string(),
                FieldValue::Missing,
            ),
        ]
    }

    fn setup() -> (StructuredIndex, Vec<crate::models::SourceItem>, Config) {
        let index = StructuredIndex::build(vec![paracetamol_row()]);
        let pool = vec![crate::models::SourceItem {
            kind: SourceKind::DocumentText,
            origin: "leaflet.pdf".to_string(),
            raw_text: "Paracetamol relieves fever and mild pain.".to_string(),
            fields: None,
            ingested_at: chrono::Utc::now(),
        }];
        (index, pool, Config::default())
    }

    #[test]
    fn mode_priority_expert_over_strict_over_structured() {
        assert_eq!(Mode::resolve(true, true), Mode::Expert);
        assert_eq!(Mode::resolve(true, false), Mode::Expert);
        assert_eq!(Mode::resolve(false, true), Mode::Strict);
        assert_eq!(Mode::resolve(false, false), Mode::Structured);
    }

    #[test]
    fn structured_mode_renders_fields_and_snippets() {
        let (index, pool, config) = setup();
        let outcome = run_query(&index, &pool, "Paracetamol", 5, &config.retrieval);
        let answer = format_answer(Mode::Structured, "Paracetamol", &index, &outcome, &config);
        assert!(answer.contains("**Name:** Paracetamol"));
        assert!(answer.contains("fever, pain"));
        assert!(answer.contains("বিস্তারিত তথ্য"));
    }

    #[test]
    fn structured_mode_not_found_is_deterministic() {
        let (index, pool, config) = setup();
        let outcome = run_query(&index, &pool, "xyzzynotreal", 5, &config.retrieval);
        assert!(outcome.structured.is_empty());
        assert!(outcome.unstructured.is_empty());
        let a = format_answer(Mode::Structured, "xyzzynotreal", &index, &outcome, &config);
        let b = format_answer(Mode::Structured, "xyzzynotreal", &index, &outcome, &config);
        assert_eq!(a, b);
        assert!(a.contains("দুঃখিত"));
        assert!(a.contains("পরামর্শ"));
    }

    #[test]
    fn strict_mode_exact_lookup_takes_precedence() {
        let (index, pool, config) = setup();
        let outcome = run_query(&index, &pool, "Paracetamol", 5, &config.retrieval);
        let answer = format_answer(Mode::Strict, "Paracetamol", &index, &outcome, &config);
        assert!(answer.contains("**Name:** Paracetamol"));
        // Field rendering, not the snippet section.
        assert!(!answer.contains("### 📋"));
    }

    #[test]
    fn strict_mode_requires_every_query_token() {
        let (index, _, config) = setup();
        let pool = vec![crate::models::SourceItem {
            kind: SourceKind::DocumentText,
            origin: "notes.txt".to_string(),
            raw_text: "only diabetes is discussed here".to_string(),
            fields: None,
            ingested_at: chrono::Utc::now(),
        }];
        // "diabetes dosage": pool text lacks "dosage", so the superset test
        // fails and strict mode reports not-found.
        let outcome = run_query(&index, &pool, "diabetes dosage", 5, &config.retrieval);
        let answer = format_answer(Mode::Strict, "diabetes dosage", &index, &outcome, &config);
        assert!(answer.contains(NOT_FOUND_STRICT.trim_end()));
    }

    #[test]
    fn expert_mode_renders_fixed_template() {
        let (index, pool, config) = setup();
        let outcome = run_query(&index, &pool, "Paracetamol", 5, &config.retrieval);
        let answer = format_answer(Mode::Expert, "Paracetamol", &index, &outcome, &config);

        // Frozen field order.
        let name_pos = answer.find("**Name:**").unwrap();
        let price_pos = answer.find("**Regular Price:**").unwrap();
        let company_pos = answer.find("**Company Name:**").unwrap();
        let group_pos = answer.find("**Medicine Group:**").unwrap();
        assert!(name_pos < price_pos && price_pos < company_pos && company_pos < group_pos);

        // Indication prefix is stripped.
        assert!(answer.contains("**ওষুধের কার্যকারিতা:**fever, pain"));
        assert!(!answer.contains("কার্যকারিতা : fever"));

        // Missing pediatric dosage renders the literal marker, not a gap.
        assert!(answer.contains("**খাওয়ার নিয়ম (কিশোরদের ক্ষেত্রে):**nan"));
    }

    #[test]
    fn expert_mode_appends_at_most_one_snippet() {
        let (index, _, config) = setup();
        let pool = vec![
            crate::models::SourceItem {
                kind: SourceKind::DocumentText,
                origin: "a.txt".to_string(),
                raw_text: "Paracetamol snippet alpha".to_string(),
                fields: None,
                ingested_at: chrono::Utc::now(),
            },
            crate::models::SourceItem {
                kind: SourceKind::DocumentText,
                origin: "b.txt".to_string(),
                raw_text: "Paracetamol snippet beta".to_string(),
                fields: None,
                ingested_at: chrono::Utc::now(),
            },
        ];
        let outcome = run_query(&index, &pool, "Paracetamol", 5, &config.retrieval);
        let answer = format_answer(Mode::Expert, "Paracetamol", &index, &outcome, &config);
        assert!(answer.contains("alpha"));
        assert!(!answer.contains("beta"));
    }

    #[test]
    fn snippet_clipping_is_char_bounded() {
        assert_eq!(clip("  hello  ", 200), "hello");
        let long = "x".repeat(250);
        let clipped = clip(&long, 200);
        assert_eq!(clipped.chars().count(), 203);
        assert!(clipped.ends_with("..."));
    }
}
