//! Query and document text normalization.
//!
//! Both sides of every comparison (index build, structured query,
//! unstructured overlap scoring) go through [`normalize`]. The stop-word
//! list is fixed configuration: if it ever diverged between build and query
//! time, structured and unstructured scoring would silently disagree.

/// Bengali Unicode block, preserved verbatim during punctuation stripping.
const BENGALI_START: char = '\u{0980}';
const BENGALI_END: char = '\u{09FF}';

/// Fixed Bengali stop-word set: conjunctions, pronouns, common verb forms,
/// and a handful of generic adjectives.
pub const STOP_WORDS: &[&str] = &[
    "এবং",
    "অথবা",
    "কিন্তু",
    "যদি",
    "তবে",
    "কেন",
    "কিভাবে",
    "কোথায়",
    "কখন",
    "কি",
    "কোন",
    "কাদের",
    "কার",
    "কাকে",
    "হয়",
    "হয়েছে",
    "হবে",
    "করতে",
    "করে",
    "করবে",
    "আছে",
    "নেই",
    "থাকবে",
    "এটা",
    "এটি",
    "সেটা",
    "সেটি",
    "এই",
    "সেই",
    "যে",
    "যা",
    "যার",
    "যাদের",
    "আমি",
    "আমরা",
    "তুমি",
    "তোমরা",
    "সে",
    "তারা",
    "আপনি",
    "আপনারা",
    "এখানে",
    "সেখানে",
    "যেখানে",
    "কোথাও",
    "এখন",
    "তখন",
    "সবসময়",
    "কখনও",
    "ভালো",
    "খারাপ",
    "বড়",
    "ছোট",
    "নতুন",
    "পুরানো",
    "সুন্দর",
    "কুৎসিত",
    "সহজ",
    "কঠিন",
    "দ্রুত",
    "ধীর",
    "গরম",
    "ঠান্ডা",
    "উষ্ণ",
    "শীতল",
];

fn is_kept_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c.is_whitespace() || (BENGALI_START..=BENGALI_END).contains(&c)
}

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

/// Normalize text for scoring: lowercase, strip punctuation while keeping
/// the Bengali block, collapse whitespace, drop stop words.
///
/// Pure and total: empty input yields empty output, and the function is
/// idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| if is_kept_char(c) { c } else { ' ' })
        .collect();

    stripped
        .split_whitespace()
        .filter(|t| !is_stop_word(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split normalized text into tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

/// True when the query normalizes to exactly one token of at least 2 chars.
/// Single-token queries get a broader structured search (lower threshold,
/// raised top_k).
pub fn is_single_token(query: &str) -> bool {
    let cleaned = normalize(query);
    let mut parts = cleaned.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(tok), None) => tok.chars().count() >= 2,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n "), "");
    }

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(normalize("Paracetamol, 500mg!"), "paracetamol 500mg");
    }

    #[test]
    fn preserves_bengali_text() {
        assert_eq!(normalize("জ্বর, ব্যথা!"), "জ্বর ব্যথা");
    }

    #[test]
    fn removes_stop_words() {
        // "এবং" is a stop word; "জ্বর" is not.
        assert_eq!(normalize("জ্বর এবং ব্যথা"), "জ্বর ব্যথা");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("a   b\t\tc"), "a b c");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "Paracetamol, 500mg!",
            "জ্বর এবং ব্যথা",
            "  MIXED case -- টেক্সট  ",
            "",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn single_token_detection() {
        assert!(is_single_token("Paracetamol"));
        assert!(is_single_token("  Napa!  "));
        assert!(!is_single_token("napa extra"));
        assert!(!is_single_token("a"));
        assert!(!is_single_token(""));
        // Stop words normalize away entirely.
        assert!(!is_single_token("এবং"));
    }

    #[test]
    fn tokenize_splits_normalized_text() {
        assert_eq!(tokenize("Fever & Pain"), vec!["fever", "pain"]);
    }
}
