//! Context-window extraction for display snippets.
//!
//! Operates on the raw (non-normalized) source text and raw query, so the
//! snippet the user sees reads naturally. All positions are character
//! indices, never byte offsets; Bengali text would split mid-scalar
//! otherwise.

/// Default window width in characters.
pub const DEFAULT_WINDOW: usize = 200;

/// Extract a window of raw text around the first occurrence of the query.
///
/// Falls back from the full query to any individual query token, and from
/// there to the first `window` characters. Matched windows span `window/2`
/// characters before the occurrence and `window/2 + query length` after,
/// clamped to the text, with `...` marking truncation on either side. The
/// result never exceeds `window + query length + 6` characters.
pub fn extract(raw_text: &str, raw_query: &str, window: usize) -> String {
    let text: Vec<char> = raw_text.chars().collect();
    // Lowercasing can expand one char into several ('İ' lowers to two
    // scalars), so the lowered text carries a map from each of its chars
    // back to the source index. Window math stays in source coordinates.
    let mut lowered: Vec<char> = Vec::with_capacity(text.len());
    let mut source_index: Vec<usize> = Vec::with_capacity(text.len());
    for (i, c) in text.iter().enumerate() {
        for lc in c.to_lowercase() {
            lowered.push(lc);
            source_index.push(i);
        }
    }
    let query_lower = raw_query.to_lowercase();
    let query_chars: Vec<char> = query_lower.chars().collect();

    let mut start_pos = find_chars(&lowered, &query_chars);

    if start_pos.is_none() {
        for token in query_lower.split_whitespace() {
            let token_chars: Vec<char> = token.chars().collect();
            if let Some(pos) = find_chars(&lowered, &token_chars) {
                start_pos = Some(pos);
                break;
            }
        }
    }

    let pos = match start_pos {
        Some(p) => source_index[p],
        None => {
            if text.len() > window {
                let head: String = text[..window].iter().collect();
                return format!("{}...", head);
            }
            return raw_text.to_string();
        }
    };

    let query_len = raw_query.chars().count();
    let start = pos.saturating_sub(window / 2);
    let end = (pos + query_len + window / 2).min(text.len());

    let mut snippet: String = text[start..end].iter().collect();
    if start > 0 {
        snippet = format!("...{}", snippet);
    }
    if end < text.len() {
        snippet = format!("{}...", snippet);
    }
    snippet
}

/// First index of `needle` within `haystack`, by character.
fn find_chars(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
