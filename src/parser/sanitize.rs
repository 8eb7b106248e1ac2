//! Character-level cleanup applied before any pattern matching.
//!
//! Stray symbol glyphs from PDF fonts break anchored patterns silently, so
//! every cell and text block goes through [`strip`] first.

const KEPT_PUNCTUATION: &[char] = &['/', '.', '(', ')', '-', '+', '%', ':', ','];

fn is_noise(c: char) -> bool {
    matches!(c,
        '\u{e000}'..='\u{f8ff}'     // private use area
        | '\u{2190}'..='\u{21ff}'   // arrows
        | '\u{2500}'..='\u{257f}'   // box drawing
        | '\u{2580}'..='\u{259f}'   // block elements
        | '\u{25a0}'..='\u{25ff}'   // geometric shapes
        | '\u{2600}'..='\u{26ff}'   // misc symbols
        | '\u{2700}'..='\u{27bf}'   // dingbats
        | '\u{00b0}' | '\u{00ba}'   // degree signs
    ) || (c.is_control() && c != '\n' && c != '\t' && c != '\r')
}

fn is_kept(c: char) -> bool {
    !is_noise(c) && (c.is_alphanumeric() || c.is_whitespace() || KEPT_PUNCTUATION.contains(&c))
}

/// Remove noise characters while keeping line structure.
pub fn strip(text: &str) -> String {
    text.chars().filter(|&c| is_kept(c)).collect()
}

/// [`strip`], then trim every line and drop blank ones.
pub fn strip_lines(text: &str) -> String {
    strip(text)
        .lines()
        .map(collapse)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse whitespace runs to one space and trim.
pub fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Full value cleanup: strip, collapse, and map `NIL`/empty to `None`.
pub fn clean_value(text: &str) -> Option<String> {
    let cleaned = collapse(&strip(text));
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("NIL") {
        None
    } else {
        Some(cleaned)
    }
}

/// `true` when the raw text is a NIL marker (any case, surrounding blanks).
pub fn is_nil(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("NIL")
}
