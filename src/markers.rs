use once_cell::sync::Lazy;
use regex::Regex;

pub const MARKER_OPEN: &str = "{{";
pub const MARKER_CLOSE: &str = "}}";

/// Characters used as marker ids, in allocation order.
const MARKER_IDS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// A placeholder marker: one character wrapped in double braces, e.g. `{{A}}`.
pub static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.)\}\}").expect("marker regex"));

pub fn marker_for(id: char) -> String {
    format!("{MARKER_OPEN}{id}{MARKER_CLOSE}")
}

/// Returns the marker for the n-th allocated placeholder, or `None` once the id space is used up.
pub fn nth_marker(n: usize) -> Option<String> {
    MARKER_IDS.chars().nth(n).map(marker_for)
}

pub fn markers_in_text(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }
    MARKER_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_letters_then_runs_out() {
        assert_eq!(nth_marker(0).as_deref(), Some("{{A}}"));
        assert_eq!(nth_marker(26).as_deref(), Some("{{a}}"));
        assert_eq!(nth_marker(52), None);
    }

    #[test]
    fn finds_only_single_char_markers() {
        let found = markers_in_text("x {{A}} y {{BC}} z {{b}}");
        assert_eq!(found, vec!["{{A}}".to_string(), "{{b}}".to_string()]);
    }
}
