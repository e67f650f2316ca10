use once_cell::sync::Lazy;
use regex::Regex;

use crate::markers::MARKER_RE;

static LETTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}").expect("letter"));

/// Languages written without spaces between words.
const NO_WORD_SPACING: [&str; 6] = ["ja", "zh", "th", "lo", "km", "my"];

pub fn uses_whitespace_between_words(lang: &str) -> bool {
    let primary = lang
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    !NO_WORD_SPACING.contains(&primary.as_str())
}

/// Splits `text` into (leading whitespace, core, trailing whitespace).
pub fn split_external_whitespace(text: &str) -> (&str, &str, &str) {
    let core_start = text.len() - text.trim_start().len();
    let core_end = text.trim_end().len();
    if core_start >= core_end {
        // whitespace only: everything counts as leading
        return (text, "", "");
    }
    (
        &text[..core_start],
        &text[core_start..core_end],
        &text[core_end..],
    )
}

/// Normalizes whitespace runs between the first and last visible character.
///
/// With word spacing every interior run collapses to one space. Without it, runs containing a
/// line break are removed and the rest collapse to one space. Outer whitespace is kept.
pub fn trim_internal(text: &str, uses_word_spacing: bool) -> String {
    let (leading, core, trailing) = split_external_whitespace(text);
    let mut out = String::with_capacity(text.len());
    out.push_str(leading);

    let mut run = String::new();
    for ch in core.chars() {
        if ch.is_whitespace() {
            run.push(ch);
            continue;
        }
        if !run.is_empty() {
            let has_break = run.contains(['\n', '\r']);
            if uses_word_spacing || !has_break {
                out.push(' ');
            }
            run.clear();
        }
        out.push(ch);
    }
    out.push_str(trailing);
    out
}

/// Whether the text has anything worth translating: at least one letter outside placeholders.
pub fn has_translatable_content(text: &str) -> bool {
    let plain = MARKER_RE.replace_all(text, " ");
    LETTER_RE.is_match(plain.trim())
}
