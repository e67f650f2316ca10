use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::markers::{markers_in_text, nth_marker, MARKER_RE};

/// Text where variable content has been swapped for placeholder markers.
///
/// `arguments` maps each marker (`{{A}}`) to the literal it stands for, so
/// `untemplate(&template)` always gives back the literal text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplatedText {
    pub template: String,
    pub arguments: HashMap<String, String>,
}

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)*").expect("number regex"));

impl TemplatedText {
    pub fn new(template: impl Into<String>, arguments: HashMap<String, String>) -> Self {
        Self {
            template: template.into(),
            arguments,
        }
    }

    #[must_use]
    pub fn untemplate(&self, text: &str) -> String {
        untemplate_text(text, &self.arguments)
    }

    #[must_use]
    pub fn literal(&self) -> String {
        self.untemplate(&self.template)
    }
}

/// Replaces every run of digits with a marker. Returns `None` if the text holds no numbers.
///
/// Markers already present in the text are left untouched and their ids are not reused.
pub fn template_numbers(text: &str) -> Option<TemplatedText> {
    if !NUMBER_RE.is_match(text) {
        return None;
    }

    let taken: HashSet<String> = markers_in_text(text).into_iter().collect();
    let mut arguments: HashMap<String, String> = HashMap::new();
    let mut next_id = 0usize;

    let mut alloc = |literal: &str| -> Option<String> {
        loop {
            let marker = nth_marker(next_id)?;
            next_id += 1;
            if !taken.contains(&marker) {
                arguments.insert(marker.clone(), literal.to_string());
                return Some(marker);
            }
        }
    };

    let mut template_plain = |plain: &str, out: &mut String| {
        let mut pos = 0usize;
        for m in NUMBER_RE.find_iter(plain) {
            match alloc(m.as_str()) {
                Some(marker) => {
                    out.push_str(&plain[pos..m.start()]);
                    out.push_str(&marker);
                }
                None => out.push_str(&plain[pos..m.end()]),
            }
            pos = m.end();
        }
        out.push_str(&plain[pos..]);
    };

    let mut out = String::with_capacity(text.len());
    let mut pos = 0usize;
    for m in MARKER_RE.find_iter(text) {
        template_plain(&text[pos..m.start()], &mut out);
        out.push_str(m.as_str());
        pos = m.end();
    }
    template_plain(&text[pos..], &mut out);

    if arguments.is_empty() {
        return None;
    }
    Some(TemplatedText {
        template: out,
        arguments,
    })
}

/// Substitutes known markers with their literal content; unknown markers stay as they are.
pub fn untemplate_text(text: &str, arguments: &HashMap<String, String>) -> String {
    if arguments.is_empty() || text.is_empty() {
        return text.to_string();
    }
    MARKER_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let marker = &caps[0];
            arguments
                .get(marker)
                .cloned()
                .unwrap_or_else(|| marker.to_string())
        })
        .into_owned()
}
