//! Prefix-aligned partial translations derived from a full pair.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Char(char),
    /// A `{{X}}` placeholder, counted as one unit.
    Marker(char),
}

impl Unit {
    fn push_to(self, out: &mut String) {
        match self {
            Self::Char(c) => out.push(c),
            Self::Marker(c) => {
                out.push_str("{{");
                out.push(c);
                out.push_str("}}");
            }
        }
    }
}

pub fn tokenize(text: &str) -> Vec<Unit> {
    let chars: Vec<char> = text.chars().collect();
    let mut units = Vec::with_capacity(chars.len());
    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if c == '{'
            && i + 4 < chars.len()
            && chars[i + 1] == '{'
            && chars[i + 3] == '}'
            && chars[i + 4] == '}'
        {
            units.push(Unit::Marker(chars[i + 2]));
            i += 5;
        } else {
            units.push(Unit::Char(c));
            i += 1;
        }
    }
    units
}

/// Walks `original` one unit at a time; after `i + 1` units the translated cursor sits at
/// `round((i + 1) * rate)` units, with `rate = translated_units / original_units`.
///
/// Returns one `(original_prefix, translated_prefix)` pair per original unit, in order.
pub fn prefix_pairs(original: &str, translated: &str) -> Vec<(String, String)> {
    let original_units = tokenize(original);
    let translated_units = tokenize(translated);
    if original_units.is_empty() || translated_units.is_empty() {
        return Vec::new();
    }

    let rate = translated_units.len() as f64 / original_units.len() as f64;
    let mut pairs = Vec::with_capacity(original_units.len());
    let mut original_prefix = String::new();
    let mut translated_prefix = String::new();
    let mut cursor = 0usize;

    for (i, unit) in original_units.iter().enumerate() {
        unit.push_to(&mut original_prefix);

        // f64::round rounds half away from zero
        let target = (((i + 1) as f64) * rate).round() as usize;
        let target = target.min(translated_units.len());
        for unit in &translated_units[cursor.min(target)..target] {
            unit.push_to(&mut translated_prefix);
        }
        cursor = cursor.max(target);

        pairs.push((original_prefix.clone(), translated_prefix.clone()));
    }
    pairs
}
