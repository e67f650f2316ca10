//! Canonical variants of an input string used by the lookup tiers.

use crate::templating::{template_numbers, TemplatedText};
use crate::textutil::{split_external_whitespace, trim_internal};

/// Whitespace variants in lookup priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrimLevel {
    Original,
    External,
    Internal,
    Full,
}

impl TrimLevel {
    pub const ALL: [TrimLevel; 4] = [Self::Original, Self::External, Self::Internal, Self::Full];

    pub fn name(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::External => "externally trimmed",
            Self::Internal => "internally trimmed",
            Self::Full => "fully trimmed",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Replace number runs with placeholder markers.
    pub template_numbers: bool,
    /// Compute the internally trimmed variants; when false they equal the untrimmed ones.
    pub trim_internal: bool,
    pub uses_word_spacing: bool,
    /// Text comes from a high-frequency source; untemplated tiers are skipped for it.
    pub from_noisy_source: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            template_numbers: false,
            trim_internal: true,
            uses_word_spacing: true,
            from_noisy_source: false,
        }
    }
}

/// An input string and the whitespace/placeholder variants derived from it.
///
/// All `templated_*` fields are in templated form; for text without placeholders they are
/// simply the literal variants. The `*_differs` flags record whether a variant differs from
/// the one it is checked after, so lookups can skip redundant probes.
#[derive(Debug, Clone)]
pub struct NormalizedText {
    original: String,
    templated: Option<TemplatedText>,
    leading_whitespace: String,
    trailing_whitespace: String,
    templated_original: String,
    templated_externally_trimmed: String,
    templated_internally_trimmed: String,
    templated_fully_trimmed: String,
    external_differs: bool,
    internal_differs: bool,
    full_differs: bool,
    from_noisy_source: bool,
}

impl NormalizedText {
    pub fn new(text: &str, opts: NormalizeOptions) -> Self {
        let templated = if opts.template_numbers {
            template_numbers(text)
        } else {
            None
        };
        Self::build(text.to_string(), templated, opts)
    }

    /// Builds variants around placeholders supplied by a markup parser.
    pub fn with_template(templated: TemplatedText, opts: NormalizeOptions) -> Self {
        let original = templated.literal();
        let templated = if templated.arguments.is_empty() {
            None
        } else {
            Some(templated)
        };
        Self::build(original, templated, opts)
    }

    /// Variants of a stored key or value: no templating, internal trimming on.
    pub fn plain(text: &str, uses_word_spacing: bool) -> Self {
        Self::new(
            text,
            NormalizeOptions {
                uses_word_spacing,
                ..NormalizeOptions::default()
            },
        )
    }

    fn build(original: String, templated: Option<TemplatedText>, opts: NormalizeOptions) -> Self {
        let templated_original = templated
            .as_ref()
            .map(|t| t.template.clone())
            .unwrap_or_else(|| original.clone());

        let (leading, core, trailing) = split_external_whitespace(&templated_original);
        let leading_whitespace = leading.to_string();
        let trailing_whitespace = trailing.to_string();
        let templated_externally_trimmed = core.to_string();

        let templated_internally_trimmed = if opts.trim_internal {
            trim_internal(&templated_original, opts.uses_word_spacing)
        } else {
            templated_original.clone()
        };
        let templated_fully_trimmed = templated_internally_trimmed.trim().to_string();

        Self {
            external_differs: templated_externally_trimmed != templated_original,
            internal_differs: templated_internally_trimmed != templated_original,
            full_differs: templated_fully_trimmed != templated_internally_trimmed,
            original,
            templated,
            leading_whitespace,
            trailing_whitespace,
            templated_original,
            templated_externally_trimmed,
            templated_internally_trimmed,
            templated_fully_trimmed,
            from_noisy_source: opts.from_noisy_source,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn is_templated(&self) -> bool {
        self.templated.is_some()
    }

    pub fn is_from_noisy_source(&self) -> bool {
        self.from_noisy_source
    }

    pub fn leading_whitespace(&self) -> &str {
        &self.leading_whitespace
    }

    pub fn trailing_whitespace(&self) -> &str {
        &self.trailing_whitespace
    }

    pub fn templated_original(&self) -> &str {
        &self.templated_original
    }

    pub fn templated_externally_trimmed(&self) -> &str {
        &self.templated_externally_trimmed
    }

    pub fn templated_internally_trimmed(&self) -> &str {
        &self.templated_internally_trimmed
    }

    pub fn templated_fully_trimmed(&self) -> &str {
        &self.templated_fully_trimmed
    }

    pub fn variant(&self, level: TrimLevel) -> &str {
        match level {
            TrimLevel::Original => &self.templated_original,
            TrimLevel::External => &self.templated_externally_trimmed,
            TrimLevel::Internal => &self.templated_internally_trimmed,
            TrimLevel::Full => &self.templated_fully_trimmed,
        }
    }

    /// Whether probing `level` can find something the level it is compared against could not.
    pub fn level_differs(&self, level: TrimLevel) -> bool {
        match level {
            TrimLevel::Original => true,
            TrimLevel::External => self.external_differs,
            TrimLevel::Internal => self.internal_differs,
            TrimLevel::Full => self.full_differs,
        }
    }

    /// Externally trimmed variant differs from the original.
    pub fn external_differs(&self) -> bool {
        self.external_differs
    }

    /// Internally trimmed variant differs from the original.
    pub fn internal_differs(&self) -> bool {
        self.internal_differs
    }

    /// Fully trimmed variant differs from the internally trimmed one.
    pub fn full_differs(&self) -> bool {
        self.full_differs
    }

    /// Wraps `core` in this text's outer whitespace.
    pub fn rewrap(&self, core: &str) -> String {
        let mut out = String::with_capacity(
            self.leading_whitespace.len() + core.len() + self.trailing_whitespace.len(),
        );
        out.push_str(&self.leading_whitespace);
        out.push_str(core);
        out.push_str(&self.trailing_whitespace);
        out
    }

    /// Replaces this text's placeholders in `text` with their literal content.
    pub fn untemplate(&self, text: &str) -> String {
        match self.templated.as_ref() {
            Some(t) => t.untemplate(text),
            None => text.to_string(),
        }
    }
}
