//! The translation cache engine: owns the store, resolves lookups through the tier chain,
//! grows the cache with normalized variants and queues learned pairs for the output log.

mod loader;
mod lookup;
mod persist;

pub use lookup::{Resolved, Tier};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::error;

use crate::codec::split_entry;
use crate::config::CacheSettings;
use crate::normalize::{NormalizeOptions, NormalizedText};
use crate::richtext::{RichTextParser, TagParser};
use crate::store::{Scope, Store, TranslationTable, TranslationType};
use crate::textutil::has_translatable_content;
use persist::PendingTranslations;

const STATIC_TRANSLATIONS: &str = include_str!("../../resources/static_translations.txt");

pub struct TranslationCache {
    settings: CacheSettings,
    store: Store,
    partials: HashSet<String>,
    substitutions: HashMap<String, String>,
    /// Queue of pairs not yet written to the output log. Its lock also serializes the
    /// load pass and `flush`.
    pending: Arc<Mutex<PendingTranslations>>,
    parser: Box<dyn RichTextParser>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct TableStats {
    pub translations: usize,
    pub tokens: usize,
    pub regexes: usize,
}

impl From<&TranslationTable> for TableStats {
    fn from(t: &TranslationTable) -> Self {
        Self {
            translations: t.translation_count(),
            tokens: t.token_count(),
            regexes: t.rule_count(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ScopeStats {
    pub level: i32,
    #[serde(flatten)]
    pub table: TableStats,
}

#[derive(Clone, Debug, Serialize)]
pub struct CacheStats {
    pub global: TableStats,
    pub scopes: Vec<ScopeStats>,
    pub statics: usize,
    pub partials: usize,
    pub substitutions: usize,
    pub pending: usize,
}

impl TranslationCache {
    /// Creates an empty cache. The bundled static table is loaded when it applies to the
    /// configured language pair; call `load_translations` to read the translation files.
    pub fn new(settings: CacheSettings) -> Self {
        let mut cache = Self {
            settings,
            store: Store::new(),
            partials: HashSet::new(),
            substitutions: HashMap::new(),
            pending: Arc::new(Mutex::new(PendingTranslations::default())),
            parser: Box::new(TagParser),
        };
        cache.load_static_translations();
        cache
    }

    #[must_use]
    pub fn with_parser(mut self, parser: impl RichTextParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn load_static_translations(&mut self) {
        if !self.settings.use_static_translations || !self.settings.uses_default_languages() {
            return;
        }
        for line in STATIC_TRANSLATIONS.lines() {
            if let Some((key, value)) = split_entry(line) {
                self.store.insert_static(key, value);
            }
        }
    }

    /// Normalizes caller text with the configured templating and word-spacing rules.
    pub fn normalize(&self, text: &str, from_noisy_source: bool) -> NormalizedText {
        NormalizedText::new(
            text,
            NormalizeOptions {
                template_numbers: self.settings.template_all_numbers_away,
                trim_internal: true,
                uses_word_spacing: self.settings.from_uses_word_spacing(),
                from_noisy_source,
            },
        )
    }

    /// Like `normalize`, but markup recognized by the rich-text parser becomes the template,
    /// so the untemplated tier can still match the literal text.
    pub fn normalize_markup(&self, text: &str, scope: Scope) -> NormalizedText {
        let opts = NormalizeOptions {
            template_numbers: false,
            trim_internal: true,
            uses_word_spacing: self.settings.from_uses_word_spacing(),
            from_noisy_source: false,
        };
        match self.parser.parse(text, scope) {
            Some(templated) => NormalizedText::with_template(templated, opts),
            None => NormalizedText::new(text, opts),
        }
    }

    /// Records a translation. Full entries are only added when `key` is new in `scope`, and
    /// bring their trimmed variants along. Scoped entries are never persisted.
    pub fn add_translation_to_cache(
        &mut self,
        key: &str,
        value: &str,
        persist: bool,
        kind: TranslationType,
        scope: Scope,
    ) {
        if key.is_empty() || value.is_empty() {
            return;
        }
        if kind.includes_token() {
            self.store.insert(scope, key, value, TranslationType::Token);
        }
        if !kind.includes_full() || self.store.has_mapping(scope, key, false) {
            return;
        }

        self.store.insert(scope, key, value, TranslationType::Full);
        self.add_variations(key, value, scope);

        if persist {
            if scope.is_global() {
                self.queue_for_disk(key, value);
            } else {
                error!("Translation for {scope} was not persisted: scoped translations cannot be stored on disk");
            }
        }
    }

    /// Adds the externally and fully trimmed forms of a pair when they are missing.
    fn add_variations(&mut self, key: &str, value: &str, scope: Scope) {
        let ukey = NormalizedText::plain(key, self.settings.from_uses_word_spacing());
        let uvalue = NormalizedText::plain(value, self.settings.to_uses_word_spacing());

        let external = ukey.templated_externally_trimmed();
        let full = ukey.templated_fully_trimmed();
        if external != key && !external.is_empty() && !self.store.has_mapping(scope, external, false)
        {
            self.store.insert(
                scope,
                external,
                uvalue.templated_externally_trimmed(),
                TranslationType::Full,
            );
        }
        if external != full && !full.is_empty() && !self.store.has_mapping(scope, full, false) {
            self.store.insert(
                scope,
                full,
                uvalue.templated_fully_trimmed(),
                TranslationType::Full,
            );
        }
    }

    /// Normalizes, resolves with every tier enabled, and puts the text's own placeholder
    /// content back into the result.
    pub fn translate(&mut self, text: &str, scope: Scope) -> Option<String> {
        let key = self.normalize(text, false);
        let value = self.try_get_translation(&key, true, true, scope)?;
        Some(key.untemplate(&value))
    }

    /// Original text for a known translation; the scoped table is consulted first.
    pub fn try_get_reverse_translation(&self, value: &str, scope: Scope) -> Option<&str> {
        let scoped = match scope {
            Scope::Global => None,
            Scope::Level(_) => self.store.table(scope).and_then(|t| t.get_reverse(value)),
        };
        scoped.or_else(|| self.store.global().get_reverse(value))
    }

    pub fn has_translation(&self, key: &str, scope: Scope, include_global: bool) -> bool {
        self.store.has_mapping(scope, key, include_global)
    }

    fn is_translation(&self, text: &str, scope: Scope) -> bool {
        if self.store.has_mapping(scope, text, true) {
            return false;
        }
        self.store.global().is_translation(text)
            || (!scope.is_global()
                && self
                    .store
                    .table(scope)
                    .is_some_and(|t| t.is_translation(text)))
    }

    fn is_token_translation(&self, text: &str, scope: Scope) -> bool {
        self.store.global().is_token_translation(text)
            || (!scope.is_global()
                && self
                    .store
                    .table(scope)
                    .is_some_and(|t| t.is_token_translation(text)))
    }

    /// Whether `text` should be sent for translation: it has letters and is not itself
    /// output of an earlier translation.
    pub fn is_translatable(&self, text: &str, is_token: bool, scope: Scope) -> bool {
        let translatable = has_translatable_content(text) && !self.is_translation(text, scope);
        if is_token && translatable {
            return !self.is_token_translation(text, scope);
        }
        translatable
    }

    pub fn is_partial(&self, text: &str) -> bool {
        self.partials.contains(text)
    }

    /// Applies substitution pairs, longest key first.
    pub fn substitute(&self, text: &str) -> String {
        if self.substitutions.is_empty() {
            return text.to_string();
        }
        let mut pairs: Vec<(&String, &String)> = self.substitutions.iter().collect();
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        let mut out = text.to_string();
        for (from, to) in pairs {
            if out.contains(from.as_str()) {
                out = out.replace(from.as_str(), to);
            }
        }
        out
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            global: TableStats::from(self.store.global()),
            scopes: self
                .store
                .levels()
                .into_iter()
                .filter_map(|level| {
                    self.store.table(Scope::Level(level)).map(|t| ScopeStats {
                        level,
                        table: TableStats::from(t),
                    })
                })
                .collect(),
            statics: self.store.static_count(),
            partials: self.partials.len(),
            substitutions: self.substitutions.len(),
            pending: self.pending_count(),
        }
    }
}
