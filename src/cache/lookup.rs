//! Tiered resolution: token, untemplated, literal (scoped table, then global), regex, static.

use once_cell::unsync::OnceCell;
use tracing::info;

use super::TranslationCache;
use crate::normalize::{NormalizedText, TrimLevel};
use crate::store::{Scope, TranslationTable, TranslationType};

/// Which tier produced a lookup result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tier {
    Token,
    Untemplated,
    Literal,
    Regex,
    Static,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub tier: Tier,
    /// Table (or rule list) the value came from.
    pub scope: Scope,
    /// Found through a trimmed variant and rebuilt for the literal key.
    pub reconstructed: bool,
}

/// Per-call state shared by the tiers. The untemplated variants are only built if a tier
/// asks for them.
struct LookupContext<'a> {
    key: &'a NormalizedText,
    uses_word_spacing: bool,
    untemplated: OnceCell<NormalizedText>,
}

impl<'a> LookupContext<'a> {
    fn new(key: &'a NormalizedText, uses_word_spacing: bool) -> Self {
        Self {
            key,
            uses_word_spacing,
            untemplated: OnceCell::new(),
        }
    }

    fn untemplated(&self) -> &NormalizedText {
        self.untemplated
            .get_or_init(|| NormalizedText::plain(self.key.original(), self.uses_word_spacing))
    }
}

enum Hit {
    Exact(String),
    Reconstructed {
        key: String,
        value: String,
        level: TrimLevel,
    },
}

/// Token probes use the exact and internally trimmed forms only; templated keys try their
/// literal text first.
fn token_tier(table: &TranslationTable, ctx: &LookupContext<'_>) -> Option<String> {
    let key = ctx.key;
    let untemplated = (key.is_templated() && !key.is_from_noisy_source()).then(|| ctx.untemplated());
    untemplated
        .into_iter()
        .chain(std::iter::once(key))
        .find_map(|text| probe_token(table, text))
}

fn probe_token(table: &TranslationTable, text: &NormalizedText) -> Option<String> {
    table
        .get_token(text.templated_original())
        .or_else(|| {
            text.internal_differs()
                .then(|| table.get_token(text.templated_internally_trimmed()))
                .flatten()
        })
        .map(str::to_string)
}

/// Probes the full table with each trim level of `text`. Hits on a trimmed variant are
/// rebuilt for `text`'s own whitespace; the internally trimmed variant keeps the outer
/// whitespace so its value is used unchanged.
fn probe_full(table: &TranslationTable, text: &NormalizedText) -> Option<Hit> {
    for level in TrimLevel::ALL {
        if !text.level_differs(level) {
            continue;
        }
        let variant = text.variant(level);
        if variant.is_empty() {
            continue;
        }
        let Some(value) = table.get(variant) else {
            continue;
        };
        let hit = match level {
            TrimLevel::Original => Hit::Exact(value.to_string()),
            TrimLevel::Internal => Hit::Reconstructed {
                key: text.templated_original().to_string(),
                value: value.to_string(),
                level,
            },
            TrimLevel::External | TrimLevel::Full => Hit::Reconstructed {
                key: text.templated_original().to_string(),
                value: text.rewrap(value),
                level,
            },
        };
        return Some(hit);
    }
    None
}

impl TranslationCache {
    /// Resolves `key` through every enabled tier; `None` when nothing matches.
    pub fn try_get_translation(
        &mut self,
        key: &NormalizedText,
        allow_regex: bool,
        allow_token: bool,
        scope: Scope,
    ) -> Option<String> {
        self.resolve(key, allow_regex, allow_token, scope)
            .map(|r| r.value)
    }

    pub fn resolve(
        &mut self,
        key: &NormalizedText,
        allow_regex: bool,
        allow_token: bool,
        scope: Scope,
    ) -> Option<Resolved> {
        if key.original().trim().is_empty() {
            return None;
        }
        let scope = if self.settings.enable_translation_scoping {
            scope
        } else {
            Scope::Global
        };
        let ctx = LookupContext::new(key, self.settings.from_uses_word_spacing());

        if !scope.is_global() {
            if let Some(found) = self.dictionary_tiers(&ctx, allow_token, scope) {
                return Some(found);
            }
        }
        if let Some(found) = self.dictionary_tiers(&ctx, allow_token, Scope::Global) {
            return Some(found);
        }
        if allow_regex {
            if let Some(found) = self.regex_tier(key, scope) {
                return Some(found);
            }
        }
        self.static_tier(key)
    }

    /// Token, untemplated and literal tiers against exactly one table.
    fn dictionary_tiers(
        &mut self,
        ctx: &LookupContext<'_>,
        allow_token: bool,
        scope: Scope,
    ) -> Option<Resolved> {
        let table = self.store.table(scope)?;
        let key = ctx.key;

        if allow_token && !key.is_from_noisy_source() {
            if let Some(value) = token_tier(table, ctx) {
                return Some(Resolved {
                    value,
                    tier: Tier::Token,
                    scope,
                    reconstructed: false,
                });
            }
        }

        let mut hit = None;
        if key.is_templated() && !key.is_from_noisy_source() {
            hit = probe_full(table, ctx.untemplated()).map(|h| (h, Tier::Untemplated));
        }
        if hit.is_none() {
            hit = probe_full(table, key).map(|h| (h, Tier::Literal));
        }

        let (hit, tier) = hit?;
        Some(self.finish_hit(hit, tier, scope))
    }

    fn finish_hit(&mut self, hit: Hit, tier: Tier, scope: Scope) -> Resolved {
        match hit {
            Hit::Exact(value) => Resolved {
                value,
                tier,
                scope,
                reconstructed: false,
            },
            Hit::Reconstructed { key, value, level } => {
                if !self.settings.silent {
                    info!(
                        "Whitespace difference ({}, {scope}): '{key}' => '{value}'",
                        level.name()
                    );
                }
                self.add_translation_to_cache(&key, &value, false, TranslationType::Full, scope);
                Resolved {
                    value,
                    tier,
                    scope,
                    reconstructed: true,
                }
            }
        }
    }

    /// Scoped rules, then global ones, each list newest first, against the literal text.
    fn regex_tier(&mut self, key: &NormalizedText, scope: Scope) -> Option<Resolved> {
        let text = key.original();
        let mut scopes = vec![Scope::Global];
        if !scope.is_global() {
            scopes.insert(0, scope);
        }

        for rule_scope in scopes {
            let Some(table) = self.store.table_mut(rule_scope) else {
                continue;
            };
            let Some(found) = table.rules_mut().resolve(text) else {
                continue;
            };
            if !self.settings.silent {
                info!(
                    "Regex lookup ({rule_scope}): '{text}' => '{}' using '{}'",
                    found.value, found.pattern
                );
            }
            if self.settings.cache_regex_lookups {
                let persist = rule_scope.is_global() && self.settings.persist_regex_lookups;
                self.add_translation_to_cache(
                    text,
                    &found.value,
                    persist,
                    TranslationType::Full,
                    rule_scope,
                );
            }
            return Some(Resolved {
                value: found.value,
                tier: Tier::Regex,
                scope: rule_scope,
                reconstructed: false,
            });
        }
        None
    }

    /// Bundled entries: the templated text, then its internally trimmed form. Either hit is
    /// promoted for the templated text.
    fn static_tier(&mut self, key: &NormalizedText) -> Option<Resolved> {
        let text = key.templated_original();
        let (value, reconstructed) = match self.store.get_static(text) {
            Some(v) => (v.to_string(), false),
            None if key.internal_differs() => (
                self.store
                    .get_static(key.templated_internally_trimmed())?
                    .to_string(),
                true,
            ),
            None => return None,
        };

        if !self.settings.silent {
            info!("Static lookup: '{text}' => '{value}'");
        }
        self.add_translation_to_cache(text, &value, true, TranslationType::Full, Scope::Global);
        Some(Resolved {
            value,
            tier: Tier::Static,
            scope: Scope::Global,
            reconstructed,
        })
    }
}
