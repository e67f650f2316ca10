use std::collections::HashMap;
use std::fmt;

use crate::rules::{RegexRule, RuleList};

/// Partition of the translation tables. `Global` is the unscoped table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Scope {
    #[default]
    Global,
    Level(i32),
}

impl Scope {
    pub fn from_level(level: Option<i32>) -> Self {
        level.map_or(Self::Global, Self::Level)
    }

    pub fn is_global(self) -> bool {
        matches!(self, Self::Global)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Level(l) => write!(f, "level {l}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranslationType {
    Full,
    Token,
    FullAndToken,
}

impl TranslationType {
    pub fn includes_full(self) -> bool {
        matches!(self, Self::Full | Self::FullAndToken)
    }

    pub fn includes_token(self) -> bool {
        matches!(self, Self::Token | Self::FullAndToken)
    }
}

/// One scope's translations: full and token maps with their reverses, plus regex rules.
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    translations: HashMap<String, String>,
    /// Full-map keys in first-insertion order.
    order: Vec<String>,
    reverse_translations: HashMap<String, String>,
    token_translations: HashMap<String, String>,
    reverse_token_translations: HashMap<String, String>,
    rules: RuleList,
}

impl TranslationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins; the reverse map is updated alongside.
    pub fn insert(&mut self, key: &str, value: &str, kind: TranslationType) {
        if kind.includes_full() {
            if self
                .translations
                .insert(key.to_string(), value.to_string())
                .is_none()
            {
                self.order.push(key.to_string());
            }
            self.reverse_translations
                .insert(value.to_string(), key.to_string());
        }
        if kind.includes_token() {
            self.token_translations
                .insert(key.to_string(), value.to_string());
            self.reverse_token_translations
                .insert(value.to_string(), key.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.translations.get(key).map(String::as_str)
    }

    pub fn get_token(&self, key: &str) -> Option<&str> {
        self.token_translations.get(key).map(String::as_str)
    }

    pub fn get_reverse(&self, value: &str) -> Option<&str> {
        self.reverse_translations.get(value).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.translations.contains_key(key)
    }

    pub fn is_translation(&self, value: &str) -> bool {
        self.reverse_translations.contains_key(value)
    }

    pub fn is_token_translation(&self, value: &str) -> bool {
        self.reverse_token_translations.contains_key(value)
    }

    /// Snapshot of the full map in first-insertion order, for passes that insert while
    /// walking it.
    pub fn translation_pairs(&self) -> Vec<(String, String)> {
        self.order
            .iter()
            .filter_map(|k| self.translations.get(k).map(|v| (k.clone(), v.clone())))
            .collect()
    }

    pub fn translation_count(&self) -> usize {
        self.translations.len()
    }

    pub fn token_count(&self) -> usize {
        self.token_translations.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rules_mut(&mut self) -> &mut RuleList {
        &mut self.rules
    }

    pub fn register_rule(&mut self, rule: RegexRule) -> bool {
        self.rules.register(rule)
    }
}

/// All translation tables: the global one, one per level scope, and the static table.
///
/// Scoped tables are created on first insert and kept until `clear`. Lookups here never merge
/// a scoped table with the global one.
#[derive(Debug, Default)]
pub struct Store {
    global: TranslationTable,
    scoped: HashMap<i32, TranslationTable>,
    statics: HashMap<String, String>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, scope: Scope) -> Option<&TranslationTable> {
        match scope {
            Scope::Global => Some(&self.global),
            Scope::Level(level) => self.scoped.get(&level),
        }
    }

    pub fn table_mut(&mut self, scope: Scope) -> Option<&mut TranslationTable> {
        match scope {
            Scope::Global => Some(&mut self.global),
            Scope::Level(level) => self.scoped.get_mut(&level),
        }
    }

    pub fn table_or_create(&mut self, scope: Scope) -> &mut TranslationTable {
        match scope {
            Scope::Global => &mut self.global,
            Scope::Level(level) => self.scoped.entry(level).or_default(),
        }
    }

    pub fn global(&self) -> &TranslationTable {
        &self.global
    }

    /// Full-table lookup in exactly one scope.
    pub fn lookup(&self, scope: Scope, key: &str) -> Option<&str> {
        self.table(scope).and_then(|t| t.get(key))
    }

    pub fn insert(&mut self, scope: Scope, key: &str, value: &str, kind: TranslationType) {
        self.table_or_create(scope).insert(key, value, kind);
    }

    /// Registers a rule in `scope` unless the same raw pattern is already there.
    pub fn insert_rule(&mut self, scope: Scope, rule: RegexRule) -> bool {
        self.table_or_create(scope).register_rule(rule)
    }

    /// Whether `key` has a full translation in `scope`, or also in the global table when
    /// `include_global` is set.
    pub fn has_mapping(&self, scope: Scope, key: &str, include_global: bool) -> bool {
        let in_scope = self.table(scope).is_some_and(|t| t.contains(key));
        if include_global && !scope.is_global() {
            in_scope || self.global.contains(key)
        } else {
            in_scope
        }
    }

    /// Level scopes that have a table, ascending.
    pub fn levels(&self) -> Vec<i32> {
        let mut levels: Vec<i32> = self.scoped.keys().copied().collect();
        levels.sort_unstable();
        levels
    }

    pub fn insert_static(&mut self, key: String, value: String) {
        self.statics.insert(key, value);
    }

    pub fn get_static(&self, key: &str) -> Option<&str> {
        self.statics.get(key).map(String::as_str)
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    /// Drops every dynamic table. Static entries survive.
    pub fn clear(&mut self) {
        self.global = TranslationTable::new();
        self.scoped.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent_and_last_write_wins() {
        let mut store = Store::new();
        store.insert(Scope::Global, "a", "1", TranslationType::Full);
        store.insert(Scope::Global, "a", "1", TranslationType::Full);
        assert_eq!(store.global().translation_count(), 1);
        assert_eq!(store.global().get_reverse("1"), Some("a"));

        store.insert(Scope::Global, "a", "2", TranslationType::Full);
        assert_eq!(store.lookup(Scope::Global, "a"), Some("2"));
        assert_eq!(store.global().get_reverse("2"), Some("a"));
    }

    #[test]
    fn scoped_tables_are_lazy_and_isolated() {
        let mut store = Store::new();
        assert!(store.table(Scope::Level(3)).is_none());
        store.insert(Scope::Level(3), "a", "scoped", TranslationType::Full);
        store.insert(Scope::Global, "b", "global", TranslationType::Full);

        assert_eq!(store.lookup(Scope::Level(3), "a"), Some("scoped"));
        assert_eq!(store.lookup(Scope::Level(3), "b"), None);
        assert_eq!(store.lookup(Scope::Global, "a"), None);
        assert_eq!(store.levels(), vec![3]);
    }

    #[test]
    fn has_mapping_with_and_without_global() {
        let mut store = Store::new();
        store.insert(Scope::Global, "g", "x", TranslationType::Full);
        store.insert(Scope::Level(1), "s", "y", TranslationType::Full);

        assert!(!store.has_mapping(Scope::Level(1), "g", false));
        assert!(store.has_mapping(Scope::Level(1), "g", true));
        assert!(store.has_mapping(Scope::Level(1), "s", false));
        assert!(!store.has_mapping(Scope::Level(2), "s", true));
        assert!(store.has_mapping(Scope::Global, "g", false));
    }

    #[test]
    fn token_entries_are_separate_from_full_entries() {
        let mut table = TranslationTable::new();
        table.insert("tok", "jeton", TranslationType::Token);
        assert_eq!(table.get_token("tok"), Some("jeton"));
        assert_eq!(table.get("tok"), None);
        assert!(table.is_token_translation("jeton"));

        table.insert("both", "deux", TranslationType::FullAndToken);
        assert_eq!(table.get("both"), Some("deux"));
        assert_eq!(table.get_token("both"), Some("deux"));
    }

    #[test]
    fn pairs_follow_first_insertion_order() {
        let mut table = TranslationTable::new();
        for (k, v) in [("z", "1"), ("a", "2"), ("m", "3"), ("a", "4")] {
            table.insert(k, v, TranslationType::Full);
        }
        table.insert("t", "5", TranslationType::Token);
        let pairs = table.translation_pairs();
        let want = [("z", "1"), ("a", "4"), ("m", "3")];
        assert_eq!(pairs.len(), want.len());
        for ((k, v), (wk, wv)) in pairs.iter().zip(want) {
            assert_eq!((k.as_str(), v.as_str()), (wk, wv));
        }
    }

    #[test]
    fn rule_dedup_is_per_scope() {
        let mut store = Store::new();
        let rule = || RegexRule::new("r:^a$", "b").expect("rule");
        assert!(store.insert_rule(Scope::Global, rule()));
        assert!(!store.insert_rule(Scope::Global, rule()));
        assert!(store.insert_rule(Scope::Level(1), rule()));
    }

    #[test]
    fn clear_keeps_statics() {
        let mut store = Store::new();
        store.insert_static("s".to_string(), "t".to_string());
        store.insert(Scope::Level(9), "a", "b", TranslationType::Full);
        store.clear();
        assert!(store.levels().is_empty());
        assert_eq!(store.get_static("s"), Some("t"));
    }
}
