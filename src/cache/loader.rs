//! Rebuilds the cache from the translation directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use encoding_rs::UTF_8;
use tracing::{debug, error, info, warn};

use super::TranslationCache;
use crate::directive::{parse_line, LoadingContext, ParsedLine};
use crate::partial::prefix_pairs;
use crate::rules::RegexRule;
use crate::store::{Scope, TranslationType};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FileKind {
    /// The append-only log of learned translations; directives are ignored in it.
    Output,
    /// Find/replace pairs applied before lookup.
    Substitution,
    Translation,
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl TranslationCache {
    /// Clears every dynamic table and reloads them from disk, then derives variations,
    /// partial and token translations. Failures are logged; whatever loaded before the
    /// failure is kept.
    pub fn load_translations(&mut self) {
        let lock = Arc::clone(&self.pending);
        let started = Instant::now();
        {
            let _guard = lock.lock();
            let phase = Instant::now();
            match self.load_translation_files() {
                Ok(files) => info!(
                    "Loaded {files} translation file(s) (took {})",
                    seconds(phase.elapsed())
                ),
                Err(err) => {
                    error!("An error occurred while loading translations: {err:#}");
                    return;
                }
            }

            let phase = Instant::now();
            self.generate_variations();
            info!("Created variation translations (took {})", seconds(phase.elapsed()));

            if self.settings.generate_partial_translations {
                let phase = Instant::now();
                self.generate_partial_translations();
                info!("Created partial translations (took {})", seconds(phase.elapsed()));
            }

            let phase = Instant::now();
            self.generate_token_translations();
            info!("Created token translations (took {})", seconds(phase.elapsed()));
        }
        self.log_summary(started.elapsed());
    }

    fn load_translation_files(&mut self) -> anyhow::Result<usize> {
        let dir = self.settings.translation_dir.clone();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create translation directory: {}", dir.display()))?;
        if let Some(parent) = self.settings.output_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        self.store.clear();
        self.partials.clear();
        self.substitutions.clear();

        let output = self.settings.output_file.clone();
        let substitution = self.settings.substitution_file.clone();
        let mut loaded = 0usize;

        if output.is_file() {
            self.load_file(&output, FileKind::Output)?;
            loaded += 1;
        }
        if substitution.is_file() {
            self.load_file(&substitution, FileKind::Substitution)?;
            loaded += 1;
        } else {
            std::fs::write(&substitution, UTF8_BOM).with_context(|| {
                format!("Failed to create substitution file: {}", substitution.display())
            })?;
        }

        for path in translation_files(&dir)? {
            if same_file(&path, &output) || same_file(&path, &substitution) {
                continue;
            }
            self.load_file(&path, FileKind::Translation)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    fn load_file(&mut self, path: &Path, kind: FileKind) -> anyhow::Result<()> {
        debug!("Loading texts: {}", path.display());
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read: {}", path.display()))?;
        let (text, had_errors) = UTF_8.decode_with_bom_removal(&bytes);
        if had_errors {
            warn!("Invalid UTF-8 replaced while reading {}", path.display());
        }

        let directives_enabled = self.settings.enable_translation_scoping && kind != FileKind::Output;
        let mut context = LoadingContext::new();

        for line in text.lines() {
            match parse_line(line, directives_enabled) {
                ParsedLine::Directive(directive) => {
                    debug!("Directive in file: {}: {directive}", path.display());
                    context.apply(&directive);
                }
                ParsedLine::Skip => {}
                _ if !context.is_executable(&self.settings.application_name) => {}
                ParsedLine::Mapping { key, value } | ParsedLine::Regex { key, value }
                    if kind == FileKind::Substitution =>
                {
                    self.substitutions.insert(key, value);
                }
                ParsedLine::Regex { key, value } => match RegexRule::new(&key, &value) {
                    Ok(rule) => {
                        for scope in scopes_of(&context) {
                            self.store.insert_rule(scope, rule.clone());
                        }
                    }
                    Err(err) => warn!(
                        "An error occurred while constructing regex translation: '{line}': {err}"
                    ),
                },
                ParsedLine::Mapping { key, value } => {
                    for scope in scopes_of(&context) {
                        self.store.insert(scope, &key, &value, TranslationType::Full);
                    }
                }
            }
        }
        Ok(())
    }

    fn generate_variations(&mut self) {
        let mut scopes = vec![Scope::Global];
        scopes.extend(self.store.levels().into_iter().map(Scope::Level));
        for scope in scopes {
            let pairs = match self.store.table(scope) {
                Some(table) => table.translation_pairs(),
                None => continue,
            };
            for (key, value) in pairs {
                self.add_variations(&key, &value, scope);
            }
        }
    }

    fn generate_partial_translations(&mut self) {
        for (key, value) in self.store.global().translation_pairs() {
            for (original, translated) in prefix_pairs(&key, &value) {
                if translated.is_empty() || self.store.has_mapping(Scope::Global, &original, false) {
                    continue;
                }
                self.store
                    .insert(Scope::Global, &original, &translated, TranslationType::Full);
                self.partials.insert(original);
            }
        }
    }

    /// Pairs up the markup arguments of every full entry whose both sides parse.
    fn generate_token_translations(&mut self) {
        let mut scopes = vec![Scope::Global];
        scopes.extend(self.store.levels().into_iter().map(Scope::Level));
        for scope in scopes {
            let pairs = match self.store.table(scope) {
                Some(table) => table.translation_pairs(),
                None => continue,
            };
            for (key, value) in pairs {
                let Some(untranslated) = self.parser.parse(&key, scope) else {
                    continue;
                };
                let Some(translated) = self.parser.parse(&value, scope) else {
                    continue;
                };
                if untranslated.arguments.len() != translated.arguments.len() {
                    continue;
                }
                let mut ids: Vec<&String> = untranslated.arguments.keys().collect();
                ids.sort();
                for id in ids {
                    if let Some(translated_token) = translated.arguments.get(id) {
                        let token = &untranslated.arguments[id];
                        self.store
                            .insert(scope, token, translated_token, TranslationType::Token);
                    }
                }
            }
        }
    }

    fn log_summary(&self, elapsed: Duration) {
        let stats = self.stats();
        info!("Global translations generated: {}", stats.global.translations);
        info!("Global regex translations generated: {}", stats.global.regexes);
        info!("Global token translations generated: {}", stats.global.tokens);
        if self.settings.generate_partial_translations {
            info!("Global partial translations generated: {}", stats.partials);
        }
        for scope in &stats.scopes {
            info!(
                "Level {} translations generated: {} (regex: {}, token: {})",
                scope.level, scope.table.translations, scope.table.regexes, scope.table.tokens
            );
        }
        info!(
            "Substitutions: {}, static translations: {} (load took {})",
            stats.substitutions,
            stats.statics,
            seconds(elapsed)
        );
    }
}

/// Active levels of `context`, or the global scope when none is set.
fn scopes_of(context: &LoadingContext) -> Vec<Scope> {
    let levels = context.levels();
    if levels.is_empty() {
        vec![Scope::Global]
    } else {
        levels.into_iter().map(Scope::Level).collect()
    }
}

/// Every `*.txt` file below `dir`, in reverse path order.
fn translation_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*.txt", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid translation file pattern: {pattern}"))?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    files.reverse();
    Ok(files)
}

fn seconds(d: Duration) -> String {
    format!("{:.2} seconds", d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheSettings;

    fn cache_in(dir: &Path) -> TranslationCache {
        let mut settings = CacheSettings::in_dir(dir);
        settings.use_static_translations = false;
        settings.application_name = "Game".to_string();
        TranslationCache::new(settings)
    }

    fn write(cache: &TranslationCache, name: &str, body: &str) {
        let path = cache.settings().translation_dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn creates_substitution_file_with_bom() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_in(dir.path());
        cache.load_translations();
        let bytes = std::fs::read(&cache.settings().substitution_file).unwrap();
        assert_eq!(bytes, UTF8_BOM);
    }

    #[test]
    fn directives_scope_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_in(dir.path());
        write(
            &cache,
            "a.txt",
            "Start=Début\n#set level 1,2\nDoor=Porte\n#unset level 1,2\nEnd=Fin\n// note=x\nbad line\n",
        );
        cache.load_translations();

        assert!(cache.has_translation("Start", Scope::Global, false));
        assert!(cache.has_translation("End", Scope::Global, false));
        assert!(!cache.has_translation("Door", Scope::Global, false));
        assert!(cache.has_translation("Door", Scope::Level(1), false));
        assert!(cache.has_translation("Door", Scope::Level(2), false));
        assert!(!cache.has_translation("// note", Scope::Global, false));
    }

    #[test]
    fn exe_filter_skips_other_applications() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_in(dir.path());
        write(
            &cache,
            "b.txt",
            "#set exe other.exe\nA=1\n#unset exe other.exe\n#set exe game.exe\nB=2\n",
        );
        cache.load_translations();
        assert!(!cache.has_translation("A", Scope::Global, false));
        assert!(cache.has_translation("B", Scope::Global, false));
    }

    #[test]
    fn output_file_ignores_directives_and_loads_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_in(dir.path());
        write(&cache, "_AutoGeneratedTranslations.txt", "#set level 5\nCat=Chat auto\n");
        write(&cache, "manual.txt", "Cat=Chat\n");
        cache.load_translations();

        assert!(cache.store().table(Scope::Level(5)).is_none());
        assert_eq!(cache.store().lookup(Scope::Global, "Cat"), Some("Chat"));
    }

    #[test]
    fn later_files_in_reverse_order_win_regex_ties() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_in(dir.path());
        write(&cache, "a.txt", "r:^Lv (\\d+)$=A$1\n");
        write(&cache, "z/b.txt", "r:^Lv (\\d+)$=B$1\nr:\"^Hp (\\d+)$\"=\"PV $1\"\nr:(=broken\n");
        cache.load_translations();

        // b.txt loads before a.txt; the duplicate raw pattern in a.txt is skipped
        assert_eq!(cache.store().global().rule_count(), 2);
        assert_eq!(cache.translate("Lv 3", Scope::Global).as_deref(), Some("B3"));
        assert_eq!(cache.translate("Hp 9", Scope::Global).as_deref(), Some("PV 9"));
    }

    #[test]
    fn substitutions_are_not_translations() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_in(dir.path());
        std::fs::create_dir_all(&cache.settings().translation_dir).unwrap();
        std::fs::write(&cache.settings().substitution_file, "\u{feff}Hero=Sophie\n").unwrap();
        cache.load_translations();

        assert_eq!(cache.substitute("Hero wins"), "Sophie wins");
        assert!(!cache.has_translation("Hero", Scope::Global, false));
    }

    #[test]
    fn generates_variations_and_partials() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_in(dir.path());
        cache.settings.generate_partial_translations = true;
        write(&cache, "c.txt", " Hi \nAB{{X}}C=12{{X}}3\n");
        write(&cache, "d.txt", "  Spaced  =  Espacé  \n");
        cache.load_translations();

        assert_eq!(cache.store().lookup(Scope::Global, "Spaced"), Some("Espacé"));

        assert!(cache.is_partial("A"));
        assert!(cache.is_partial("AB{{X}}"));
        assert_eq!(cache.store().lookup(Scope::Global, "AB"), Some("12"));
        assert!(!cache.is_partial("AB{{X}}C"));
    }

    #[test]
    fn pairs_markup_arguments_as_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_in(dir.path());
        write(
            &cache,
            "e.txt",
            "<b>剣</b>を拾った=<b>Sword</b> picked up\n<i>盾</i>=<i>Shield</i> and <b>more</b>\n",
        );
        cache.load_translations();

        assert_eq!(cache.store().global().get_token("剣"), Some("Sword"));
        assert_eq!(cache.store().global().get_token("盾"), None);
        assert!(!cache.is_partial("<b>"));
    }

    #[test]
    fn derived_entries_are_stable_across_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = CacheSettings::in_dir(dir.path());
        settings.use_static_translations = false;
        settings.from_language = "en".to_string();
        settings.generate_partial_translations = true;
        let mut cache = TranslationCache::new(settings);
        write(&cache, "a.txt", "AB=12\nAC=34\nAD=56\nAE=78\n Hi=A\nHi =B\n  Hi=C\nHi  =D\n");

        for _ in 0..20 {
            cache.load_translations();
            assert_eq!(cache.store().lookup(Scope::Global, "A"), Some("1"));
            assert_eq!(cache.store().lookup(Scope::Global, "Hi"), Some("A"));
        }
    }

    #[test]
    fn failed_load_keeps_earlier_files_and_skips_derived_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_in(dir.path());
        write(&cache, "_AutoGeneratedTranslations.txt", "Cat=Chat\n  Dog  =  Chien  \n");
        write(&cache, "other.txt", "Bird=Oiseau\n");
        // a directory where the substitution file should be cannot be created or read
        std::fs::create_dir_all(&cache.settings().substitution_file).unwrap();
        cache.load_translations();

        assert!(cache.has_translation("Cat", Scope::Global, false));
        assert!(cache.has_translation("  Dog  ", Scope::Global, false));
        assert!(!cache.has_translation("Dog", Scope::Global, false));
        assert!(!cache.has_translation("Bird", Scope::Global, false));
    }

    #[test]
    fn reload_clears_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache_in(dir.path());
        write(&cache, "a.txt", "One=Un\n");
        cache.load_translations();
        assert!(cache.has_translation("One", Scope::Global, false));

        std::fs::remove_file(cache.settings().translation_dir.join("a.txt")).unwrap();
        cache.load_translations();
        assert!(!cache.has_translation("One", Scope::Global, false));
    }
}
