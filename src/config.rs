use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use crate::textutil::uses_whitespace_between_words;

pub const CONFIG_FILE_NAME: &str = "textcache.toml";
pub const CONFIG_ENV_VAR: &str = "TEXTCACHE_CONFIG";

pub const DEFAULT_FROM_LANGUAGE: &str = "ja";
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_TRANSLATION_DIR: &str = "Translation";
pub const DEFAULT_OUTPUT_FILE: &str = "_AutoGeneratedTranslations.txt";
pub const DEFAULT_SUBSTITUTION_FILE: &str = "_Substitutions.txt";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub cache: CacheSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CacheSection {
    /// Directory scanned (recursively) for `*.txt` translation files.
    /// Relative paths resolve against the config file directory.
    #[serde(default)]
    pub translation_dir: Option<PathBuf>,
    /// Append-only log of learned translations. Relative to `translation_dir`.
    #[serde(default)]
    pub output_file: Option<PathBuf>,
    /// Find/replace pairs applied before lookup. Relative to `translation_dir`.
    #[serde(default)]
    pub substitution_file: Option<PathBuf>,

    #[serde(default)]
    pub from_language: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    /// Name matched against `#set exe` directives. Defaults to the running executable's stem.
    #[serde(default)]
    pub application_name: Option<String>,

    #[serde(default)]
    pub enable_translation_scoping: Option<bool>,
    #[serde(default)]
    pub generate_partial_translations: Option<bool>,
    #[serde(default)]
    pub cache_regex_lookups: Option<bool>,
    #[serde(default)]
    pub persist_regex_lookups: Option<bool>,
    #[serde(default)]
    pub use_static_translations: Option<bool>,
    #[serde(default)]
    pub template_all_numbers_away: Option<bool>,
    /// Suppress per-lookup info logging.
    #[serde(default)]
    pub silent: Option<bool>,
}

#[derive(Clone, Debug)]
pub struct CacheSettings {
    pub translation_dir: PathBuf,
    pub output_file: PathBuf,
    pub substitution_file: PathBuf,
    pub from_language: String,
    pub language: String,
    pub application_name: String,
    pub enable_translation_scoping: bool,
    pub generate_partial_translations: bool,
    pub cache_regex_lookups: bool,
    pub persist_regex_lookups: bool,
    pub use_static_translations: bool,
    pub template_all_numbers_away: bool,
    pub silent: bool,
}

impl CacheSettings {
    /// Defaults with the translation directory placed under `base_dir`.
    pub fn in_dir(base_dir: &Path) -> Self {
        Self::from_config(&AppConfig::default(), base_dir)
    }

    pub fn from_config(cfg: &AppConfig, base_dir: &Path) -> Self {
        let c = &cfg.cache;
        let translation_dir = c
            .translation_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TRANSLATION_DIR));
        let translation_dir = if translation_dir.is_relative() {
            base_dir.join(translation_dir)
        } else {
            translation_dir
        };
        let under_dir = |p: Option<&PathBuf>, default: &str| {
            let p = p.cloned().unwrap_or_else(|| PathBuf::from(default));
            if p.is_relative() {
                translation_dir.join(p)
            } else {
                p
            }
        };
        let output_file = under_dir(c.output_file.as_ref(), DEFAULT_OUTPUT_FILE);
        let substitution_file = under_dir(c.substitution_file.as_ref(), DEFAULT_SUBSTITUTION_FILE);

        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Self {
            output_file,
            substitution_file,
            translation_dir,
            from_language: non_empty(&c.from_language)
                .unwrap_or_else(|| DEFAULT_FROM_LANGUAGE.to_string()),
            language: non_empty(&c.language).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            application_name: non_empty(&c.application_name).unwrap_or_else(current_exe_stem),
            enable_translation_scoping: c.enable_translation_scoping.unwrap_or(true),
            generate_partial_translations: c.generate_partial_translations.unwrap_or(false),
            cache_regex_lookups: c.cache_regex_lookups.unwrap_or(true),
            persist_regex_lookups: c.persist_regex_lookups.unwrap_or(false),
            use_static_translations: c.use_static_translations.unwrap_or(true),
            template_all_numbers_away: c.template_all_numbers_away.unwrap_or(false),
            silent: c.silent.unwrap_or(false),
        }
    }

    /// Loads settings from `explicit`, `$TEXTCACHE_CONFIG`, or the nearest `textcache.toml`
    /// above the working directory. Without any file, defaults rooted at the working directory.
    pub fn resolve(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let cfg_file = explicit
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
            .or_else(|| find_file_upwards(&cwd, CONFIG_FILE_NAME, 8));

        match cfg_file {
            Some(path) => {
                let cfg = load_config(&path)?;
                let base = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| cwd.clone());
                Ok(Self::from_config(&cfg, &base))
            }
            None => Ok(Self::in_dir(&cwd)),
        }
    }

    pub fn from_uses_word_spacing(&self) -> bool {
        uses_whitespace_between_words(&self.from_language)
    }

    pub fn to_uses_word_spacing(&self) -> bool {
        uses_whitespace_between_words(&self.language)
    }

    /// The bundled static table only applies to the default language pair.
    pub fn uses_default_languages(&self) -> bool {
        self.from_language.eq_ignore_ascii_case(DEFAULT_FROM_LANGUAGE)
            && self.language.eq_ignore_ascii_case(DEFAULT_LANGUAGE)
    }
}

fn current_exe_stem() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_default()
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILE_NAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r##"[cache]
# Scanned recursively for *.txt files (relative to this file).
translation_dir = "Translation"
# Both relative to translation_dir.
output_file = "_AutoGeneratedTranslations.txt"
substitution_file = "_Substitutions.txt"

from_language = "ja"
language = "en"
# application_name = "Game"

# Honor "#set level" / "#set exe" directives in translation files.
enable_translation_scoping = true
generate_partial_translations = false

# Regex hits are cached in memory; global-rule hits can also be appended to output_file.
cache_regex_lookups = true
persist_regex_lookups = false

use_static_translations = true
template_all_numbers_away = false
silent = false
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_rooted_at_base_dir() {
        let s = CacheSettings::in_dir(Path::new("/data"));
        assert_eq!(s.translation_dir, PathBuf::from("/data/Translation"));
        assert_eq!(
            s.output_file,
            PathBuf::from("/data/Translation/_AutoGeneratedTranslations.txt")
        );
        assert!(s.uses_default_languages());
        assert!(!s.from_uses_word_spacing());
        assert!(s.to_uses_word_spacing());
        assert!(s.cache_regex_lookups);
        assert!(!s.persist_regex_lookups);
    }

    #[test]
    fn parses_partial_toml() {
        let cfg: AppConfig = toml::from_str(
            r#"
[cache]
translation_dir = "/abs/tl"
output_file = "out.txt"
language = "fr"
generate_partial_translations = true
application_name = "  "
"#,
        )
        .expect("toml");
        let s = CacheSettings::from_config(&cfg, Path::new("/ignored"));
        assert_eq!(s.translation_dir, PathBuf::from("/abs/tl"));
        assert_eq!(s.output_file, PathBuf::from("/abs/tl/out.txt"));
        assert_eq!(s.language, "fr");
        assert!(s.generate_partial_translations);
        assert!(!s.uses_default_languages());
        assert_eq!(s.application_name, current_exe_stem());
    }

    #[test]
    fn default_config_text_parses() {
        let cfg: AppConfig = toml::from_str(DEFAULT_CONFIG_TOML).expect("toml");
        assert_eq!(cfg.cache.from_language.as_deref(), Some("ja"));
        assert_eq!(cfg.cache.enable_translation_scoping, Some(true));
        assert_eq!(cfg.cache.silent, Some(false));
        assert!(DEFAULT_CONFIG_TOML.contains("\"#set level\""));
    }
}
