//! Line classification for translation files and the scoping state carried while a file is read.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::codec::split_entry;
use crate::rules::REGEX_PREFIX;

pub const DIRECTIVE_PREFIX: char = '#';
pub const COMMENT_PREFIX: &str = "//";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    SetLevel(Vec<i32>),
    UnsetLevel(Vec<i32>),
    SetExe(Vec<String>),
    UnsetExe(Vec<String>),
}

impl Directive {
    /// Parses `#set level 1,2`, `#unset level 1`, `#set exe game.exe` or `#unset exe game`.
    pub fn parse(line: &str) -> Option<Self> {
        let body = line.trim().strip_prefix(DIRECTIVE_PREFIX)?;
        let mut words = body.split_whitespace();
        let verb = words.next()?.to_ascii_lowercase();
        let kind = words.next()?.to_ascii_lowercase();
        let args = words.collect::<Vec<_>>().join(" ");
        let args = args
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty());

        match (verb.as_str(), kind.as_str()) {
            ("set", "level") => Some(Self::SetLevel(args.filter_map(|a| a.parse().ok()).collect())),
            ("unset", "level") => {
                Some(Self::UnsetLevel(args.filter_map(|a| a.parse().ok()).collect()))
            }
            ("set", "exe") => Some(Self::SetExe(args.map(normalize_exe).collect())),
            ("unset", "exe") => Some(Self::UnsetExe(args.map(normalize_exe).collect())),
            _ => None,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: ToString>(items: &[T]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        }
        match self {
            Self::SetLevel(l) => write!(f, "#set level {}", join(l)),
            Self::UnsetLevel(l) => write!(f, "#unset level {}", join(l)),
            Self::SetExe(e) => write!(f, "#set exe {}", join(e)),
            Self::UnsetExe(e) => write!(f, "#unset exe {}", join(e)),
        }
    }
}

/// Executable names compare case-insensitively and without a `.exe` suffix.
pub fn normalize_exe(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

/// Scoping state accumulated from directives while one file is read.
#[derive(Clone, Debug, Default)]
pub struct LoadingContext {
    levels: BTreeSet<i32>,
    executables: HashSet<String>,
}

impl LoadingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, directive: &Directive) {
        match directive {
            Directive::SetLevel(levels) => self.levels.extend(levels.iter().copied()),
            Directive::UnsetLevel(levels) => {
                for level in levels {
                    self.levels.remove(level);
                }
            }
            Directive::SetExe(exes) => self.executables.extend(exes.iter().cloned()),
            Directive::UnsetExe(exes) => {
                for exe in exes {
                    self.executables.remove(exe);
                }
            }
        }
    }

    /// Lines are executable when no exe filter is active or the running application is listed.
    pub fn is_executable(&self, application: &str) -> bool {
        self.executables.is_empty() || self.executables.contains(&normalize_exe(application))
    }

    /// Active levels in ascending order; empty means the global scope.
    pub fn levels(&self) -> Vec<i32> {
        self.levels.iter().copied().collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedLine {
    Directive(Directive),
    Skip,
    Mapping { key: String, value: String },
    Regex { key: String, value: String },
}

/// Classifies one line. Directives are only recognized when `directives_enabled` is set.
pub fn parse_line(line: &str, directives_enabled: bool) -> ParsedLine {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
        return ParsedLine::Skip;
    }
    if directives_enabled {
        if let Some(directive) = Directive::parse(trimmed) {
            return ParsedLine::Directive(directive);
        }
    }
    match split_entry(line) {
        Some((key, value)) if key.starts_with(REGEX_PREFIX) => ParsedLine::Regex { key, value },
        Some((key, value)) => ParsedLine::Mapping { key, value },
        None => ParsedLine::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_level_and_exe_directives() {
        assert_eq!(
            Directive::parse("#set level 1, 2,x"),
            Some(Directive::SetLevel(vec![1, 2]))
        );
        assert_eq!(
            Directive::parse("  #unset exe Game.EXE"),
            Some(Directive::UnsetExe(vec!["game".to_string()]))
        );
        assert_eq!(Directive::parse("#sett level 1"), None);
        assert_eq!(Directive::parse("set level 1"), None);
    }

    #[test]
    fn display_round_trips() {
        let d = Directive::SetLevel(vec![3, 4]);
        assert_eq!(Directive::parse(&d.to_string()), Some(d));
    }

    #[test]
    fn context_tracks_levels_and_exe_filter() {
        let mut ctx = LoadingContext::new();
        assert!(ctx.is_executable("anything"));
        ctx.apply(&Directive::SetLevel(vec![2, 1]));
        assert_eq!(ctx.levels(), vec![1, 2]);
        ctx.apply(&Directive::UnsetLevel(vec![1]));
        assert_eq!(ctx.levels(), vec![2]);

        ctx.apply(&Directive::SetExe(vec!["game".to_string()]));
        assert!(ctx.is_executable("Game.exe"));
        assert!(!ctx.is_executable("Other"));
        ctx.apply(&Directive::UnsetExe(vec!["game".to_string()]));
        assert!(ctx.is_executable("Other"));
    }

    #[test]
    fn classifies_lines() {
        assert_eq!(parse_line("", true), ParsedLine::Skip);
        assert_eq!(parse_line("// note=x", true), ParsedLine::Skip);
        assert_eq!(parse_line("a=b=c", true), ParsedLine::Skip);
        assert_eq!(
            parse_line("#set level 5", true),
            ParsedLine::Directive(Directive::SetLevel(vec![5]))
        );
        assert_eq!(parse_line("#set level 5", false), ParsedLine::Skip);
        assert_eq!(
            parse_line("r:^(\\d+)$=n$1", true),
            ParsedLine::Regex {
                key: "r:^(\\d+)$".to_string(),
                value: "n$1".to_string()
            }
        );
        assert_eq!(
            parse_line("Hello=Bonjour", true),
            ParsedLine::Mapping {
                key: "Hello".to_string(),
                value: "Bonjour".to_string()
            }
        );
    }
}
