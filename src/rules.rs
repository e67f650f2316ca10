use std::collections::HashSet;

use regex::Regex;

use crate::error::RuleError;

pub const REGEX_PREFIX: &str = "r:";

/// A regex translation rule loaded from an `r:<pattern>=<replacement>` line.
#[derive(Debug, Clone)]
pub struct RegexRule {
    original: String,
    pattern: Regex,
    replacement: String,
}

impl RegexRule {
    pub fn new(key: &str, value: &str) -> Result<Self, RuleError> {
        let body = key
            .strip_prefix(REGEX_PREFIX)
            .ok_or_else(|| RuleError::MissingPrefix(key.to_string()))?;
        let source = strip_quotes(body);
        let pattern = Regex::new(source).map_err(|e| RuleError::InvalidPattern {
            pattern: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            original: key.to_string(),
            pattern,
            replacement: strip_quotes(value).to_string(),
        })
    }

    /// The raw key this rule was built from, used for dedup.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Applies the rule. `Ok(None)` means no match.
    pub fn apply(&self, text: &str) -> Result<Option<String>, RuleError> {
        if !self.pattern.is_match(text) {
            return Ok(None);
        }
        for group in replacement_groups(&self.replacement) {
            let known = match group.parse::<usize>() {
                Ok(idx) => idx < self.pattern.captures_len(),
                Err(_) => self.pattern.capture_names().flatten().any(|n| n == group),
            };
            if !known {
                return Err(RuleError::UnknownGroup {
                    replacement: self.replacement.clone(),
                    group: group.to_string(),
                });
            }
        }
        Ok(Some(
            self.pattern
                .replace_all(text, self.replacement.as_str())
                .into_owned(),
        ))
    }
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Group references in a replacement string: `$1`, `$name`, `${name}`. `$$` is a literal dollar.
fn replacement_groups(replacement: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut rest = replacement;
    while let Some(idx) = rest.find('$') {
        let tail = &rest[idx + 1..];
        if let Some(after) = tail.strip_prefix('$') {
            rest = after;
        } else if let Some(braced) = tail.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => {
                    groups.push(&braced[..end]);
                    rest = &braced[end + 1..];
                }
                None => rest = braced,
            }
        } else {
            let end = tail
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(tail.len());
            if end > 0 {
                groups.push(&tail[..end]);
            }
            rest = &tail[end..];
        }
    }
    groups
}

#[derive(Debug, Clone)]
pub struct RuleMatch {
    pub value: String,
    pub pattern: String,
}

/// Regex rules of one scope, kept in registration order.
///
/// Matching walks the list from the newest rule to the oldest. A rule that fails while being
/// applied is removed in place with `Vec::remove`; only already-visited entries shift, so the
/// walk stays valid and the remaining rules keep their relative order.
#[derive(Debug, Clone, Default)]
pub struct RuleList {
    rules: Vec<RegexRule>,
    registered: HashSet<String>,
}

impl RuleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule unless one with the same raw key was registered before.
    pub fn register(&mut self, rule: RegexRule) -> bool {
        if !self.registered.insert(rule.original.clone()) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn clear(&mut self) {
        self.rules.clear();
        self.registered.clear();
    }

    /// First match walking newest to oldest; failing rules are dropped from the list.
    pub fn resolve(&mut self, text: &str) -> Option<RuleMatch> {
        let mut i = self.rules.len();
        while i > 0 {
            i -= 1;
            match self.rules[i].apply(text) {
                Ok(Some(value)) => {
                    return Some(RuleMatch {
                        value,
                        pattern: self.rules[i].original.clone(),
                    })
                }
                Ok(None) => {}
                Err(err) => {
                    let rule = self.rules.remove(i);
                    tracing::error!(
                        "Failed while applying regex '{}': {err}. Removing that regex from the cache.",
                        rule.original
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(key: &str, value: &str) -> RegexRule {
        RegexRule::new(key, value).expect("valid rule")
    }

    #[test]
    fn builds_and_applies_rule() {
        let r = rule(r"r:^Level (\d+)$", "Niveau $1");
        assert_eq!(r.apply("Level 3").unwrap().as_deref(), Some("Niveau 3"));
        assert_eq!(r.apply("Stage 3").unwrap(), None);
    }

    #[test]
    fn strips_surrounding_quotes() {
        let r = rule(r#"r:"^(?P<n>\w+)!$""#, r#""${n}?""#);
        assert_eq!(r.apply("Hi!").unwrap().as_deref(), Some("Hi?"));
    }

    #[test]
    fn rejects_bad_rules() {
        assert!(matches!(
            RegexRule::new("^x$", "y"),
            Err(RuleError::MissingPrefix(_))
        ));
        assert!(matches!(
            RegexRule::new("r:(unclosed", "y"),
            Err(RuleError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn unknown_group_fails_on_apply() {
        let r = rule(r"r:^(a)$", "$2 $$");
        assert!(matches!(r.apply("a"), Err(RuleError::UnknownGroup { .. })));
        assert_eq!(r.apply("b").unwrap(), None);
    }

    #[test]
    fn replacement_group_scan() {
        assert_eq!(replacement_groups("$1 ${name} $$ $x_y."), vec!["1", "name", "x_y"]);
        assert!(replacement_groups("no refs").is_empty());
    }

    #[test]
    fn newest_rule_wins() {
        let mut list = RuleList::new();
        assert!(list.register(rule("r:^(.+)$", "old $1")));
        assert!(list.register(rule("r:^(.+)!$", "new $1")));
        assert_eq!(list.resolve("go!").unwrap().value, "new go");
    }

    #[test]
    fn duplicate_keys_are_ignored() {
        let mut list = RuleList::new();
        assert!(list.register(rule("r:^a$", "1")));
        assert!(!list.register(rule("r:^a$", "2")));
        assert_eq!(list.len(), 1);
        assert_eq!(list.resolve("a").unwrap().value, "1");
    }

    #[test]
    fn failing_rule_is_removed_and_order_kept() {
        let mut list = RuleList::new();
        list.register(rule("r:^(x)$", "first $1"));
        list.register(rule("r:^(y)$", "second $1"));
        list.register(rule("r:^(x)$!", "unused"));
        list.register(rule("r:^(x|z)$", "broken $9"));

        assert_eq!(list.resolve("x").unwrap().value, "first x");
        assert_eq!(list.len(), 3);
        let keys: Vec<&str> = list.rules.iter().map(RegexRule::original).collect();
        assert_eq!(keys, vec!["r:^(x)$", "r:^(y)$", "r:^(x)$!"]);
        assert!(list.resolve("z").is_none());
    }
}
