use thiserror::Error;

/// Failures building or applying a regex translation rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("regex rule key must start with 'r:': {0}")]
    MissingPrefix(String),

    #[error("invalid regex pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("replacement '{replacement}' references unknown group '{group}'")]
    UnknownGroup { replacement: String, group: String },
}
