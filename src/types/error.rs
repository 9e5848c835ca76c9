use thiserror::Error;

use super::rule::RuleKey;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("unknown rule '{id}'")]
    UnknownRule { id: String },

    #[error("duplicate rule id '{id}'")]
    DuplicateRule { id: String },

    #[error("'{key}' of rule '{id}' is locked by policy")]
    LockedKey { id: String, key: RuleKey },

    #[error("{operation} rules is not allowed by policy")]
    NotAllowed { operation: &'static str },
}

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid patterns in rule '{rule}': {source}")]
    Pattern {
        rule: String,
        #[source]
        source: regex::Error,
    },
}
