use thiserror::Error;

use crate::{CompileError, RuleError};

/// Unified error type covering configuration loading, rule management,
/// pattern compilation and I/O.
///
/// Returned by [`Configs::from_json()`](crate::Configs::from_json) and
/// [`Configs::from_file()`](crate::Configs::from_file).
#[derive(Debug, Error)]
pub enum SendcheckError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
