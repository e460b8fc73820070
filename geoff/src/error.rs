//! Error and result types for the Geoff engine.

use geoff_api::BackendError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The tokenizer or subgraph builder could not make sense of the source
    /// text. Raised before any mutation; the batch is rejected wholesale.
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    /// A semantic violation discovered while interpreting one rule.
    /// Carries the 1-based rule number for diagnostics.
    #[error("rule {rule}: {message}")]
    Rule { rule: usize, message: String },

    /// A property or binding value of an unusable shape.
    #[error("illegal value: {0}")]
    Value(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl Error {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Error::Syntax {
            position,
            message: message.into(),
        }
    }

    pub(crate) fn rule(rule: usize, message: impl Into<String>) -> Self {
        Error::Rule {
            rule,
            message: message.into(),
        }
    }
}
