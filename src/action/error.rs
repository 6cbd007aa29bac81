use thiserror::Error;

use crate::reply::{EnhancedCode, EnhancedCodeError};

/// Errors raised while parsing fail-action and reject directives.
///
/// These only happen at configuration load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectiveError {
    #[error("expected at least 1 argument")]
    NoArguments,
    #[error("invalid action {0:?}, expected one of: reject, quarantine, ignore")]
    InvalidAction(String),
    #[error("action {action:?} takes no arguments, got {count}")]
    UnexpectedArguments { action: String, count: usize },
    #[error("invalid count of arguments: expected at most 3, got {0}")]
    ArgCount(usize),
    #[error("invalid error code {value:?}: should be an integer starting with either 4 or 5")]
    InvalidCode { value: String },
    #[error("invalid enhanced code: {source}")]
    Format {
        #[source]
        source: EnhancedCodeError,
    },
    #[error("enhanced code {code} should use either 4 or 5 as a first number")]
    InvalidEnhancedCode { code: EnhancedCode },
    #[error("message can't be empty")]
    EmptyMessage,
}

impl DirectiveError {
    pub(crate) fn invalid_code(value: impl Into<String>) -> Self {
        Self::InvalidCode {
            value: value.into(),
        }
    }

    pub(crate) fn format(source: EnhancedCodeError) -> Self {
        Self::Format { source }
    }
}
