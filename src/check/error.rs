use thiserror::Error;

use crate::action::DirectiveError;

/// Errors raised while assembling the configured checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown check {0:?}")]
    UnknownCheck(String),
    #[error("invalid fail action for {check}: {source}")]
    Directive {
        check: String,
        #[source]
        source: DirectiveError,
    },
}

impl ConfigError {
    pub(crate) fn directive(check: impl Into<String>, source: DirectiveError) -> Self {
        Self::Directive {
            check: check.into(),
            source,
        }
    }
}
