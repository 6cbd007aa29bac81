use thiserror::Error;

/// DNS lookup failure, classified as temporary or permanent.
///
/// Resolver errors carry little context of their own, so the queried name is
/// kept alongside.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("{name}: no such domain")]
    NotFound { name: String },
    #[error("{name}: server failure ({rcode})")]
    ServerFailure { name: String, rcode: String },
    #[error("{name}: query refused ({rcode})")]
    Refused { name: String, rcode: String },
    #[error("{name}: request timed out")]
    Timeout { name: String },
    #[error("{name}: transport failure: {message}")]
    Transport { name: String, message: String },
    #[error("{name}: malformed response: {message}")]
    Protocol { name: String, message: String },
    #[error("lookup cancelled")]
    Cancelled,
    #[error("lookup deadline exceeded")]
    DeadlineExceeded,
}

impl DnsError {
    /// Temporary failures say nothing about whether the record exists and
    /// must never turn into a permanent rejection.
    pub fn is_temporary(&self) -> bool {
        matches!(
            self,
            Self::ServerFailure { .. }
                | Self::Timeout { .. }
                | Self::Transport { .. }
                | Self::Cancelled
                | Self::DeadlineExceeded
        )
    }

    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub(crate) fn transport(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            name: name.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn protocol(name: impl Into<String>, message: impl ToString) -> Self {
        Self::Protocol {
            name: name.into(),
            message: message.to_string(),
        }
    }
}
