//! Fail actions: what the message pipeline should do when a check fails.
//!
//! A [`FailAction`] is parsed once from the `reject|quarantine|ignore`
//! directive at configuration load time and then shared read-only by every
//! invocation of the check it belongs to. [`FailAction::apply`] merges it into
//! the raw [`CheckResult`] produced by the check.

mod directive;
mod error;

pub use directive::{parse_action_directive, parse_reject_directive};
pub use error::DirectiveError;

use crate::check::CheckResult;
use crate::reply::SmtpError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FailAction {
    pub quarantine: bool,
    pub reject: bool,

    /// Replaces the peer-visible reply while keeping the original reason as
    /// its cause.
    pub reason_override: Option<SmtpError>,
}

impl FailAction {
    /// Log only.
    pub fn ignore() -> Self {
        Self::default()
    }

    pub fn quarantine() -> Self {
        Self {
            quarantine: true,
            ..Self::default()
        }
    }

    pub fn reject() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn with_reason_override(mut self, reason: SmtpError) -> Self {
        self.reason_override = Some(reason);
        self
    }

    /// Merges the check result with this action.
    ///
    /// A passing result is returned untouched. Flags are only ever raised,
    /// never cleared. Call once per raw result: applying an override twice
    /// wraps twice.
    pub fn apply(&self, mut result: CheckResult) -> CheckResult {
        let Some(reason) = result.reason.take() else {
            return result;
        };

        result.reason = Some(match &self.reason_override {
            Some(over) => over.wrap(reason),
            None => reason,
        });
        result.quarantine = self.quarantine || result.quarantine;
        result.reject = self.reject || result.reject;
        result
    }
}

impl std::str::FromStr for FailAction {
    type Err = DirectiveError;

    /// Whitespace-separated form, e.g. `"reject 550 5.7.1"`. Messages with
    /// spaces need the slice API.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let args: Vec<&str> = s.split_whitespace().collect();
        parse_action_directive(&args)
    }
}
