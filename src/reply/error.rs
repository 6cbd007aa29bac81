use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use super::EnhancedCode;

type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// Protocol-level rejection or deferral reason.
///
/// Only `code`, `enhanced_code` and `message` are ever shown to the remote
/// peer. `check_name`, `reason`, the wrapped cause and the diagnostic fields
/// are for operators and logs.
///
/// Values are immutable: the `with_*` methods consume `self` and return a new
/// error, and [`SmtpError::wrap`] builds a new error around an existing one.
#[derive(Clone)]
pub struct SmtpError {
    code: u16,
    enhanced_code: EnhancedCode,
    message: String,
    check_name: Option<String>,
    reason: Option<String>,
    cause: Option<Cause>,
    misc: BTreeMap<String, String>,
}

impl SmtpError {
    pub fn new(code: u16, enhanced_code: EnhancedCode, message: impl Into<String>) -> Self {
        Self {
            code,
            enhanced_code,
            message: message.into(),
            check_name: None,
            reason: None,
            cause: None,
            misc: BTreeMap::new(),
        }
    }

    pub fn with_check_name(mut self, name: impl Into<String>) -> Self {
        self.check_name = Some(name.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.misc.insert(key.into(), value.into());
        self
    }

    /// Builds a new error that takes its peer-visible fields from `self` and
    /// keeps `inner` as the cause. The check name of `inner` is carried over
    /// when `self` has none.
    pub fn wrap(&self, inner: SmtpError) -> Self {
        Self {
            code: self.code,
            enhanced_code: self.enhanced_code,
            message: self.message.clone(),
            check_name: self.check_name.clone().or_else(|| inner.check_name.clone()),
            reason: self.reason.clone(),
            cause: Some(Arc::new(inner)),
            misc: BTreeMap::new(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn enhanced_code(&self) -> EnhancedCode {
        self.enhanced_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn check_name(&self) -> Option<&str> {
        self.check_name.as_deref()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn misc(&self) -> &BTreeMap<String, String> {
        &self.misc
    }

    /// 4xx reply: the peer is expected to retry later.
    pub fn is_temporary(&self) -> bool {
        self.code / 100 == 4
    }

    /// Innermost `SmtpError` of the cause chain (`self` when nothing is wrapped).
    pub fn root(&self) -> &SmtpError {
        let mut current = self;
        while let Some(next) = current
            .cause
            .as_deref()
            .and_then(|cause| cause.downcast_ref::<SmtpError>())
        {
            current = next;
        }
        current
    }

    /// Flattened operator-facing fields, outermost error last so that it
    /// wins on key collisions. The one exception is `reason`: an outer reason
    /// that would shadow an inner one is stored as `override_reason`.
    pub fn fields(&self) -> BTreeMap<String, String> {
        let mut out = match self
            .cause
            .as_deref()
            .and_then(|cause| cause.downcast_ref::<SmtpError>())
        {
            Some(inner) => inner.fields(),
            None => BTreeMap::new(),
        };
        if let Some(cause) = self.cause.as_deref() {
            if cause.downcast_ref::<SmtpError>().is_none() {
                out.insert("cause".to_string(), cause.to_string());
            }
        }
        out.extend(self.misc.iter().map(|(k, v)| (k.clone(), v.clone())));
        out.insert("smtp_code".to_string(), self.code.to_string());
        out.insert("smtp_enchcode".to_string(), self.enhanced_code.to_string());
        out.insert("smtp_msg".to_string(), self.message.clone());
        if let Some(check) = &self.check_name {
            out.insert("check".to_string(), check.clone());
        }
        if let Some(reason) = &self.reason {
            // An inner check's reason holds the diagnostic text; keep it.
            let key = if out.contains_key("reason") {
                "override_reason"
            } else {
                "reason"
            };
            out.insert(key.to_string(), reason.clone());
        }
        out
    }
}

impl fmt::Display for SmtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.code, self.enhanced_code, self.message)
    }
}

impl fmt::Debug for SmtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpError")
            .field("code", &self.code)
            .field("enhanced_code", &self.enhanced_code)
            .field("message", &self.message)
            .field("check_name", &self.check_name)
            .field("reason", &self.reason)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .field("misc", &self.misc)
            .finish()
    }
}

impl PartialEq for SmtpError {
    /// Compares the peer-visible reply and the operator tags. Causes are
    /// compared by their rendered text.
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.enhanced_code == other.enhanced_code
            && self.message == other.message
            && self.check_name == other.check_name
            && self.reason == other.reason
            && self.misc == other.misc
            && self.cause.as_ref().map(|c| c.to_string())
                == other.cause.as_ref().map(|c| c.to_string())
    }
}

impl StdError for SmtpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}
