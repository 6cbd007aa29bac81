#![forbid(unsafe_code)]
//! smtp_identity: sender identity checks for an SMTP acceptance pipeline
//!
//! Three checks compare what a client claims with what DNS says: its PTR
//! name, its EHLO hostname and the MX records of its MAIL FROM domain. Each
//! check returns a [`CheckResult`]; a configured [`FailAction`] then decides
//! whether a failure is only logged, quarantined or rejected, and may replace
//! the SMTP reply sent to the client.

pub mod action;
pub mod check;
pub mod dns;
pub mod reply;

pub use action::{DirectiveError, FailAction, parse_action_directive, parse_reject_directive};
pub use check::{
    CheckKind, CheckOptions, CheckRegistry, CheckResult, CheckSet, CheckStage, ConfigError,
    ConnectionMeta, PeerAddr, RdnsName, require_matching_ehlo, require_matching_rdns,
    require_mx_record,
};
pub use dns::{DnsError, DnsResolver, LookupContext, MxRecord, SystemResolver};
pub use reply::{EnhancedCode, EnhancedCodeError, SmtpError, parse_enhanced_code};
