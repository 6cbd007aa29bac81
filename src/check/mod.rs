//! Sender identity checks.
//!
//! Each check reads the [`ConnectionMeta`] of a session (and, for the MX
//! check, the MAIL FROM address) and returns a raw [`CheckResult`]:
//!
//! * [`require_matching_rdns`]: the PTR name of the client equals its EHLO name;
//! * [`require_mx_record`]: the MAIL FROM domain has MX records;
//! * [`require_matching_ehlo`]: the EHLO name resolves to the client address.
//!
//! Checks that do not apply to a connection (non-IP transport, rDNS disabled,
//! null reverse-path) pass with [`CheckResult::skipped`] set. Temporary DNS
//! failures always produce 4xx replies.
//!
//! [`CheckRegistry`] maps check names to checks and their default
//! [`FailAction`](crate::FailAction); [`CheckSet`] holds the checks enabled by
//! configuration with their parsed actions.

mod address;
mod ehlo;
mod error;
mod mx;
mod rdns;
mod registry;
mod types;

pub use address::AddressError;
pub use ehlo::require_matching_ehlo;
pub use error::ConfigError;
pub use mx::require_mx_record;
pub use rdns::require_matching_rdns;
pub use registry::{
    CheckKind, CheckOptions, CheckRegistry, CheckSet, CheckStage, ConfiguredCheck, MATCHING_EHLO,
    MATCHING_RDNS, MX_RECORD, RegistryEntry,
};
pub use types::{CheckResult, ConnectionMeta, PeerAddr, RdnsName};

#[cfg(test)]
mod tests;
