//! DNS access for the identity checks.
//!
//! Checks talk to DNS only through the [`DnsResolver`] trait and run every
//! lookup inside a caller-supplied [`LookupContext`]. [`SystemResolver`] is the
//! production implementation over the trust-dns tokio resolver.

mod context;
mod error;
mod resolver;
mod types;

pub use context::LookupContext;
pub use error::DnsError;
pub use resolver::{DnsResolver, SystemResolver};
pub use types::MxRecord;
