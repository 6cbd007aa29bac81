use std::net::{IpAddr, SocketAddr};

use crate::dns::{DnsError, DnsResolver, LookupContext};
use crate::reply::SmtpError;

/// Verdict of one check invocation. No `reason` means the check passed.
///
/// `quarantine` and `reject` are set by [`FailAction::apply`](crate::FailAction::apply),
/// not by the checks themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckResult {
    pub reason: Option<SmtpError>,
    pub quarantine: bool,
    pub reject: bool,
    /// Set when the check did not apply to this connection and passed
    /// without looking at anything.
    pub skipped: Option<&'static str>,
}

impl CheckResult {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn skipped(note: &'static str) -> Self {
        Self {
            skipped: Some(note),
            ..Self::default()
        }
    }

    pub fn fail(reason: SmtpError) -> Self {
        Self {
            reason: Some(reason),
            ..Self::default()
        }
    }

    pub fn is_pass(&self) -> bool {
        self.reason.is_none()
    }

    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

/// Where the client connected from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAddr {
    Tcp(SocketAddr),
    /// Non-IP transport (unix socket, pipe, ...), described for logs only.
    Local(String),
}

impl PeerAddr {
    pub fn ip(&self) -> Option<IpAddr> {
        match self {
            Self::Tcp(addr) => Some(addr.ip()),
            Self::Local(_) => None,
        }
    }
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        Self::Tcp(addr)
    }
}

/// Outcome of the connection's reverse DNS lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RdnsName {
    /// rDNS lookups are disabled or the transport has no IP.
    #[default]
    NotAttempted,
    Resolved(String),
    Failed(DnsError),
}

impl RdnsName {
    /// Looks up the PTR name of `ip`, keeping the first answer.
    pub async fn lookup<R: DnsResolver>(resolver: &R, ctx: &LookupContext, ip: IpAddr) -> Self {
        match ctx.run(resolver.lookup_ptr(ip)).await {
            Ok(names) => match names.into_iter().next() {
                Some(name) => Self::Resolved(name),
                None => Self::Failed(DnsError::not_found(ip.to_string())),
            },
            Err(err) => Self::Failed(err),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Resolved(name) => Some(name),
            _ => None,
        }
    }
}

/// Connection facts the checks read. Built by the SMTP session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMeta {
    pub src_addr: PeerAddr,
    /// Hostname claimed in EHLO/HELO.
    pub src_hostname: String,
    pub src_rdns: RdnsName,
}

impl ConnectionMeta {
    pub fn new(src_addr: impl Into<PeerAddr>, src_hostname: impl Into<String>) -> Self {
        Self {
            src_addr: src_addr.into(),
            src_hostname: src_hostname.into(),
            src_rdns: RdnsName::NotAttempted,
        }
    }

    pub fn with_rdns(mut self, rdns: RdnsName) -> Self {
        self.src_rdns = rdns;
        self
    }
}
