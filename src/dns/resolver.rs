use std::future::Future;
use std::net::IpAddr;

use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{ResolverConfig, ResolverOpts},
    error::{ResolveError, ResolveErrorKind},
    proto::{error::ProtoErrorKind, op::ResponseCode},
};

use super::{DnsError, MxRecord};

/// Lookups the identity checks need.
///
/// Implementations report a name that exists but has no records of the
/// requested type as `Ok` with an empty list, and classify every other
/// failure through [`DnsError`].
pub trait DnsResolver: Send + Sync {
    fn lookup_mx(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<Vec<MxRecord>, DnsError>> + Send;

    fn lookup_ip(&self, host: &str) -> impl Future<Output = Result<Vec<IpAddr>, DnsError>> + Send;

    fn lookup_ptr(&self, ip: IpAddr) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
}

/// [`DnsResolver`] backed by the trust-dns tokio resolver.
#[derive(Clone)]
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    /// Uses `/etc/resolv.conf` (or the platform equivalent).
    pub fn from_system_conf() -> Result<Self, ResolveError> {
        Ok(Self {
            inner: TokioAsyncResolver::tokio_from_system_conf()?,
        })
    }

    pub fn with_config(config: ResolverConfig, options: ResolverOpts) -> Self {
        Self {
            inner: TokioAsyncResolver::tokio(config, options),
        }
    }
}

impl DnsResolver for SystemResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError> {
        let records = match self.inner.mx_lookup(domain).await {
            Ok(lookup) => lookup
                .iter()
                .map(|mx| {
                    MxRecord::new(mx.preference(), normalize_exchange(mx.exchange().to_utf8()))
                })
                .collect(),
            Err(err) => empty_or_error(domain, err)?,
        };
        Ok(sort_records(records))
    }

    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        match self.inner.lookup_ip(host).await {
            Ok(lookup) => Ok(lookup.iter().collect()),
            Err(err) => empty_or_error(host, err),
        }
    }

    async fn lookup_ptr(&self, ip: IpAddr) -> Result<Vec<String>, DnsError> {
        match self.inner.reverse_lookup(ip).await {
            Ok(lookup) => Ok(lookup.iter().map(|name| name.to_string()).collect()),
            Err(err) => empty_or_error(&ip.to_string(), err),
        }
    }
}

pub(crate) fn sort_records(mut records: Vec<MxRecord>) -> Vec<MxRecord> {
    records.sort();
    records.dedup();
    records
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

/// NODATA answers become an empty list, everything else a [`DnsError`].
fn empty_or_error<T>(name: &str, err: ResolveError) -> Result<Vec<T>, DnsError> {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound {
            response_code: ResponseCode::NoError,
            ..
        } => Ok(Vec::new()),
        _ => Err(classify(name, &err)),
    }
}

pub(crate) fn classify(name: &str, err: &ResolveError) -> DnsError {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match response_code {
            ResponseCode::NXDomain => DnsError::not_found(name),
            ResponseCode::ServFail => DnsError::ServerFailure {
                name: name.to_string(),
                rcode: response_code.to_string(),
            },
            // No answer and no error code: treat like NXDOMAIN.
            ResponseCode::NoError => DnsError::not_found(name),
            other => DnsError::Refused {
                name: name.to_string(),
                rcode: other.to_string(),
            },
        },
        ResolveErrorKind::Timeout => DnsError::Timeout {
            name: name.to_string(),
        },
        ResolveErrorKind::Proto(proto) => match proto.kind() {
            ProtoErrorKind::Timeout => DnsError::Timeout {
                name: name.to_string(),
            },
            // Socket and connection pool failures surface through the proto layer.
            ProtoErrorKind::Io(_) | ProtoErrorKind::Busy => DnsError::transport(name, proto),
            _ => DnsError::protocol(name, proto),
        },
        _ => DnsError::transport(name, err),
    }
}
