use std::net::IpAddr;

use crate::dns::{DnsResolver, LookupContext};
use crate::reply::{EnhancedCode, SmtpError};

use super::mx::lookup_failure;
use super::{CheckResult, ConnectionMeta, MATCHING_EHLO};

/// Requires the EHLO hostname to resolve to the client address, or the EHLO
/// address literal to be the client address.
pub async fn require_matching_ehlo<R: DnsResolver>(
    meta: &ConnectionMeta,
    resolver: &R,
    ctx: &LookupContext,
) -> CheckResult {
    let Some(src_ip) = meta.src_addr.ip() else {
        tracing::info!(check = MATCHING_EHLO, skipped = true, "non-TCP/IP source, skipped");
        return CheckResult::skipped("non-TCP/IP source");
    };

    let ehlo = meta.src_hostname.as_str();

    if let Some(literal) = ehlo.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let Some(ehlo_ip) = parse_address_literal(literal) else {
            return mismatch("Malformed IP in EHLO");
        };
        if !same_ip(ehlo_ip, src_ip) {
            return mismatch("IP in EHLO is not the same as actual client IP");
        }
        return CheckResult::pass();
    }

    let addrs = match ctx.run(resolver.lookup_ip(ehlo)).await {
        Ok(addrs) => addrs,
        Err(err) => return CheckResult::fail(lookup_failure(MATCHING_EHLO, err)),
    };

    if addrs.iter().any(|ip| same_ip(*ip, src_ip)) {
        tracing::debug!(
            check = MATCHING_EHLO,
            ip = %src_ip,
            ehlo,
            "A/AAAA record found for client address"
        );
        return CheckResult::pass();
    }

    mismatch("No matching A/AAAA records found for EHLO hostname")
}

fn mismatch(message: &str) -> CheckResult {
    CheckResult::fail(
        SmtpError::new(550, EnhancedCode(5, 7, 0), message).with_check_name(MATCHING_EHLO),
    )
}

/// `192.0.2.1` or `IPv6:2001:db8::1` (RFC 5321 address literal body).
fn parse_address_literal(literal: &str) -> Option<IpAddr> {
    let v6 = literal
        .get(..5)
        .filter(|tag| tag.eq_ignore_ascii_case("IPv6:"))
        .map(|_| &literal[5..]);
    match v6 {
        Some(addr) => addr.parse::<std::net::Ipv6Addr>().ok().map(IpAddr::V6),
        None => literal.parse().ok(),
    }
}

/// IPv4 and IPv4-mapped IPv6 forms of the same address are equal.
fn same_ip(a: IpAddr, b: IpAddr) -> bool {
    a.to_canonical() == b.to_canonical()
}
