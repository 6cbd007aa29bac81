use crate::dns::{DnsError, DnsResolver, LookupContext};
use crate::reply::{EnhancedCode, SmtpError};

use super::address::{AddressError, ascii_domain, split_address};
use super::{CheckResult, ConnectionMeta, MX_RECORD};

/// Requires the MAIL FROM domain to publish at least one MX record.
///
/// The null reverse-path (bounces) always passes.
pub async fn require_mx_record<R: DnsResolver>(
    meta: &ConnectionMeta,
    mail_from: &str,
    resolver: &R,
    ctx: &LookupContext,
) -> CheckResult {
    if mail_from.is_empty() {
        tracing::info!(check = MX_RECORD, skipped = true, "null reverse-path, skipping");
        return CheckResult::skipped("null reverse-path");
    }

    let domain = match split_address(mail_from) {
        Ok((_, domain)) => domain.trim(),
        Err(err) => return malformed_sender(err),
    };
    if domain.is_empty() {
        return CheckResult::fail(
            SmtpError::new(501, EnhancedCode(5, 1, 8), "No domain part").with_check_name(MX_RECORD),
        );
    }

    if meta.src_addr.ip().is_none() {
        tracing::info!(check = MX_RECORD, skipped = true, "non-TCP/IP source, skipping");
        return CheckResult::skipped("non-TCP/IP source");
    }

    let domain = match ascii_domain(mail_from, domain) {
        Ok(domain) => domain,
        Err(err) => return malformed_sender(err),
    };

    match ctx.run(resolver.lookup_mx(&domain)).await {
        Ok(records) if records.is_empty() => CheckResult::fail(
            SmtpError::new(
                501,
                EnhancedCode(5, 7, 27),
                "Domain in MAIL FROM has no MX records",
            )
            .with_check_name(MX_RECORD),
        ),
        Ok(records) => {
            tracing::debug!(
                check = MX_RECORD,
                domain = %domain,
                count = records.len(),
                "MX records found"
            );
            CheckResult::pass()
        }
        Err(err) => CheckResult::fail(lookup_failure(MX_RECORD, err)),
    }
}

fn malformed_sender(err: AddressError) -> CheckResult {
    CheckResult::fail(
        SmtpError::new(501, EnhancedCode(5, 1, 7), "Malformed sender address")
            .with_check_name(MX_RECORD)
            .with_field("check", MX_RECORD)
            .with_cause(err),
    )
}

/// Reply for a failed lookup: 420 4.7.27 when the resolver calls the failure
/// temporary, 501 5.7.27 otherwise.
pub(crate) fn lookup_failure(check: &'static str, err: DnsError) -> SmtpError {
    let (code, enhanced_code) = if err.is_temporary() {
        (420, EnhancedCode(4, 7, 27))
    } else {
        (501, EnhancedCode(5, 7, 27))
    };

    // Resolver errors carry no context of their own; keep the raw text for logs.
    SmtpError::new(code, enhanced_code, "DNS lookup failure during policy check")
        .with_check_name(check)
        .with_field("reason", err.to_string())
        .with_cause(err)
}
