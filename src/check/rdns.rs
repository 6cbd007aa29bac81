use crate::reply::{EnhancedCode, SmtpError};

use super::{CheckResult, ConnectionMeta, MATCHING_RDNS, RdnsName};

/// Requires the PTR name of the client address to equal the EHLO hostname.
pub fn require_matching_rdns(meta: &ConnectionMeta) -> CheckResult {
    let rdns_name = match &meta.src_rdns {
        RdnsName::NotAttempted => {
            tracing::info!(
                check = MATCHING_RDNS,
                skipped = true,
                "rDNS lookup is disabled, skipping"
            );
            return CheckResult::skipped("rDNS lookup is disabled");
        }
        RdnsName::Resolved(name) => name.as_str(),
        RdnsName::Failed(err) => {
            // Missing PTR and resolver failure are indistinguishable here.
            let reason = SmtpError::new(
                450,
                EnhancedCode(4, 7, 25),
                "DNS lookup failure during policy check",
            )
            .with_check_name(MATCHING_RDNS)
            .with_field("reason", err.to_string())
            .with_cause(err.clone());
            return CheckResult::fail(reason);
        }
    };

    let src_domain = meta.src_hostname.strip_suffix('.').unwrap_or(&meta.src_hostname);
    let rdns_name = rdns_name.strip_suffix('.').unwrap_or(rdns_name);

    if rdns_name.eq_ignore_ascii_case(src_domain) {
        tracing::debug!(
            check = MATCHING_RDNS,
            ptr = rdns_name,
            "PTR record matches source domain, OK"
        );
        return CheckResult::pass();
    }

    CheckResult::fail(
        SmtpError::new(
            550,
            EnhancedCode(5, 7, 25),
            "rDNS name does not match source hostname",
        )
        .with_check_name(MATCHING_RDNS),
    )
}
