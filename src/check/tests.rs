use std::collections::HashMap;
use std::error::Error as _;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{
    AddressError, CheckKind, CheckOptions, CheckRegistry, CheckResult, CheckSet, CheckStage,
    ConfigError, ConnectionMeta, MATCHING_EHLO, MATCHING_RDNS, MX_RECORD, PeerAddr, RdnsName,
    require_matching_ehlo, require_matching_rdns, require_mx_record,
};
use crate::action::{DirectiveError, FailAction};
use crate::dns::{DnsError, DnsResolver, LookupContext, MxRecord};
use crate::reply::EnhancedCode;

#[derive(Default)]
struct StubResolver {
    mx: HashMap<String, Result<Vec<MxRecord>, DnsError>>,
    ips: HashMap<String, Result<Vec<IpAddr>, DnsError>>,
    ptr: HashMap<IpAddr, Result<Vec<String>, DnsError>>,
    hang: bool,
    calls: AtomicUsize,
}

impl StubResolver {
    fn new() -> Self {
        Self::default()
    }

    fn with_mx(mut self, domain: &str, result: Result<Vec<MxRecord>, DnsError>) -> Self {
        self.mx.insert(domain.to_string(), result);
        self
    }

    fn with_ips(mut self, host: &str, result: Result<Vec<IpAddr>, DnsError>) -> Self {
        self.ips.insert(host.to_string(), result);
        self
    }

    fn with_ptr(mut self, ip: &str, result: Result<Vec<String>, DnsError>) -> Self {
        self.ptr.insert(ip.parse().expect("test ip"), result);
        self
    }

    fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
    }
}

impl DnsResolver for StubResolver {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, DnsError> {
        self.enter().await;
        self.mx
            .get(domain)
            .cloned()
            .unwrap_or_else(|| Err(DnsError::not_found(domain)))
    }

    async fn lookup_ip(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        self.enter().await;
        self.ips
            .get(host)
            .cloned()
            .unwrap_or_else(|| Err(DnsError::not_found(host)))
    }

    async fn lookup_ptr(&self, ip: IpAddr) -> Result<Vec<String>, DnsError> {
        self.enter().await;
        self.ptr
            .get(&ip)
            .cloned()
            .unwrap_or_else(|| Err(DnsError::not_found(ip.to_string())))
    }
}

fn tcp(ip: &str) -> PeerAddr {
    let ip: IpAddr = ip.parse().expect("test ip");
    PeerAddr::Tcp(SocketAddr::new(ip, 52_000))
}

fn meta(ip: &str, ehlo: &str) -> ConnectionMeta {
    ConnectionMeta::new(tcp(ip), ehlo)
}

fn local(ehlo: &str) -> ConnectionMeta {
    ConnectionMeta::new(PeerAddr::Local("/run/smtp.sock".to_string()), ehlo)
}

fn servfail(name: &str) -> DnsError {
    DnsError::ServerFailure {
        name: name.to_string(),
        rcode: "Server Failure".to_string(),
    }
}

fn reply(result: &CheckResult) -> (u16, EnhancedCode) {
    let reason = result.reason.as_ref().expect("check should fail");
    (reason.code(), reason.enhanced_code())
}

fn all_dns_errors() -> Vec<DnsError> {
    vec![
        DnsError::not_found("example.com"),
        servfail("example.com"),
        DnsError::Refused {
            name: "example.com".into(),
            rcode: "Refused".into(),
        },
        DnsError::Timeout {
            name: "example.com".into(),
        },
        DnsError::transport("example.com", "connection reset"),
        DnsError::protocol("example.com", "truncated"),
        DnsError::Cancelled,
        DnsError::DeadlineExceeded,
    ]
}

// --- rDNS ---------------------------------------------------------------

#[test]
fn rdns_skipped_when_not_attempted() {
    let result = require_matching_rdns(&meta("192.0.2.1", "mail.example.com"));
    assert!(result.is_pass());
    assert!(result.is_skipped());
}

#[test]
fn rdns_trailing_dot_is_ignored() {
    let m = meta("192.0.2.1", "mail.example.com")
        .with_rdns(RdnsName::Resolved("mail.example.com.".into()));
    let result = require_matching_rdns(&m);
    assert!(result.is_pass());
    assert!(!result.is_skipped());
}

#[test]
fn rdns_comparison_ignores_case() {
    let m = meta("192.0.2.1", "Mail.Example.COM.")
        .with_rdns(RdnsName::Resolved("mail.example.com".into()));
    assert!(require_matching_rdns(&m).is_pass());
}

#[test]
fn rdns_mismatch_is_permanent() {
    let m = meta("192.0.2.1", "mail.example.com")
        .with_rdns(RdnsName::Resolved("mail.evil.com".into()));
    let result = require_matching_rdns(&m);
    assert_eq!(reply(&result), (550, EnhancedCode(5, 7, 25)));
    let reason = result.reason.as_ref().expect("failure");
    assert_eq!(reason.check_name(), Some(MATCHING_RDNS));
    assert!(!result.quarantine && !result.reject);
}

#[test]
fn rdns_lookup_failure_defers_even_when_permanent() {
    let m = meta("192.0.2.1", "mail.example.com")
        .with_rdns(RdnsName::Failed(DnsError::not_found("1.2.0.192.in-addr.arpa")));
    let result = require_matching_rdns(&m);
    assert_eq!(reply(&result), (450, EnhancedCode(4, 7, 25)));

    let reason = result.reason.expect("failure");
    assert!(reason.is_temporary());
    let cause = reason.source().expect("dns error kept as cause");
    assert!(cause.downcast_ref::<DnsError>().is_some());
}

#[tokio::test]
async fn rdns_lookup_keeps_first_name() {
    let stub = StubResolver::new().with_ptr(
        "192.0.2.1",
        Ok(vec!["mail.example.com.".into(), "alias.example.com.".into()]),
    );
    let ip = "192.0.2.1".parse().unwrap();
    let name = RdnsName::lookup(&stub, &LookupContext::new(), ip).await;
    assert_eq!(name, RdnsName::Resolved("mail.example.com.".into()));
    assert_eq!(name.name(), Some("mail.example.com."));
}

#[tokio::test]
async fn rdns_lookup_without_answer_fails() {
    let stub = StubResolver::new().with_ptr("192.0.2.1", Ok(Vec::new()));
    let ip = "192.0.2.1".parse().unwrap();
    let name = RdnsName::lookup(&stub, &LookupContext::new(), ip).await;
    assert!(matches!(name, RdnsName::Failed(DnsError::NotFound { .. })));
}

#[tokio::test]
async fn rdns_lookup_error_is_kept() {
    let stub = StubResolver::new().with_ptr("192.0.2.1", Err(servfail("192.0.2.1")));
    let ip = "192.0.2.1".parse().unwrap();
    let name = RdnsName::lookup(&stub, &LookupContext::new(), ip).await;
    assert_eq!(name, RdnsName::Failed(servfail("192.0.2.1")));
}

// --- MX -----------------------------------------------------------------

#[tokio::test]
async fn mx_null_reverse_path_passes_without_lookup() {
    let stub = StubResolver::new();
    let result = require_mx_record(&meta("192.0.2.1", "mx"), "", &stub, &LookupContext::new()).await;
    assert!(result.is_pass());
    assert!(result.is_skipped());
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn mx_malformed_address_wraps_parse_error() {
    let stub = StubResolver::new();
    let result = require_mx_record(
        &meta("192.0.2.1", "mx"),
        "no-at-sign",
        &stub,
        &LookupContext::new(),
    )
    .await;
    assert_eq!(reply(&result), (501, EnhancedCode(5, 1, 7)));

    let reason = result.reason.expect("failure");
    assert_eq!(reason.misc().get("check").map(String::as_str), Some(MX_RECORD));
    let cause = reason.source().expect("parse error kept");
    assert!(matches!(
        cause.downcast_ref::<AddressError>(),
        Some(AddressError::MissingAt(_))
    ));
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn mx_empty_domain_is_permanent() {
    let stub = StubResolver::new();
    for addr in ["user@", "postmaster", "user@ ", "user@\t"] {
        let result =
            require_mx_record(&meta("192.0.2.1", "mx"), addr, &stub, &LookupContext::new()).await;
        assert_eq!(reply(&result), (501, EnhancedCode(5, 1, 8)), "{addr:?}");
        assert_eq!(
            result.reason.as_ref().map(|r| r.message()),
            Some("No domain part")
        );
    }
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn mx_skipped_for_non_ip_transport() {
    let stub = StubResolver::new();
    let result =
        require_mx_record(&local("mx"), "user@example.com", &stub, &LookupContext::new()).await;
    assert!(result.is_pass());
    assert!(result.is_skipped());
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn mx_zero_records_is_permanent() {
    let stub = StubResolver::new().with_mx("example.com", Ok(Vec::new()));
    let result = require_mx_record(
        &meta("192.0.2.1", "mx"),
        "user@example.com",
        &stub,
        &LookupContext::new(),
    )
    .await;
    assert_eq!(reply(&result), (501, EnhancedCode(5, 7, 27)));
    assert_eq!(
        result.reason.as_ref().map(|r| r.message()),
        Some("Domain in MAIL FROM has no MX records")
    );
}

#[tokio::test]
async fn mx_record_present_passes() {
    let stub = StubResolver::new().with_mx(
        "example.com",
        Ok(vec![MxRecord::new(10, "mx1.example.com")]),
    );
    let result = require_mx_record(
        &meta("192.0.2.1", "mx"),
        "user@example.com",
        &stub,
        &LookupContext::new(),
    )
    .await;
    assert!(result.is_pass());
    assert!(!result.is_skipped());
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn mx_lookup_uses_ascii_domain() {
    let stub = StubResolver::new().with_mx(
        "xn--exmple-cua.com",
        Ok(vec![MxRecord::new(10, "mx.xn--exmple-cua.com")]),
    );
    let result = require_mx_record(
        &meta("192.0.2.1", "mx"),
        "user@exämple.com",
        &stub,
        &LookupContext::new(),
    )
    .await;
    assert!(result.is_pass(), "{:?}", result.reason);
}

#[tokio::test]
async fn mx_lookup_error_follows_resolver_classification() {
    for err in all_dns_errors() {
        let temporary = err.is_temporary();
        let raw = err.to_string();
        let stub = StubResolver::new().with_mx("example.com", Err(err));
        let result = require_mx_record(
            &meta("192.0.2.1", "mx"),
            "user@example.com",
            &stub,
            &LookupContext::new(),
        )
        .await;

        let expected = if temporary {
            (420, EnhancedCode(4, 7, 27))
        } else {
            (501, EnhancedCode(5, 7, 27))
        };
        assert_eq!(reply(&result), expected, "{raw}");

        let reason = result.reason.expect("failure");
        assert_eq!(reason.misc().get("reason"), Some(&raw));
        assert_eq!(reason.check_name(), Some(MX_RECORD));
    }
}

#[tokio::test]
async fn mx_cancelled_lookup_defers() {
    let stub = StubResolver::hanging();
    let ctx = LookupContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let result =
        require_mx_record(&meta("192.0.2.1", "mx"), "user@example.com", &stub, &ctx).await;
    assert_eq!(reply(&result), (420, EnhancedCode(4, 7, 27)));
}

#[tokio::test(start_paused = true)]
async fn mx_deadline_defers() {
    let stub = StubResolver::hanging();
    let ctx = LookupContext::new().with_timeout(Duration::from_secs(3));
    let result =
        require_mx_record(&meta("192.0.2.1", "mx"), "user@example.com", &stub, &ctx).await;
    assert_eq!(reply(&result), (420, EnhancedCode(4, 7, 27)));
}

// --- EHLO ---------------------------------------------------------------

#[tokio::test]
async fn ehlo_literal_matching_client_passes() {
    let stub = StubResolver::new();
    let result =
        require_matching_ehlo(&meta("192.0.2.1", "[192.0.2.1]"), &stub, &LookupContext::new())
            .await;
    assert!(result.is_pass());
    assert_eq!(stub.calls(), 0);
}

#[tokio::test]
async fn ehlo_literal_other_ip_is_permanent() {
    let stub = StubResolver::new();
    let result =
        require_matching_ehlo(&meta("192.0.2.2", "[192.0.2.1]"), &stub, &LookupContext::new())
            .await;
    assert_eq!(reply(&result), (550, EnhancedCode(5, 7, 0)));
    assert_eq!(
        result.reason.as_ref().map(|r| r.message()),
        Some("IP in EHLO is not the same as actual client IP")
    );
}

#[tokio::test]
async fn ehlo_malformed_literal_is_permanent() {
    let stub = StubResolver::new();
    let result =
        require_matching_ehlo(&meta("192.0.2.1", "[192.0.2]"), &stub, &LookupContext::new())
            .await;
    assert_eq!(reply(&result), (550, EnhancedCode(5, 7, 0)));
    assert_eq!(
        result.reason.as_ref().map(|r| r.message()),
        Some("Malformed IP in EHLO")
    );
}

#[tokio::test]
async fn ehlo_ipv6_literal_passes() {
    let stub = StubResolver::new();
    let result = require_matching_ehlo(
        &meta("2001:db8::25", "[IPv6:2001:db8::25]"),
        &stub,
        &LookupContext::new(),
    )
    .await;
    assert!(result.is_pass());
}

#[tokio::test]
async fn ehlo_skipped_for_non_ip_transport() {
    let stub = StubResolver::new();
    let result = require_matching_ehlo(&local("[192.0.2.1]"), &stub, &LookupContext::new()).await;
    assert!(result.is_pass());
    assert!(result.is_skipped());
}

#[tokio::test]
async fn ehlo_forward_lookup_match_passes() {
    let stub = StubResolver::new().with_ips(
        "mail.example.com",
        Ok(vec!["198.51.100.7".parse().unwrap(), "192.0.2.1".parse().unwrap()]),
    );
    let result = require_matching_ehlo(
        &meta("192.0.2.1", "mail.example.com"),
        &stub,
        &LookupContext::new(),
    )
    .await;
    assert!(result.is_pass());
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn ehlo_forward_lookup_matches_mapped_client_address() {
    let stub = StubResolver::new()
        .with_ips("mail.example.com", Ok(vec!["192.0.2.1".parse().unwrap()]));
    let result = require_matching_ehlo(
        &meta("::ffff:192.0.2.1", "mail.example.com"),
        &stub,
        &LookupContext::new(),
    )
    .await;
    assert!(result.is_pass());
}

#[tokio::test]
async fn ehlo_forward_lookup_without_match_is_permanent() {
    let stub = StubResolver::new()
        .with_ips("mail.example.com", Ok(vec!["198.51.100.7".parse().unwrap()]));
    let result = require_matching_ehlo(
        &meta("192.0.2.1", "mail.example.com"),
        &stub,
        &LookupContext::new(),
    )
    .await;
    assert_eq!(reply(&result), (550, EnhancedCode(5, 7, 0)));
}

#[tokio::test]
async fn ehlo_lookup_error_follows_resolver_classification() {
    for err in all_dns_errors() {
        let temporary = err.is_temporary();
        let raw = err.to_string();
        let stub = StubResolver::new().with_ips("mail.example.com", Err(err));
        let result = require_matching_ehlo(
            &meta("192.0.2.1", "mail.example.com"),
            &stub,
            &LookupContext::new(),
        )
        .await;

        let (code, enhanced) = reply(&result);
        if temporary {
            assert_eq!((code, enhanced), (420, EnhancedCode(4, 7, 27)), "{raw}");
        } else {
            assert_eq!((code, enhanced), (501, EnhancedCode(5, 7, 27)), "{raw}");
        }
        let reason = result.reason.expect("failure");
        assert_eq!(reason.check_name(), Some(MATCHING_EHLO));
        assert_eq!(reason.misc().get("reason"), Some(&raw));
    }
}

// --- registry & configured checks --------------------------------------

#[test]
fn builtin_registry_lists_identity_checks() {
    let registry = CheckRegistry::builtin();
    let names: Vec<_> = registry.names().collect();
    assert_eq!(names, vec![MATCHING_EHLO, MATCHING_RDNS, MX_RECORD]);

    let entry = registry.get(MX_RECORD).expect("registered");
    assert_eq!(entry.kind, CheckKind::MxRecord);
    assert_eq!(entry.kind.stage(), CheckStage::Sender);
    assert_eq!(entry.default_action, FailAction::quarantine());
}

#[test]
fn empty_options_enable_every_check() {
    let set = CheckSet::build(&CheckRegistry::builtin(), &CheckOptions::new()).expect("valid");
    assert_eq!(set.checks().len(), 3);
    assert!(set.checks().iter().all(|c| c.action == FailAction::quarantine()));
}

#[test]
fn unknown_check_fails_at_load() {
    let options = CheckOptions::new().enable("require_spf");
    let err = CheckSet::build(&CheckRegistry::builtin(), &options).expect_err("unknown check");
    assert_eq!(err, ConfigError::UnknownCheck("require_spf".into()));
}

#[test]
fn invalid_action_fails_at_load() {
    let options = CheckOptions::new().with_action(MX_RECORD, ["reject", "250"]);
    let err = CheckSet::build(&CheckRegistry::builtin(), &options).expect_err("bad code");
    match err {
        ConfigError::Directive { check, source } => {
            assert_eq!(check, MX_RECORD);
            assert!(matches!(source, DirectiveError::InvalidCode { .. }));
        }
        other => panic!("expected directive error, got {:?}", other),
    }
}

#[test]
fn with_action_enables_only_named_checks() {
    let options = CheckOptions::new().with_action(MATCHING_EHLO, ["ignore"]);
    let set = CheckSet::build(&CheckRegistry::builtin(), &options).expect("valid");
    assert_eq!(set.checks().len(), 1);
    let ehlo = set.get(MATCHING_EHLO).expect("enabled");
    assert_eq!(ehlo.action, FailAction::ignore());
    assert!(set.get(MX_RECORD).is_none());
}

#[tokio::test]
async fn configured_reject_overrides_reply_and_keeps_cause() {
    let options =
        CheckOptions::new().with_action(MX_RECORD, ["reject", "550", "5.7.1", "No MX, no mail"]);
    let set = CheckSet::build(&CheckRegistry::builtin(), &options).expect("valid");
    let stub = StubResolver::new().with_mx("example.com", Ok(Vec::new()));

    let results = set
        .check_sender(
            &meta("192.0.2.1", "mx"),
            "user@example.com",
            &stub,
            &LookupContext::new(),
        )
        .await;
    assert_eq!(results.len(), 1);
    let (name, result) = &results[0];
    assert_eq!(*name, MX_RECORD);
    assert!(result.reject);
    assert!(!result.quarantine);

    let reason = result.reason.as_ref().expect("failure");
    assert_eq!(reason.code(), 550);
    assert_eq!(reason.message(), "No MX, no mail");
    assert_eq!(reason.root().enhanced_code(), EnhancedCode(5, 7, 27));
    assert_eq!(reason.check_name(), Some(MX_RECORD));
}

#[tokio::test]
async fn stages_only_run_their_checks() {
    let set = CheckSet::build(&CheckRegistry::builtin(), &CheckOptions::new()).expect("valid");
    let stub = StubResolver::new()
        .with_ips("mail.example.com", Ok(vec!["192.0.2.1".parse().unwrap()]));
    let m = meta("192.0.2.1", "mail.example.com")
        .with_rdns(RdnsName::Resolved("mail.example.com.".into()));

    let results = set.check_connection(&m, &stub, &LookupContext::new()).await;
    let names: Vec<_> = results.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, vec![MATCHING_EHLO, MATCHING_RDNS]);
    assert!(results.iter().all(|(_, r)| r.is_pass()));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn passing_check_keeps_flags_clear() {
    let options = CheckOptions::new().with_action(MATCHING_EHLO, ["reject"]);
    let set = CheckSet::build(&CheckRegistry::builtin(), &options).expect("valid");
    let stub = StubResolver::new();
    let results = set
        .check_connection(&meta("192.0.2.1", "[192.0.2.1]"), &stub, &LookupContext::new())
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].1, CheckResult::pass());
}
