use std::collections::BTreeMap;

use crate::action::{FailAction, parse_action_directive};
use crate::dns::{DnsResolver, LookupContext};

use super::{
    CheckResult, ConfigError, ConnectionMeta, require_matching_ehlo, require_matching_rdns,
    require_mx_record,
};

pub const MATCHING_RDNS: &str = "require_matching_rdns";
pub const MX_RECORD: &str = "require_mx_record";
pub const MATCHING_EHLO: &str = "require_matching_ehlo";

/// Point of the SMTP session at which a check has its inputs.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckStage {
    /// After EHLO: client address, EHLO name and rDNS are known.
    Connection,
    /// After MAIL FROM.
    Sender,
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    MatchingRdns,
    MxRecord,
    MatchingEhlo,
}

impl CheckKind {
    pub const ALL: [CheckKind; 3] = [Self::MatchingRdns, Self::MxRecord, Self::MatchingEhlo];

    pub const fn name(self) -> &'static str {
        match self {
            Self::MatchingRdns => MATCHING_RDNS,
            Self::MxRecord => MX_RECORD,
            Self::MatchingEhlo => MATCHING_EHLO,
        }
    }

    pub const fn stage(self) -> CheckStage {
        match self {
            Self::MatchingRdns | Self::MatchingEhlo => CheckStage::Connection,
            Self::MxRecord => CheckStage::Sender,
        }
    }

    /// Raw verdict, before any fail action is applied. `mail_from` is only
    /// read by sender-stage checks.
    pub async fn run<R: DnsResolver>(
        self,
        meta: &ConnectionMeta,
        mail_from: &str,
        resolver: &R,
        ctx: &LookupContext,
    ) -> CheckResult {
        match self {
            Self::MatchingRdns => require_matching_rdns(meta),
            Self::MxRecord => require_mx_record(meta, mail_from, resolver, ctx).await,
            Self::MatchingEhlo => require_matching_ehlo(meta, resolver, ctx).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub kind: CheckKind,
    pub default_action: FailAction,
}

/// Name → check table, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct CheckRegistry {
    entries: BTreeMap<&'static str, RegistryEntry>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three identity checks, each quarantining on failure by default.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for kind in CheckKind::ALL {
            registry.register(kind, FailAction::quarantine());
        }
        registry
    }

    /// Returns the previous entry registered under the same name.
    pub fn register(
        &mut self,
        kind: CheckKind,
        default_action: FailAction,
    ) -> Option<RegistryEntry> {
        self.entries.insert(
            kind.name(),
            RegistryEntry {
                kind,
                default_action,
            },
        )
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which checks to run and their `fail_action` directives, as tokenized
/// arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOptions {
    enabled: Vec<String>,
    actions: BTreeMap<String, Vec<String>>,
}

impl CheckOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// With nothing enabled, every registered check runs.
    pub fn enable(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.enabled.contains(&name) {
            self.enabled.push(name);
        }
        self
    }

    /// Overrides the default fail action of `name` and enables it.
    pub fn with_action<I, S>(mut self, name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        self.actions
            .insert(name.clone(), args.into_iter().map(Into::into).collect());
        self.enable(name)
    }

    pub fn enabled(&self) -> &[String] {
        &self.enabled
    }

    pub fn action_args(&self, name: &str) -> Option<&[String]> {
        self.actions.get(name).map(Vec::as_slice)
    }
}

/// A check together with its parsed fail action.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfiguredCheck {
    pub kind: CheckKind,
    pub action: FailAction,
}

impl ConfiguredCheck {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Runs the check and merges its verdict with the fail action.
    pub async fn run<R: DnsResolver>(
        &self,
        meta: &ConnectionMeta,
        mail_from: &str,
        resolver: &R,
        ctx: &LookupContext,
    ) -> CheckResult {
        let raw = self.kind.run(meta, mail_from, resolver, ctx).await;
        let result = self.action.apply(raw);

        if let Some(reason) = &result.reason {
            tracing::warn!(
                check = self.name(),
                smtp_code = reason.code(),
                smtp_enchcode = %reason.enhanced_code(),
                quarantine = result.quarantine,
                reject = result.reject,
                fields = ?reason.fields(),
                "check failed"
            );
        }
        result
    }
}

/// Every check enabled for a listener, with fail actions parsed up front.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSet {
    checks: Vec<ConfiguredCheck>,
}

impl CheckSet {
    /// Resolves check names and parses every action directive, so that a
    /// bad configuration is rejected before any message is processed.
    pub fn build(registry: &CheckRegistry, options: &CheckOptions) -> Result<Self, ConfigError> {
        let names: Vec<String> = if options.enabled().is_empty() {
            registry.names().map(str::to_string).collect()
        } else {
            options.enabled().to_vec()
        };

        let mut checks = Vec::with_capacity(names.len());
        for name in names {
            let entry = registry
                .get(&name)
                .ok_or_else(|| ConfigError::UnknownCheck(name.clone()))?;
            let action = match options.action_args(&name) {
                Some(args) => parse_action_directive(args)
                    .map_err(|source| ConfigError::directive(&name, source))?,
                None => entry.default_action.clone(),
            };
            checks.push(ConfiguredCheck {
                kind: entry.kind,
                action,
            });
        }
        Ok(Self { checks })
    }

    pub fn checks(&self) -> &[ConfiguredCheck] {
        &self.checks
    }

    pub fn get(&self, name: &str) -> Option<&ConfiguredCheck> {
        self.checks.iter().find(|check| check.name() == name)
    }

    /// Runs the connection-stage checks in configuration order. All of them
    /// run; deciding whether one failure stops the session is up to the
    /// caller.
    pub async fn check_connection<R: DnsResolver>(
        &self,
        meta: &ConnectionMeta,
        resolver: &R,
        ctx: &LookupContext,
    ) -> Vec<(&'static str, CheckResult)> {
        self.run_stage(CheckStage::Connection, meta, "", resolver, ctx).await
    }

    /// Runs the sender-stage checks for one MAIL FROM.
    pub async fn check_sender<R: DnsResolver>(
        &self,
        meta: &ConnectionMeta,
        mail_from: &str,
        resolver: &R,
        ctx: &LookupContext,
    ) -> Vec<(&'static str, CheckResult)> {
        self.run_stage(CheckStage::Sender, meta, mail_from, resolver, ctx).await
    }

    async fn run_stage<R: DnsResolver>(
        &self,
        stage: CheckStage,
        meta: &ConnectionMeta,
        mail_from: &str,
        resolver: &R,
        ctx: &LookupContext,
    ) -> Vec<(&'static str, CheckResult)> {
        let mut out = Vec::new();
        for check in self.checks.iter().filter(|c| c.kind.stage() == stage) {
            let result = check.run(meta, mail_from, resolver, ctx).await;
            out.push((check.name(), result));
        }
        out
    }
}
