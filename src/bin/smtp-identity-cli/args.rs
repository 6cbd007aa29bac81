use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use smtp_identity::{CheckOptions, LookupContext};

#[derive(Parser)]
#[command(
    name = "smtp-identity-cli",
    about = "Vérifie l'identité d'un client SMTP (rDNS, MX, EHLO)"
)]
pub struct Cli {
    /// adresse IP du client
    #[arg(long)]
    pub ip: IpAddr,

    /// port source du client
    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// nom annoncé en EHLO/HELO (ou littéral [192.0.2.1])
    #[arg(long)]
    pub ehlo: String,

    /// MAIL FROM, vide pour un bounce
    #[arg(long = "mail-from", default_value = "")]
    pub mail_from: String,

    /// nom rDNS déjà connu (pas de requête PTR)
    #[arg(long, conflicts_with = "no_rdns")]
    pub rdns: Option<String>,

    /// désactive la résolution rDNS
    #[arg(long)]
    pub no_rdns: bool,

    /// check à exécuter (répétable, défaut: tous)
    #[arg(long = "check")]
    pub checks: Vec<String>,

    /// NAME=ACTION[,CODE[,ENHANCED[,MESSAGE]]], ex: require_mx_record=reject,550,5.7.1,No MX
    #[arg(long = "action", value_parser = parse_action_arg)]
    pub actions: Vec<ActionArg>,

    /// deadline global des requêtes DNS (ms, 0 = aucune)
    #[arg(long = "timeout-ms", default_value_t = 5_000)]
    pub timeout_ms: u64,

    /// format: human|json
    #[arg(long, default_value = "human")]
    pub format: String,

    /// logs détaillés (debug) sur stderr
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionArg {
    pub check: String,
    pub args: Vec<String>,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn source(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    pub fn check_options(&self) -> CheckOptions {
        let mut options = CheckOptions::new();
        for name in &self.checks {
            options = options.enable(name.as_str());
        }
        for action in &self.actions {
            options = options.with_action(action.check.as_str(), action.args.iter().cloned());
        }
        options
    }

    pub fn lookup_context(&self) -> LookupContext {
        let ctx = LookupContext::new();
        if self.timeout_ms == 0 {
            ctx
        } else {
            ctx.with_timeout(Duration::from_millis(self.timeout_ms))
        }
    }
}

/// The message is the last field and may itself contain commas.
pub fn parse_action_arg(raw: &str) -> Result<ActionArg, String> {
    let (check, directive) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=ACTION[,...], got '{raw}'"))?;
    let check = check.trim();
    if check.is_empty() {
        return Err(format!("missing check name in '{raw}'"));
    }

    let args = directive
        .splitn(4, ',')
        .enumerate()
        .map(|(i, part)| if i < 3 { part.trim() } else { part })
        .map(str::to_string)
        .collect();

    Ok(ActionArg {
        check: check.to_string(),
        args,
    })
}
