mod args;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use smtp_identity::{CheckRegistry, CheckSet, ConnectionMeta, RdnsName, SystemResolver};
use tracing_subscriber::EnvFilter;

use args::Cli;
use output::OutputRow;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // erreurs de config -> code 1 via anyhow, avant toute requête DNS
    let checks = CheckSet::build(&CheckRegistry::builtin(), &cli.check_options())
        .context("invalid check configuration")?;
    let resolver = SystemResolver::from_system_conf().context("resolver initialization failed")?;

    let ctx = cli.lookup_context();
    let token = ctx.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let rdns = if cli.no_rdns {
        RdnsName::NotAttempted
    } else if let Some(name) = &cli.rdns {
        RdnsName::Resolved(name.clone())
    } else {
        RdnsName::lookup(&resolver, &ctx, cli.ip).await
    };
    let meta = ConnectionMeta::new(cli.source(), cli.ehlo.as_str()).with_rdns(rdns);

    let mut results = checks.check_connection(&meta, &resolver, &ctx).await;
    let sender = checks.check_sender(&meta, &cli.mail_from, &resolver, &ctx).await;
    results.extend(sender);

    let rows: Vec<OutputRow> = results
        .iter()
        .map(|(name, result)| OutputRow::new(*name, result))
        .collect();
    output::write_report(&rows, &cli.format)?;

    // codes de sortie : 0 OK, 2 check en échec, 1 fatal
    if output::any_failed(&rows) {
        std::process::exit(2);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
