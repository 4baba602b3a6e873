//! cryptonews-relay: one run (or a repeating run) of the news relay.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cryptonews_relay::ledger::Ledger;
use cryptonews_relay::{Config, Pipeline};

/// Fetch crypto news, translate it and republish it to WordPress and Facebook.
#[derive(Parser, Debug)]
#[command(name = "cryptonews-relay", version, about)]
struct Cli {
    /// Ledger file (overrides LEDGER_PATH)
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Articles taken per run (overrides MAX_ARTICLES)
    #[arg(long)]
    limit: Option<usize>,

    /// Translate and log only; nothing is published or ledgered
    #[arg(long)]
    dry_run: bool,

    /// Repeat every SECS seconds until Ctrl-C
    #[arg(long, value_name = "SECS")]
    every: Option<u64>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9184)
    #[arg(long, env = "RELAY_METRICS_ADDR", value_name = "ADDR")]
    metrics_addr: Option<SocketAddr>,

    /// Emit JSON log lines
    #[arg(long, env = "RELAY_JSON_LOGS")]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cryptonews_relay=info,warn"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = Config::from_env()?;
    if let Some(addr) = cli.metrics_addr {
        cryptonews_relay::metrics::install_exporter(addr)?;
    }

    let mut pipeline = Pipeline::from_config(&cfg)?.with_dry_run(cli.dry_run);
    if let Some(path) = cli.ledger {
        pipeline = pipeline.with_ledger(Ledger::new(path));
    }
    if let Some(n) = cli.limit {
        pipeline = pipeline.with_max_articles(n);
    }

    let Some(secs) = cli.every.filter(|s| *s > 0) else {
        pipeline.run().await?;
        return Ok(());
    };

    let mut tick = tokio::time::interval(Duration::from_secs(secs));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = tick.tick() => {
                pipeline.run().await?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("ctrl-c received, stopping");
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "relay aborted");
            ExitCode::FAILURE
        }
    }
}
