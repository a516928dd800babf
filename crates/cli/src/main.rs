//! `orderflow` command line entry point
//!
//! Runs one extraction in the requested mode and exits. Scheduling is left
//! to cron or a systemd timer.

mod wiring;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use orderflow_core::RunSummary;
use orderflow_domain::{ExtractType, ExtractionConfig};
use orderflow_infra::{config, init_tracing, InstanceLock, LogFormat};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "orderflow", version)]
#[command(about = "Extract marketplace orders into the local order store")]
struct Cli {
    /// Extraction mode: daily_full, incremental, status_update or weekly_catchup
    #[arg(long, env = "ORDERFLOW_MODE")]
    mode: ExtractType,

    /// Config file (TOML or JSON); otherwise env vars, then standard locations
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, env = "ORDERFLOW_JSON_LOGS")]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal in production.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let format = if cli.json_logs { LogFormat::Json } else { LogFormat::Pretty };
    if let Err(e) = init_tracing(format) {
        eprintln!("failed to initialise logging: {e}");
    }

    match run(cli).await {
        Ok(summary) => {
            info!(
                run_id = %summary.run_id,
                mode = summary.extract_type.as_str(),
                records = summary.records,
                batches = summary.batches,
                attempts = summary.attempts,
                "orderflow.completed"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "orderflow.failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let app_config = match cli.config {
        Some(path) => config::load_from_file(Some(path)),
        None => config::load(),
    }
    .context("loading configuration")?;

    let _lock = InstanceLock::acquire(&app_config.extraction.lock_file)
        .context("acquiring single-instance lock")?;

    let orchestrator = wiring::build_orchestrator(&app_config)?;
    let run_config = ExtractionConfig::for_mode(
        cli.mode,
        Utc::now(),
        app_config.extraction.markets.iter().cloned(),
        app_config.extraction.batch_size,
    )?;

    info!(
        mode = cli.mode.as_str(),
        date_from = %run_config.date_from(),
        date_to = %run_config.date_to(),
        markets = run_config.markets().len(),
        "orderflow.starting"
    );
    let summary = orchestrator.run(&run_config).await?;
    Ok(summary)
}
