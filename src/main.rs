//! Warden - host supervisor task runner
//!
//! Runs the periodic task registry against a simulated service fleet.
//!
//! # Usage
//!
//! ```bash
//! # Run until Ctrl+C with the default catalog
//! cargo run --release
//!
//! # Flaky fleet, JSON logs, custom config
//! ./warden --config warden.toml --log-json run --failure-rate 0.2
//!
//! # Print the task catalog with effective intervals
//! ./warden catalog
//! ```
//!
//! # Environment Variables
//!
//! - `WARDEN_CONFIG`: Path to the TOML config (default: ./warden.toml)
//! - `RUST_LOG`: Logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use warden::config::TasksConfig;
use warden::scheduler::{IntervalScheduler, Scheduler};
use warden::simulation;
use warden::tasks::{CatalogEntry, Tasks};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(about = "Periodic update, reload and watchdog tasks for a container host")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML config. Overrides WARDEN_CONFIG and ./warden.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Schedule every task and run until Ctrl+C (default)
    Run {
        /// Probability that a simulated probe or action fails (0.0 - 1.0)
        #[arg(long, default_value = "0.05", value_parser = parse_rate)]
        failure_rate: f64,

        /// Seed for the simulated fleet, for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the task catalog as JSON
    Catalog,
}

fn parse_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(format!("{rate} is not within 0.0 - 1.0"))
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    let config = match &args.config {
        Some(path) => TasksConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => TasksConfig::load(),
    };

    match args.command.unwrap_or(SubCommand::Run {
        failure_rate: 0.05,
        seed: None,
    }) {
        SubCommand::Catalog => print_catalog(config),
        SubCommand::Run { failure_rate, seed } => run(config, failure_rate, seed).await,
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn print_catalog(config: TasksConfig) -> Result<()> {
    let scheduler: Arc<dyn Scheduler> = Arc::new(IntervalScheduler::new());
    let tasks = Tasks::new(scheduler, simulation::fleet(0.0, Some(0)), config);
    let entries: Vec<CatalogEntry> = tasks.catalog().iter().map(CatalogEntry::from).collect();
    let json = serde_json::to_string_pretty(&entries).context("Failed to serialize catalog")?;
    println!("{json}");
    Ok(())
}

async fn run(config: TasksConfig, failure_rate: f64, seed: Option<u64>) -> Result<()> {
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Warden - host supervisor task runner");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        channel = %config.updates.channel,
        watchdog = config.watchdog.enabled,
        failure_rate,
        "Starting simulated fleet"
    );

    let scheduler = Arc::new(IntervalScheduler::new());
    let mut tasks = Tasks::new(
        Arc::clone(&scheduler) as Arc<dyn Scheduler>,
        simulation::fleet(failure_rate, seed),
        config,
    );
    tasks.load();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Received Ctrl+C, initiating shutdown...");

    tasks.unload();
    scheduler.shutdown().await;

    info!("Warden shutdown complete");
    Ok(())
}
