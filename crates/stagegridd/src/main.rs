//! stagegridd — the StageGrid daemon.
//!
//! Single binary that loads `stagegrid.toml`, builds the stage catalog and
//! the configured strategy, and runs the control loop until Ctrl-C.
//!
//! # Usage
//!
//! ```text
//! stagegridd run --config stagegrid.toml
//! stagegridd check --config stagegrid.toml
//! stagegridd solve --config stagegrid.toml --target 50 --previous 45
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use stagegrid_alloc::build_strategy;
use stagegrid_control::ControlLoop;
use stagegrid_io::{CsvHistoryLog, JsonSetpointFile};
use stagegridd::{check_report, load, solve_report};

#[derive(Parser)]
#[command(name = "stagegridd", about = "StageGrid stage allocation daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the control loop until interrupted.
    Run {
        /// Path to stagegrid.toml.
        #[arg(long, default_value = "stagegrid.toml")]
        config: PathBuf,
    },
    /// Validate the configuration and print the stage catalog.
    Check {
        #[arg(long, default_value = "stagegrid.toml")]
        config: PathBuf,
    },
    /// Run the configured strategy once and print the allocation.
    Solve {
        #[arg(long, default_value = "stagegrid.toml")]
        config: PathBuf,

        /// Setpoint to allocate for.
        #[arg(long)]
        target: f64,

        /// Output achieved in the previous cycle.
        #[arg(long, default_value = "0")]
        previous: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,stagegridd=debug,stagegrid=debug")
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => run(&config).await,
        Command::Check { config } => check(&config),
        Command::Solve {
            config,
            target,
            previous,
        } => solve(&config, target, previous),
    }
}

async fn run(path: &Path) -> anyhow::Result<()> {
    info!("StageGrid daemon starting");

    let (config, catalog) = load(path)?;
    for (index, stage) in catalog.stages().iter().enumerate() {
        info!(
            index,
            value = stage.value,
            max_quantity = stage.max_quantity,
            variance_factor = stage.variance_factor,
            "stage"
        );
    }

    let strategy = build_strategy(config.control.strategy, catalog, &config.tuning);
    info!(strategy = strategy.name(), "strategy selected");

    let setpoints = JsonSetpointFile::new(&config.io.setpoint_path, &config.io.setpoint_field);
    if config.control.resume && config.io.fresh_history {
        warn!("resume has no effect while fresh_history truncates the log");
    }
    let history = CsvHistoryLog::open(&config.io.history_path, config.io.fresh_history)
        .with_context(|| format!("opening {}", config.io.history_path.display()))?;
    info!(path = ?config.io.history_path, "history log opened");

    let mut control = ControlLoop::new(strategy, setpoints, history)
        .with_recovery(config.control.recovery)
        .with_cadence(config.cadence()?);
    if config.control.resume {
        control = control.resume_from_history();
    }

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let control_handle = tokio::spawn(async move {
        control.run(shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to install Ctrl-C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    control_handle.await?;

    info!("StageGrid daemon stopped");
    Ok(())
}

fn check(path: &Path) -> anyhow::Result<()> {
    let (config, catalog) = load(path)?;
    let report = check_report(&config, &catalog)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn solve(path: &Path, target: f64, previous: f64) -> anyhow::Result<()> {
    let (config, catalog) = load(path)?;
    let report = solve_report(&config, catalog, target, previous);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
