//! Synthetic sensor telemetry generator.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use sensorsim::{Simulator, SimulatorConfig};

/// Simulated temperature/humidity sensors exposed as Prometheus metrics.
#[derive(Parser, Debug)]
#[command(name = "sensorsim")]
#[command(about = "Generate synthetic sensor telemetry for Prometheus")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        SimulatorConfig::load_from_file(config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path))?
    } else {
        SimulatorConfig::default()
    };

    if let Some(listen) = args.listen {
        config.prometheus.listen = listen;
        config.validate()?;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    sensorsim_common::init_tracing(&config.logging)?;

    for device in config.duplicate_devices() {
        warn!(device = %device, "Duplicate device identity, readings will overwrite each other");
    }

    info!(
        devices = config.devices.len(),
        listen = %config.prometheus.listen,
        path = %config.prometheus.path,
        "Starting sensorsim"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics_path = config.prometheus.path.clone();
    let simulator = Simulator::new(config);
    let sink = simulator.sink().clone();
    let mut running = simulator
        .start(shutdown_rx)
        .await
        .context("Failed to start metrics exporter")?;

    info!("Serving metrics on http://{}{}", running.local_addr(), metrics_path);

    let mut server_error = None;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = sigterm() => {
            info!("Received SIGTERM, shutting down...");
        }
        result = running.http_stopped() => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
                server_error = Some(e);
            }
        }
    }

    // Signal shutdown
    // Receivers may already be gone if every task exited
    let _ = shutdown_tx.send(true);

    let samples = running.join(Duration::from_secs(5)).await;

    let stats = sink.stats();
    info!(
        samples,
        samples_recorded = stats.samples_recorded,
        scrapes = stats.scrapes,
        series_count = sink.series_count(),
        "Final statistics"
    );

    if let Some(e) = server_error {
        return Err(e);
    }

    info!("sensorsim stopped");
    Ok(())
}

#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
