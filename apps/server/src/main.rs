//! Telecast Server - headless daemon for Telecast.
//!
//! Runs one reconciliation loop per configured TV plus the discovery
//! listener until Ctrl+C/SIGTERM. The `search` subcommand instead reports the
//! TVs visible on the network so their IDs and MAC addresses can be copied
//! into the config file.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use telecast_core::bootstrap::create_http_client;
use telecast_core::discovery::{self, DiscoveryListener};
use telecast_core::{bootstrap_services, Config, TelecastError};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Telecast Server - Samsung TV control driven by a home-automation hub.
#[derive(Parser, Debug)]
#[command(name = "telecast-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML or JSON).
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(
        short,
        long,
        default_value = "info",
        env = "TELECAST_LOG_LEVEL",
        global = true
    )]
    log_level: log::LevelFilter,

    /// Status feed base URL (overrides config file).
    #[arg(short = 's', long)]
    server_url: Option<String>,

    /// Milliseconds between reconciliation cycles (overrides config file).
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Control the configured TVs (default).
    Run,
    /// Report TVs announcing themselves on the network.
    Search,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Telecast Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(url) = args.server_url {
        config.server_url = url;
    }
    if let Some(interval) = args.poll_interval_ms {
        config.poll_interval_ms = interval;
    }

    let core_config = config.to_core_config();

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(&core_config).await,
        Command::Search => search(&core_config).await,
    }
}

/// Controls the configured TVs until a shutdown signal or listener failure.
async fn run(config: &Config) -> Result<()> {
    log::info!(
        "Configuration: server_url={}, devices={}, poll_interval={}ms",
        config.server_url,
        config.devices.len(),
        config.poll_interval_ms
    );

    let mut services = bootstrap_services(config)
        .inspect_err(log_failure)
        .context("Failed to bootstrap services")?;

    log::info!("Services bootstrapped successfully");

    let outcome = tokio::select! {
        _ = shutdown_signal() => {
            log::info!("Shutdown signal received, cleaning up...");
            Ok(())
        }
        result = services.discovery_stopped() => {
            result.inspect_err(log_failure).context("Discovery listener stopped")
        }
    };

    // Graceful shutdown
    services.shutdown().await;

    outcome
}

/// Logs the machine-readable code of a fatal error.
fn log_failure(e: &TelecastError) {
    log::error!("Fatal error [{}]: {}", e.code(), e);
}

/// Logs every TV heard on the network until Ctrl+C.
async fn search(config: &Config) -> Result<()> {
    let listener =
        DiscoveryListener::bind(&config.discovery).context("Failed to start discovery listener")?;
    let client = create_http_client()?;
    let cancel = CancellationToken::new();

    log::info!("Searching for TVs, press Ctrl+C to stop");

    let searching = discovery::search(listener, client, cancel.clone());
    tokio::pin!(searching);

    tokio::select! {
        result = &mut searching => result.context("Search failed")?,
        _ = shutdown_signal() => {
            cancel.cancel();
            searching.await.context("Search failed")?;
        }
    }

    log::info!("Search finished");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
