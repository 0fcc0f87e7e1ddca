//! Pingwatch CLI
//!
//! Command-line interface for the URL health-check monitor.

use std::path::PathBuf;

use clap::Parser;
use pingwatch::{load_config, Config, PingwatchBuilder};
use tracing::Level;

#[derive(Parser)]
#[command(name = "pingwatch")]
#[command(about = "URL health-check monitor")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API port (overrides config file and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, port={:?}, log_level={:?}",
        args.config,
        args.port,
        args.log_level
    );

    // Precedence, lowest first: config file, PINGWATCH_* environment, --port
    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.apply_env_overrides();

    if let Some(port) = args.port {
        config.api.port = port;
    }

    tracing::info!("Starting pingwatch service");
    tracing::debug!(
        "Period: {:?}, storage: {:?}, API enabled: {}",
        config.scheduler.period(),
        config.storage.path,
        config.api.enabled
    );

    PingwatchBuilder::new(config).build().await?.start().await?;

    Ok(())
}
