//! qc-station - press operator first-piece lot comparison station
//!
//! One-shot commands for scripting plus an interactive `session` command
//! that walks through the login and blend selection screens.

use anyhow::{Context, Result};
use clap::Parser;
use qc_common::config::QcConfig;
use qc_station::Station;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_source) =
        QcConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;

    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting QC Station v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config_source.log();

    let station = Station::open(&config)
        .await
        .context("Failed to open station storage")?;

    let result = cli::run(&station, args.command).await;
    station.close().await;
    result
}
