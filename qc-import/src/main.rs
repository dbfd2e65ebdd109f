//! qc-import - load product information into the QC store
//!
//! Run this after the blend spreadsheet changes. It overwrites stored blend
//! data with the contents of the exported CSV, so it asks for an explicit
//! `yes` before touching anything.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::Input;
use qc_common::blend_csv::BLEND_SHEET_FILE;
use qc_common::config::QcConfig;
use qc_common::files::USERS_FILE;
use qc_common::Store;
use qc_import::{import_blend_sheet, import_users_file, is_confirmed, ImportSummary};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for qc-import
#[derive(Parser, Debug)]
#[command(name = "qc-import")]
#[command(about = "Bulk-load blend specifications or operators into the QC store")]
#[command(version)]
struct Args {
    /// Config file (TOML); defaults to ./qc.toml or the platform config directory
    #[arg(short, long, env = "QC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Insert or update blends from the spreadsheet export
    Blends {
        #[arg(long, default_value = BLEND_SHEET_FILE)]
        csv: PathBuf,
    },
    /// Insert or update operators from a username:pin file
    Users {
        #[arg(long, default_value = USERS_FILE)]
        file: PathBuf,
    },
}

fn confirm_or_exit(warning: &[&str], skip: bool) -> Result<()> {
    for line in warning {
        println!("{}", line);
    }
    if skip {
        return Ok(());
    }

    let answer: String = Input::new()
        .with_prompt("Are you sure?")
        .allow_empty(true)
        .interact_text()?;
    if !is_confirmed(&answer) {
        println!("Exiting.");
        bail!("User cancelled operation.");
    }
    Ok(())
}

fn report(kind: &str, summary: &ImportSummary) {
    println!(
        "{} {} processed: {} saved, {} failed",
        summary.total(),
        kind,
        summary.saved,
        summary.failed.len()
    );
    if !summary.failed.is_empty() {
        println!("Not saved: {}", summary.failed.join(", "));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (config, config_source) =
        QcConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting QC Import v{}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    match &args.command {
        Command::Blends { csv } => confirm_or_exit(
            &[
                format!(
                    "This program updates all stored product data based on the contents of '{}'.",
                    csv.display()
                )
                .as_str(),
                "It is expected that you use a copy of the exact Product Information on our spreadsheets...",
                "Type 'yes' if you're sure you want to continue (there are few fail-safes here if you've messed up!)",
            ],
            args.yes,
        )?,
        Command::Users { file } => confirm_or_exit(
            &[
                format!(
                    "This program adds operators from '{}' and replaces the PINs of existing ones.",
                    file.display()
                )
                .as_str(),
                "Type 'yes' if you're sure you want to continue.",
            ],
            args.yes,
        )?,
    }

    let store = Store::open(&config).await.context("Failed to open store")?;
    info!("Importing into {} storage", store.describe());

    let result = match &args.command {
        Command::Blends { csv } => import_blend_sheet(&store, csv, |i, blend| {
            println!("[{}] Inserted or updated information for {}", i, blend.product);
        })
        .await
        .map(|summary| report("blends", &summary)),
        Command::Users { file } => import_users_file(&store, file)
            .await
            .map(|summary| report("users", &summary)),
    };

    store.close().await;
    result.context("Import failed")
}
