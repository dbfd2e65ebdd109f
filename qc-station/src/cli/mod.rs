//! Command-line interface

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use qc_common::lots::LotAssignment;
use qc_common::session::Session;
use qc_station::display;
use qc_station::Station;
use std::path::PathBuf;

mod interactive;

/// Command-line arguments for qc-station
#[derive(Parser, Debug)]
#[command(name = "qc-station")]
#[command(about = "Press operator first-piece past-lot comparison station")]
#[command(version)]
pub struct Args {
    /// Config file (TOML); defaults to ./qc.toml or the platform config directory
    #[arg(short, long, env = "QC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List operators who can log in
    Users,
    /// List blends available for pressing
    Blends,
    /// Show a blend's specs and its latest lot
    Show { blend: String },
    /// List a blend's recorded lot numbers, newest first
    Lots { blend: String },
    /// Upload the current lot image for a blend
    Upload {
        blend: String,
        image: PathBuf,
        #[command(flatten)]
        login: LoginArgs,
        /// Lot number; prompted when the blend has no lot history
        #[arg(long)]
        lot: Option<i64>,
        /// Mark the uploaded lot as verified by the logged-in user
        #[arg(long)]
        confirm: bool,
    },
    /// Mark a lot as verified by the logged-in user
    Confirm {
        blend: String,
        lot: i64,
        #[command(flatten)]
        login: LoginArgs,
    },
    /// Save a lot's reference image to a file (latest lot by default)
    Fetch {
        blend: String,
        #[arg(long)]
        lot: Option<i64>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Interactive station: log in, pick blends, upload and confirm lots
    Session,
}

#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// Operator username
    #[arg(short, long)]
    pub user: String,

    /// Operator PIN; prompted when omitted
    #[arg(long, env = "QC_PIN", hide_env_values = true)]
    pub pin: Option<String>,
}

pub async fn run(station: &Station, command: Command) -> Result<()> {
    match command {
        Command::Users => {
            for user in station.users().await? {
                println!("{}", user);
            }
        }
        Command::Blends => {
            let blends = station.valid_blends().await?;
            if blends.is_empty() {
                println!("No blends available");
            }
            for code in blends {
                println!("{}", code);
            }
        }
        Command::Show { blend } => {
            let view = station.select_blend(&blend).await?;
            print!("{}", display::render_blend_view(&view));
        }
        Command::Lots { blend } => {
            let lots = station.store().fetch_lot_numbers_for_blend(&blend).await?;
            if lots.is_empty() {
                println!("No lots available");
            }
            for lot in lots {
                println!("{}", lot);
            }
        }
        Command::Upload {
            blend,
            image,
            login,
            lot,
            confirm,
        } => {
            let session = login_with(station, &login).await?;
            let lot = match lot {
                Some(lot) => Some(lot),
                None => match station.lot_assignment(&blend).await? {
                    LotAssignment::Next(_) => None,
                    LotAssignment::NeedsManualEntry => Some(prompt_lot_number()?),
                },
            };

            let uploaded = station
                .upload_current_lot(&session, &blend, &image, lot)
                .await
                .context("Failed to upload image")?;
            println!(
                "{}: {}",
                display::current_caption(uploaded.lot_number),
                uploaded.image_path
            );
            println!("Image uploaded successfully");

            if confirm {
                confirm_and_report(station, &session, &blend, uploaded.lot_number).await?;
            }
        }
        Command::Confirm { blend, lot, login } => {
            let session = login_with(station, &login).await?;
            confirm_and_report(station, &session, &blend, lot).await?;
        }
        Command::Fetch { blend, lot, output } => {
            let (lot, bytes) = station.lot_image_bytes(&blend, lot).await?;
            tokio::fs::write(&output, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!(
                "{} saved to {} ({} bytes)",
                display::past_caption(lot),
                output.display(),
                bytes.len()
            );
        }
        Command::Session => interactive::run(station).await?,
    }
    Ok(())
}

async fn login_with(station: &Station, login: &LoginArgs) -> Result<Session> {
    let pin = match &login.pin {
        Some(pin) => pin.clone(),
        None => Password::new()
            .with_prompt(format!("PIN for {}", login.user))
            .interact()?,
    };
    station
        .login(&login.user, &pin)
        .await
        .context("Login failed")
}

async fn confirm_and_report(station: &Station, session: &Session, blend: &str, lot: i64) -> Result<()> {
    let confirmed = station.confirm_lot(session, blend, lot).await?;
    println!(
        "Lot {} of {} {}",
        confirmed.lot_number,
        confirmed.blend_code,
        display::confirmation_status(&confirmed)
    );
    Ok(())
}

/// Ask for the first lot number of a blend without history
pub(crate) fn prompt_lot_number() -> Result<i64> {
    let entered: String = Input::new()
        .with_prompt("Last lot number unknown. Please enter a lot number")
        .allow_empty(true)
        .interact_text()?;

    let entered = entered.trim();
    if entered.is_empty() {
        bail!("No lot number entered. Cancelled.");
    }
    entered
        .parse()
        .with_context(|| format!("'{}' is not a lot number", entered))
}
