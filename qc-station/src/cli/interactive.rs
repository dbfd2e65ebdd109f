//! Interactive station session
//!
//! Login screen first, then the blend screen until the operator quits.

use super::prompt_lot_number;
use anyhow::{bail, Result};
use dialoguer::{Confirm, Input, Password, Select};
use qc_common::lots::LotAssignment;
use qc_common::session::Session;
use qc_common::Error;
use qc_station::display;
use qc_station::{BlendView, Station};
use std::path::PathBuf;
use tracing::warn;

const MAX_LOGIN_ATTEMPTS: usize = 3;

#[derive(Clone, Copy)]
enum Action {
    SaveLotImage,
    Upload,
    Confirm,
    OtherBlend,
    Quit,
}

impl Action {
    const ALL: [Action; 5] = [
        Action::SaveLotImage,
        Action::Upload,
        Action::Confirm,
        Action::OtherBlend,
        Action::Quit,
    ];

    fn label(self) -> &'static str {
        match self {
            Action::SaveLotImage => "Save a past lot image to file",
            Action::Upload => "Upload current lot image",
            Action::Confirm => "Mark a lot as verified",
            Action::OtherBlend => "Choose another blend",
            Action::Quit => "Quit",
        }
    }
}

pub async fn run(station: &Station) -> Result<()> {
    let session = login_screen(station).await?;
    println!("Logged in as {} ({})", session.username, session.initials);

    loop {
        let Some(code) = pick_blend(station).await? else {
            return Ok(());
        };
        if !blend_screen(station, &session, &code).await? {
            return Ok(());
        }
    }
}

async fn login_screen(station: &Station) -> Result<Session> {
    let users = station.users().await?;
    if users.is_empty() {
        bail!("No operators are configured");
    }

    for attempt in 1..=MAX_LOGIN_ATTEMPTS {
        let index = Select::new()
            .with_prompt("Operator")
            .items(&users)
            .default(0)
            .interact()?;
        let pin = Password::new().with_prompt("PIN").interact()?;

        match station.login(&users[index], &pin).await {
            Ok(session) => return Ok(session),
            Err(Error::AuthFailed) => {
                println!("Login failed: Invalid username or PIN");
                warn!("Login attempt {} of {} failed", attempt, MAX_LOGIN_ATTEMPTS);
            }
            Err(e) => return Err(e.into()),
        }
    }
    bail!("Too many failed login attempts")
}

async fn pick_blend(station: &Station) -> Result<Option<String>> {
    let blends = station.valid_blends().await?;
    if blends.is_empty() {
        println!("No blends available");
        return Ok(None);
    }

    let index = Select::new()
        .with_prompt("Blend (Esc to quit)")
        .items(&blends)
        .default(0)
        .interact_opt()?;
    Ok(index.map(|i| blends[i].clone()))
}

/// Returns false when the operator chose to quit
async fn blend_screen(station: &Station, session: &Session, code: &str) -> Result<bool> {
    loop {
        let view = station.select_blend(code).await?;
        println!();
        print!("{}", display::render_blend_view(&view));

        let labels: Vec<&str> = Action::ALL.iter().map(|a| a.label()).collect();
        let choice = Select::new()
            .with_prompt("Action")
            .items(&labels)
            .default(0)
            .interact()?;

        let outcome = match Action::ALL[choice] {
            Action::SaveLotImage => save_lot_image(station, &view).await,
            Action::Upload => upload(station, session, code).await,
            Action::Confirm => confirm(station, session, &view).await,
            Action::OtherBlend => return Ok(true),
            Action::Quit => return Ok(false),
        };

        // Failures are reported and the operator stays on the blend screen
        if let Err(e) = outcome {
            println!("Error: {:#}", e);
        }
    }
}

fn pick_lot(view: &BlendView, prompt: &str) -> Result<Option<i64>> {
    if view.lots.is_empty() {
        println!("No lots available");
        return Ok(None);
    }
    let labels: Vec<String> = view.lots.iter().map(i64::to_string).collect();
    let index = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact_opt()?;
    Ok(index.map(|i| view.lots[i]))
}

async fn save_lot_image(station: &Station, view: &BlendView) -> Result<()> {
    let Some(lot) = pick_lot(view, "Lot")? else {
        return Ok(());
    };
    let output: String = Input::new()
        .with_prompt("Save to")
        .default(format!("{}_{}.jpg", view.blend.code, lot))
        .interact_text()?;

    let (lot, bytes) = station.lot_image_bytes(&view.blend.code, Some(lot)).await?;
    tokio::fs::write(&output, &bytes).await?;
    println!("{} saved to {}", display::past_caption(lot), output);
    Ok(())
}

async fn upload(station: &Station, session: &Session, code: &str) -> Result<()> {
    let manual_lot = match station.lot_assignment(code).await? {
        LotAssignment::Next(next) => {
            println!("Next lot: {}", next);
            None
        }
        LotAssignment::NeedsManualEntry => Some(prompt_lot_number()?),
    };

    let path: String = Input::new().with_prompt("Image file").interact_text()?;
    let image = PathBuf::from(path.trim());

    let uploaded = station
        .upload_current_lot(session, code, &image, manual_lot)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to upload image: {}", e))?;
    println!(
        "{}: {}",
        display::current_caption(uploaded.lot_number),
        uploaded.image_path
    );
    println!("Image uploaded successfully");

    let verify = Confirm::new()
        .with_prompt(format!("Mark lot {} as verified by {}?", uploaded.lot_number, session.initials))
        .default(false)
        .interact()?;
    if verify {
        let confirmed = station.confirm_lot(session, code, uploaded.lot_number).await?;
        println!("Lot {} {}", confirmed.lot_number, display::confirmation_status(&confirmed));
    }
    Ok(())
}

async fn confirm(station: &Station, session: &Session, view: &BlendView) -> Result<()> {
    let Some(lot) = pick_lot(view, "Lot to verify")? else {
        return Ok(());
    };
    let confirmed = station.confirm_lot(session, &view.blend.code, lot).await?;
    println!("Lot {} {}", confirmed.lot_number, display::confirmation_status(&confirmed));
    Ok(())
}
