//! qc-import library - bulk loading of blend specifications and operators
//!
//! Rows are written one at a time. A row that fails is logged, counted and
//! skipped; the rest of the batch still loads.

use qc_common::files::read_users;
use qc_common::{blend_csv, Blend, Error, Result, Store};
use std::path::Path;
use tracing::{error, info};

/// Answer the operator must type before an import overwrites stored data
pub const CONFIRMATION_WORD: &str = "yes";

/// True only for exactly `yes`: no other casing, abbreviation or padding
pub fn is_confirmed(answer: &str) -> bool {
    answer == CONFIRMATION_WORD
}

/// Outcome of a bulk load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub saved: usize,
    pub failed: Vec<String>,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.saved + self.failed.len()
    }
}

/// Upsert every blend; `on_saved` is called with the 1-based row count after each success
pub async fn import_blends<F>(store: &Store, blends: &[Blend], mut on_saved: F) -> ImportSummary
where
    F: FnMut(usize, &Blend),
{
    let mut summary = ImportSummary::default();
    for blend in blends {
        match store.insert_blend(blend).await {
            Ok(()) => {
                summary.saved += 1;
                on_saved(summary.saved, blend);
            }
            Err(e) => {
                error!("Blend {} ({}) not saved: {}", blend.code, blend.product, e);
                summary.failed.push(blend.code.clone());
            }
        }
    }
    info!(
        "Blend import finished: {} saved, {} failed",
        summary.saved,
        summary.failed.len()
    );
    summary
}

/// Read a blend sheet and upsert its rows
pub async fn import_blend_sheet<F>(store: &Store, sheet: &Path, on_saved: F) -> Result<ImportSummary>
where
    F: FnMut(usize, &Blend),
{
    if let Store::Files(files) = store {
        let own_sheet = files.data_dir().join(blend_csv::BLEND_SHEET_FILE);
        if is_same_file(sheet, &own_sheet) {
            return Err(Error::InvalidInput(format!(
                "{} is the flat-file store's own blend sheet; import from a spreadsheet export elsewhere",
                sheet.display()
            )));
        }
    }

    let blends = blend_csv::read_blends(sheet)?;
    info!("Read {} blends from {}", blends.len(), sheet.display());
    Ok(import_blends(store, &blends, on_saved).await)
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Upsert operators from a `username:pin` file
pub async fn import_users_file(store: &Store, users_file: &Path) -> Result<ImportSummary> {
    if !users_file.is_file() {
        return Err(Error::NotFound(format!("users file {}", users_file.display())));
    }
    let users = read_users(users_file)?;
    info!("Read {} users from {}", users.len(), users_file.display());

    let mut summary = ImportSummary::default();
    for user in users {
        match store.add_user(&user.username, &user.pin).await {
            Ok(()) => summary.saved += 1,
            Err(e) => {
                error!("User {} not saved: {}", user.username, e);
                summary.failed.push(user.username);
            }
        }
    }
    Ok(summary)
}
