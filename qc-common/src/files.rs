//! Flat-file storage backend
//!
//! Layout inside the data directory:
//! - `users.txt`: one `username:pin` per line
//! - `blend_data.csv`: the blend spreadsheet export (see [`crate::blend_csv`])
//! - `lot_images.csv`: `blend_code,lot_number,image_path,confirmed_by`, append-only
//!   except for confirmations
//!
//! Missing files read as empty.

use crate::blend_csv::{self, BLEND_SHEET_FILE};
use crate::models::{Blend, LotImage, User};
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const USERS_FILE: &str = "users.txt";
pub const LOT_IMAGES_FILE: &str = "lot_images.csv";

/// Parse `username:pin` lines. Blank lines and lines without `:` are skipped.
pub fn parse_users(content: &str) -> Vec<User> {
    let mut users = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line.split_once(':') {
            Some((username, pin)) if !username.trim().is_empty() => users.push(User {
                username: username.trim().to_string(),
                pin: pin.trim().to_string(),
            }),
            _ => warn!("Skipping users file line {}: expected username:pin", index + 1),
        }
    }
    users
}

/// Read a users file; a missing file yields no users
pub fn read_users(path: &Path) -> Result<Vec<User>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(parse_users(&content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Data kept in plain files under one directory
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Use `data_dir`, creating it if needed
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        info!("Using flat-file storage in {}", data_dir.display());
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn users_path(&self) -> PathBuf {
        self.data_dir.join(USERS_FILE)
    }

    fn blends_path(&self) -> PathBuf {
        self.data_dir.join(BLEND_SHEET_FILE)
    }

    fn lots_path(&self) -> PathBuf {
        self.data_dir.join(LOT_IMAGES_FILE)
    }

    fn load_blends(&self) -> Result<Vec<Blend>> {
        let path = self.blends_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        blend_csv::read_blends(&path)
    }

    fn load_lots(&self) -> Result<Vec<LotImage>> {
        let path = self.lots_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&path)?;
        let mut lots = Vec::new();
        for row in reader.deserialize::<LotImage>() {
            lots.push(row?);
        }
        Ok(lots)
    }

    fn lots_for(&self, blend_code: &str) -> Result<Vec<LotImage>> {
        let mut lots: Vec<LotImage> = self
            .load_lots()?
            .into_iter()
            .filter(|lot| lot.blend_code == blend_code)
            .collect();
        lots.sort_by(|a, b| b.lot_number.cmp(&a.lot_number));
        Ok(lots)
    }

    fn save_lots(&self, lots: &[LotImage]) -> Result<()> {
        let tmp = self.lots_path().with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            for lot in lots {
                writer.serialize(lot)?;
            }
            writer.flush()?;
        }
        std::fs::rename(&tmp, self.lots_path())?;
        Ok(())
    }

    pub fn fetch_all_users(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = read_users(&self.users_path())?
            .into_iter()
            .map(|u| u.username)
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub fn authenticate_user(&self, username: &str, pin: &str) -> Result<bool> {
        Ok(read_users(&self.users_path())?
            .iter()
            .any(|u| u.username == username && u.pin == pin))
    }

    /// Create a user, or replace the PIN of an existing one
    pub fn add_user(&self, username: &str, pin: &str) -> Result<()> {
        if username.contains(':') || username.contains('\n') || pin.contains('\n') {
            return Err(Error::InvalidInput(format!(
                "username '{}' cannot be stored in {}",
                username, USERS_FILE
            )));
        }

        let mut users = read_users(&self.users_path())?;
        match users.iter_mut().find(|u| u.username == username) {
            Some(existing) => existing.pin = pin.to_string(),
            None => users.push(User {
                username: username.to_string(),
                pin: pin.to_string(),
            }),
        }

        let content: String = users
            .iter()
            .map(|u| format!("{}:{}\n", u.username, u.pin))
            .collect();
        std::fs::write(self.users_path(), content)?;
        Ok(())
    }

    /// Insert a blend, or replace the row with the same code
    pub fn insert_blend(&self, blend: &Blend) -> Result<()> {
        let mut blends = self.load_blends()?;
        match blends.iter_mut().find(|b| b.code == blend.code) {
            Some(existing) => *existing = blend.clone(),
            None => blends.push(blend.clone()),
        }
        blend_csv::write_blends(&self.blends_path(), &blends)
    }

    pub fn fetch_blend_info(&self, code: &str) -> Result<Option<Blend>> {
        Ok(self.load_blends()?.into_iter().find(|b| b.code == code))
    }

    pub fn fetch_valid_blends(&self) -> Result<Vec<String>> {
        let mut codes: Vec<String> = self
            .load_blends()?
            .into_iter()
            .filter(Blend::is_selectable)
            .map(|b| b.code)
            .collect();
        codes.sort();
        Ok(codes)
    }

    pub fn find_next_lot(&self, blend_code: &str) -> Result<Option<i64>> {
        self.lots_for(blend_code)?
            .first()
            .map(|lot| crate::lots::next_after(blend_code, lot.lot_number))
            .transpose()
    }

    pub fn fetch_image_info_for_blend(&self, blend_code: &str) -> Result<Option<LotImage>> {
        Ok(self.lots_for(blend_code)?.into_iter().next())
    }

    pub fn fetch_lot_numbers_for_blend(&self, blend_code: &str) -> Result<Vec<i64>> {
        Ok(self
            .lots_for(blend_code)?
            .into_iter()
            .map(|lot| lot.lot_number)
            .collect())
    }

    pub fn fetch_lot_image(&self, blend_code: &str, lot_number: i64) -> Result<Option<LotImage>> {
        Ok(self
            .load_lots()?
            .into_iter()
            .find(|lot| lot.blend_code == blend_code && lot.lot_number == lot_number))
    }

    /// Append an unconfirmed lot record. Blend existence is checked by the caller.
    pub fn insert_lot_image(&self, blend_code: &str, lot_number: i64, image_path: &str) -> Result<()> {
        let path = self.lots_path();
        let needs_header = std::fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(LotImage {
            blend_code: blend_code.to_string(),
            lot_number,
            image_path: image_path.to_string(),
            confirmed_by: String::new(),
        })?;
        writer.flush()?;

        info!("Recorded lot {} image for blend {}", lot_number, blend_code);
        Ok(())
    }

    pub fn mark_confirmed(&self, initials: &str, blend_code: &str, lot_number: i64) -> Result<()> {
        if initials.trim().is_empty() {
            return Err(Error::InvalidInput("confirming initials are empty".to_string()));
        }

        let mut lots = self.load_lots()?;
        let mut matched = false;
        for lot in lots
            .iter_mut()
            .filter(|lot| lot.blend_code == blend_code && lot.lot_number == lot_number)
        {
            lot.confirmed_by = initials.to_string();
            matched = true;
        }

        if !matched {
            return Err(Error::NotFound(format!(
                "lot {} for blend {}",
                lot_number, blend_code
            )));
        }

        self.save_lots(&lots)?;
        info!("Marked lot {} of {} as confirmed by {}", lot_number, blend_code, initials);
        Ok(())
    }
}
