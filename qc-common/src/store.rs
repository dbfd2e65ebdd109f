//! Backend-independent access to users, blends and lot images

use crate::config::{QcConfig, StorageBackend};
use crate::db::{self, SqlStore};
use crate::files::FileStore;
use crate::models::{Blend, LotImage};
use crate::{Error, Result};

/// The configured persistence backend
#[derive(Debug, Clone)]
pub enum Store {
    Sql(SqlStore),
    Files(FileStore),
}

impl Store {
    /// Open the backend selected by the `[database]` config flags
    pub async fn open(config: &QcConfig) -> Result<Self> {
        match config.backend()? {
            StorageBackend::Sqlite { path } => Ok(Store::Sql(db::connect_sqlite(&path).await?)),
            StorageBackend::MySql(external) => Ok(Store::Sql(db::connect_mysql(&external).await?)),
            StorageBackend::Files { data_dir } => Ok(Store::Files(FileStore::open(&data_dir)?)),
        }
    }

    /// Short backend label for log lines
    pub fn describe(&self) -> &'static str {
        match self {
            Store::Sql(sql) => match sql.dialect() {
                db::Dialect::Sqlite => "sqlite",
                db::Dialect::MySql => "mysql",
            },
            Store::Files(_) => "flat files",
        }
    }

    pub async fn fetch_all_users(&self) -> Result<Vec<String>> {
        match self {
            Store::Sql(s) => s.fetch_all_users().await,
            Store::Files(f) => f.fetch_all_users(),
        }
    }

    pub async fn authenticate_user(&self, username: &str, pin: &str) -> Result<bool> {
        match self {
            Store::Sql(s) => s.authenticate_user(username, pin).await,
            Store::Files(f) => f.authenticate_user(username, pin),
        }
    }

    pub async fn add_user(&self, username: &str, pin: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(Error::InvalidInput("username is empty".to_string()));
        }
        match self {
            Store::Sql(s) => s.add_user(username, pin).await,
            Store::Files(f) => f.add_user(username, pin),
        }
    }

    /// Insert or update a blend by code
    pub async fn insert_blend(&self, blend: &Blend) -> Result<()> {
        if blend.code.trim().is_empty() {
            return Err(Error::InvalidInput("blend code is empty".to_string()));
        }
        match self {
            Store::Sql(s) => s.insert_blend(blend).await,
            Store::Files(f) => f.insert_blend(blend),
        }
    }

    pub async fn fetch_blend_info(&self, code: &str) -> Result<Option<Blend>> {
        match self {
            Store::Sql(s) => s.fetch_blend_info(code).await,
            Store::Files(f) => f.fetch_blend_info(code),
        }
    }

    pub async fn fetch_valid_blends(&self) -> Result<Vec<String>> {
        match self {
            Store::Sql(s) => s.fetch_valid_blends().await,
            Store::Files(f) => f.fetch_valid_blends(),
        }
    }

    /// `Some(max + 1)`, or `None` when the blend has no recorded lots
    pub async fn find_next_lot(&self, blend_code: &str) -> Result<Option<i64>> {
        match self {
            Store::Sql(s) => s.find_next_lot(blend_code).await,
            Store::Files(f) => f.find_next_lot(blend_code),
        }
    }

    pub async fn fetch_image_info_for_blend(&self, blend_code: &str) -> Result<Option<LotImage>> {
        match self {
            Store::Sql(s) => s.fetch_image_info_for_blend(blend_code).await,
            Store::Files(f) => f.fetch_image_info_for_blend(blend_code),
        }
    }

    pub async fn fetch_lot_numbers_for_blend(&self, blend_code: &str) -> Result<Vec<i64>> {
        match self {
            Store::Sql(s) => s.fetch_lot_numbers_for_blend(blend_code).await,
            Store::Files(f) => f.fetch_lot_numbers_for_blend(blend_code),
        }
    }

    pub async fn fetch_lot_image(&self, blend_code: &str, lot_number: i64) -> Result<Option<LotImage>> {
        match self {
            Store::Sql(s) => s.fetch_lot_image(blend_code, lot_number).await,
            Store::Files(f) => f.fetch_lot_image(blend_code, lot_number),
        }
    }

    /// Record a lot image for an existing blend
    pub async fn insert_lot_image(&self, blend_code: &str, lot_number: i64, image_path: &str) -> Result<()> {
        if self.fetch_blend_info(blend_code).await?.is_none() {
            return Err(Error::NotFound(format!("blend {}", blend_code)));
        }
        match self {
            Store::Sql(s) => s.insert_lot_image(blend_code, lot_number, image_path).await,
            Store::Files(f) => f.insert_lot_image(blend_code, lot_number, image_path),
        }
    }

    pub async fn mark_confirmed(&self, initials: &str, blend_code: &str, lot_number: i64) -> Result<()> {
        match self {
            Store::Sql(s) => s.mark_confirmed(initials, blend_code, lot_number).await,
            Store::Files(f) => f.mark_confirmed(initials, blend_code, lot_number),
        }
    }

    pub async fn close(&self) {
        if let Store::Sql(s) = self {
            s.close().await;
        }
    }
}
