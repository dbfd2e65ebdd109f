//! Queries shared by the SQLite and MySQL backends
//!
//! Both engines accept `?` placeholders through sqlx, so only the
//! statements in [`Dialect`] need per-engine text. Writes run inside a
//! transaction that is rolled back when any statement fails.

use super::dialect::Dialect;
use crate::models::{Blend, LotImage};
use crate::{Error, Result};
use sqlx::{MySqlPool, SqlitePool};
use tracing::{debug, error, info};

/// Connection pool for one of the supported engines
#[derive(Debug, Clone)]
pub enum SqlPool {
    Sqlite(SqlitePool),
    MySql(MySqlPool),
}

impl SqlPool {
    pub fn dialect(&self) -> Dialect {
        match self {
            SqlPool::Sqlite(_) => Dialect::Sqlite,
            SqlPool::MySql(_) => Dialect::MySql,
        }
    }
}

/// Run the same sqlx expression against whichever pool is active
macro_rules! on_pool {
    ($pool:expr, $p:ident => $body:expr) => {
        match $pool {
            SqlPool::Sqlite($p) => $body,
            SqlPool::MySql($p) => $body,
        }
    };
}

const BLEND_COLUMNS: &str =
    "code, product, tablets_amount, kilos_to_produce, tablet_size, tablet_weight";

const LOT_IMAGE_COLUMNS: &str = "blend_code, lot_number, image_path, confirmed_by";

/// Users, blends and lot images stored in a relational database
#[derive(Debug, Clone)]
pub struct SqlStore {
    pool: SqlPool,
}

impl SqlStore {
    pub fn new(pool: SqlPool) -> Self {
        Self { pool }
    }

    pub fn dialect(&self) -> Dialect {
        self.pool.dialect()
    }

    pub fn pool(&self) -> &SqlPool {
        &self.pool
    }

    /// Usernames for the login screen, alphabetical
    pub async fn fetch_all_users(&self) -> Result<Vec<String>> {
        let sql = "SELECT username FROM users ORDER BY username";
        let users = on_pool!(&self.pool, p => {
            sqlx::query_scalar::<_, String>(sql).fetch_all(p).await?
        });
        Ok(users)
    }

    /// True when a user with exactly this username and PIN exists
    pub async fn authenticate_user(&self, username: &str, pin: &str) -> Result<bool> {
        let sql = "SELECT COUNT(*) FROM users WHERE username = ? AND pin = ?";
        let count = on_pool!(&self.pool, p => {
            sqlx::query_scalar::<_, i64>(sql)
                .bind(username)
                .bind(pin)
                .fetch_one(p)
                .await?
        });
        Ok(count > 0)
    }

    /// Create a user, or replace the PIN of an existing one
    pub async fn add_user(&self, username: &str, pin: &str) -> Result<()> {
        let sql = self.dialect().upsert_user();
        let result = on_pool!(&self.pool, p => {
            async {
                let mut tx = p.begin().await?;
                sqlx::query(sql).bind(username).bind(pin).execute(&mut *tx).await?;
                tx.commit().await?;
                Ok::<(), sqlx::Error>(())
            }
            .await
        });

        if let Err(e) = &result {
            error!("Failed to save user {}, rolled back: {}", username, e);
        }
        Ok(result?)
    }

    /// Insert a blend, or update the stored fields of an existing code
    pub async fn insert_blend(&self, blend: &Blend) -> Result<()> {
        let sql = self.dialect().upsert_blend();
        let result = on_pool!(&self.pool, p => {
            async {
                let mut tx = p.begin().await?;
                sqlx::query(sql)
                    .bind(&blend.code)
                    .bind(&blend.product)
                    .bind(blend.tablets_amount)
                    .bind(blend.kilos_to_produce)
                    .bind(&blend.tablet_size)
                    .bind(blend.tablet_weight)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok::<(), sqlx::Error>(())
            }
            .await
        });

        if let Err(e) = &result {
            error!("Failed to save blend {}, rolled back: {}", blend.code, e);
        }
        Ok(result?)
    }

    pub async fn fetch_blend_info(&self, code: &str) -> Result<Option<Blend>> {
        let sql = format!("SELECT {} FROM blends WHERE code = ?", BLEND_COLUMNS);
        let blend = on_pool!(&self.pool, p => {
            sqlx::query_as::<_, Blend>(&sql).bind(code).fetch_optional(p).await?
        });
        Ok(blend)
    }

    /// Codes of blends that can be selected for pressing (positive tablet weight)
    pub async fn fetch_valid_blends(&self) -> Result<Vec<String>> {
        let sql = "SELECT code FROM blends \
                   WHERE tablet_weight IS NOT NULL AND tablet_weight > 0 \
                   ORDER BY code";
        let codes = on_pool!(&self.pool, p => {
            sqlx::query_scalar::<_, String>(sql).fetch_all(p).await?
        });
        Ok(codes)
    }

    /// Next lot number for a blend (max + 1), or `None` when it has no lots yet
    pub async fn find_next_lot(&self, blend_code: &str) -> Result<Option<i64>> {
        let sql = "SELECT MAX(lot_number) FROM lot_images WHERE blend_code = ?";
        let max = on_pool!(&self.pool, p => {
            sqlx::query_scalar::<_, Option<i64>>(sql)
                .bind(blend_code)
                .fetch_one(p)
                .await?
        });
        debug!("Highest lot for {}: {:?}", blend_code, max);
        max.map(|lot| crate::lots::next_after(blend_code, lot)).transpose()
    }

    /// Most recent lot image (highest lot number) for a blend
    pub async fn fetch_image_info_for_blend(&self, blend_code: &str) -> Result<Option<LotImage>> {
        let sql = format!(
            "SELECT {} FROM lot_images WHERE blend_code = ? ORDER BY lot_number DESC LIMIT 1",
            LOT_IMAGE_COLUMNS
        );
        let lot = on_pool!(&self.pool, p => {
            sqlx::query_as::<_, LotImage>(&sql)
                .bind(blend_code)
                .fetch_optional(p)
                .await?
        });
        Ok(lot)
    }

    /// All recorded lot numbers for a blend, newest first
    pub async fn fetch_lot_numbers_for_blend(&self, blend_code: &str) -> Result<Vec<i64>> {
        let sql = "SELECT lot_number FROM lot_images WHERE blend_code = ? ORDER BY lot_number DESC";
        let lots = on_pool!(&self.pool, p => {
            sqlx::query_scalar::<_, i64>(sql).bind(blend_code).fetch_all(p).await?
        });
        Ok(lots)
    }

    pub async fn fetch_lot_image(&self, blend_code: &str, lot_number: i64) -> Result<Option<LotImage>> {
        let sql = format!(
            "SELECT {} FROM lot_images WHERE blend_code = ? AND lot_number = ? LIMIT 1",
            LOT_IMAGE_COLUMNS
        );
        let lot = on_pool!(&self.pool, p => {
            sqlx::query_as::<_, LotImage>(&sql)
                .bind(blend_code)
                .bind(lot_number)
                .fetch_optional(p)
                .await?
        });
        Ok(lot)
    }

    /// Record an uploaded lot image; it starts unconfirmed
    pub async fn insert_lot_image(&self, blend_code: &str, lot_number: i64, image_path: &str) -> Result<()> {
        let sql = "INSERT INTO lot_images (blend_code, lot_number, image_path, confirmed_by) \
                   VALUES (?, ?, ?, '')";
        let result = on_pool!(&self.pool, p => {
            async {
                let mut tx = p.begin().await?;
                sqlx::query(sql)
                    .bind(blend_code)
                    .bind(lot_number)
                    .bind(image_path)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok::<(), sqlx::Error>(())
            }
            .await
        });

        match &result {
            Ok(()) => info!("Recorded lot {} image for blend {}", lot_number, blend_code),
            Err(e) => error!(
                "Failed to record lot {} for blend {}, rolled back: {}",
                lot_number, blend_code, e
            ),
        }
        Ok(result?)
    }

    /// Set the confirming supervisor's initials on a lot
    pub async fn mark_confirmed(&self, initials: &str, blend_code: &str, lot_number: i64) -> Result<()> {
        if initials.trim().is_empty() {
            return Err(Error::InvalidInput("confirming initials are empty".to_string()));
        }

        let exists_sql = "SELECT COUNT(*) FROM lot_images WHERE blend_code = ? AND lot_number = ?";
        let update_sql = "UPDATE lot_images SET confirmed_by = ? WHERE blend_code = ? AND lot_number = ?";

        // The existence check is separate from the UPDATE because MySQL reports
        // zero affected rows when the stored value is already identical.
        let result = on_pool!(&self.pool, p => {
            async {
                let mut tx = p.begin().await?;
                let count = sqlx::query_scalar::<_, i64>(exists_sql)
                    .bind(blend_code)
                    .bind(lot_number)
                    .fetch_one(&mut *tx)
                    .await?;
                if count == 0 {
                    return Ok::<bool, sqlx::Error>(false);
                }
                sqlx::query(update_sql)
                    .bind(initials)
                    .bind(blend_code)
                    .bind(lot_number)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok(true)
            }
            .await
        });

        match result {
            Ok(true) => {
                info!("Marked lot {} of {} as confirmed by {}", lot_number, blend_code, initials);
                Ok(())
            }
            Ok(false) => Err(Error::NotFound(format!(
                "lot {} for blend {}",
                lot_number, blend_code
            ))),
            Err(e) => {
                error!("Couldn't mark lot {} as confirmed, rolled back: {}", lot_number, e);
                Err(e.into())
            }
        }
    }

    pub async fn close(&self) {
        on_pool!(&self.pool, p => p.close().await)
    }
}
