//! Database connection and schema creation
//!
//! Schema creation is idempotent (`CREATE TABLE IF NOT EXISTS`), so opening
//! an existing database leaves its data untouched.

use super::dialect::Dialect;
use super::queries::{SqlPool, SqlStore};
use crate::config::ExternalDbConfig;
use crate::Result;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Open (creating if needed) a local SQLite database and its tables
pub async fn connect_sqlite(db_path: &Path) -> Result<SqlStore> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    let pool = SqlPool::Sqlite(pool);
    create_tables(&pool).await?;
    Ok(SqlStore::new(pool))
}

/// Connect to the remote MySQL/MariaDB database and create missing tables
pub async fn connect_mysql(config: &ExternalDbConfig) -> Result<SqlStore> {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);

    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    info!(
        "Connected to external database {} on {}:{}",
        config.database, config.host, config.port
    );

    let pool = SqlPool::MySql(pool);
    create_tables(&pool).await?;
    Ok(SqlStore::new(pool))
}

/// Create the users, blends and lot_images tables if they do not exist
pub async fn create_tables(pool: &SqlPool) -> Result<()> {
    let dialect = pool.dialect();
    for statement in dialect.create_table_statements() {
        match pool {
            SqlPool::Sqlite(p) => {
                sqlx::query(*statement).execute(p).await?;
            }
            SqlPool::MySql(p) => {
                sqlx::query(*statement).execute(p).await?;
            }
        }
    }
    debug!("Schema ready ({:?})", dialect);
    Ok(())
}
