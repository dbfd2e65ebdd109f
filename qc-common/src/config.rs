//! Configuration loading and storage backend selection
//!
//! Config file resolution order:
//! 1. Explicit path (command-line `--config`)
//! 2. `QC_CONFIG` environment variable
//! 3. `qc.toml` in the working directory
//! 4. Platform config directory (`~/.config/qc-press/config.toml` on Linux)
//! 5. `/etc/qc-press/config.toml` (Linux)
//! 6. Built-in defaults
//!
//! A file named explicitly (1 or 2) must exist and parse. Files found by
//! discovery (3 to 5) are optional; when none exists the defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "QC_CONFIG";

/// Config file name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "qc.toml";

/// Top-level configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct QcConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Remote MySQL/MariaDB connection; required when `use_external_db` is set
    #[serde(default)]
    pub external_db: Option<ExternalDbConfig>,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub images: ImagesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend selection flags
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Store data in a local SQLite file (takes precedence over `use_external_db`)
    #[serde(default = "default_true")]
    pub use_sqlite: bool,

    /// Store data in the remote database described by `[external_db]`
    #[serde(default)]
    pub use_external_db: bool,

    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            use_sqlite: true,
            use_external_db: false,
            sqlite_path: default_sqlite_path(),
        }
    }
}

/// Remote database connection parameters
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExternalDbConfig {
    pub host: String,

    #[serde(default = "default_mysql_port")]
    pub port: u16,

    pub database: String,

    pub user: String,

    #[serde(default)]
    pub password: String,
}

/// Flat-file storage location
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory holding `users.txt`, `blend_data.csv` and `lot_images.csv`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Lot image storage
#[derive(Debug, Clone, Deserialize)]
pub struct ImagesConfig {
    /// Base URL of the image upload server; local storage is used when unset
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            local_dir: default_local_dir(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("qc_application.db")
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_local_dir() -> PathBuf {
    PathBuf::from("images")
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded configuration from {}", path.display()),
            ConfigSource::Defaults => {
                warn!("No config file found, using built-in defaults (SQLite storage)")
            }
        }
    }
}

/// Where persistent data lives, derived from the `[database]` flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Sqlite { path: PathBuf },
    MySql(ExternalDbConfig),
    Files { data_dir: PathBuf },
}

/// Where lot images are stored and fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Server { url: String, timeout: Duration },
    LocalDir(PathBuf),
}

impl QcConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Load configuration from a specific file, which must exist
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load configuration following the documented priority order
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config, source) = Self::resolve(explicit)?;
        source.log();
        Ok(config)
    }

    /// Like [`QcConfig::load`], without logging
    ///
    /// Binaries call this before the log level from the config is known and
    /// log the returned source once tracing is installed.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        // Priority 1: Command-line argument
        if let Some(path) = explicit {
            return Ok((Self::load_file(path)?, ConfigSource::File(path.to_path_buf())));
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                let path = PathBuf::from(path);
                return Ok((Self::load_file(&path)?, ConfigSource::File(path)));
            }
        }

        // Priority 3 to 5: discovered files
        if let Some(path) = discover_config_file() {
            return Ok((Self::load_file(&path)?, ConfigSource::File(path)));
        }

        // Priority 6: built-in defaults
        Ok((Self::default(), ConfigSource::Defaults))
    }

    /// Select the storage backend from the `[database]` flags
    pub fn backend(&self) -> Result<StorageBackend> {
        if self.database.use_sqlite {
            return Ok(StorageBackend::Sqlite {
                path: self.database.sqlite_path.clone(),
            });
        }

        if self.database.use_external_db {
            return match &self.external_db {
                Some(external) => Ok(StorageBackend::MySql(external.clone())),
                None => Err(Error::Config(
                    "use_external_db is set but no [external_db] section is configured"
                        .to_string(),
                )),
            };
        }

        Ok(StorageBackend::Files {
            data_dir: self.files.data_dir.clone(),
        })
    }

    /// Select the image store from the `[images]` section
    pub fn image_source(&self) -> ImageSource {
        match self.images.server_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => ImageSource::Server {
                url: url.trim_end_matches('/').to_string(),
                timeout: Duration::from_secs(self.images.timeout_secs),
            },
            _ => ImageSource::LocalDir(self.images.local_dir.clone()),
        }
    }
}

/// Find the first config file that exists in the discovery locations
fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    let user_config = dirs::config_dir().map(|d| d.join("qc-press").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/qc-press/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_source_trims_trailing_slash() {
        let config = QcConfig::from_toml_str(
            r#"
            [images]
            server_url = "http://10.0.0.5:25050/"
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(
            config.image_source(),
            ImageSource::Server {
                url: "http://10.0.0.5:25050".to_string(),
                timeout: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn test_blank_server_url_means_local_storage() {
        let config = QcConfig::from_toml_str(
            r#"
            [images]
            server_url = "  "
            local_dir = "/srv/qc/images"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.image_source(),
            ImageSource::LocalDir(PathBuf::from("/srv/qc/images"))
        );
    }
}
