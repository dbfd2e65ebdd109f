//! Common error types for QC press station

use thiserror::Error;

/// Common result type for QC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the QC crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed CSV data
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Image server rejected an upload or returned an unusable response
    #[error("Upload failed ({0}): {1}")]
    Upload(u16, String),

    /// Image server answered a download with an error status
    #[error("Image retrieval failed ({0}): {1}")]
    Fetch(u16, String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Username/PIN pair did not match
    #[error("Invalid username or PIN")]
    AuthFailed,

    /// Blend has no lot history, so the operator must enter a lot number
    #[error("Last lot number unknown for blend {0}; a lot number must be entered")]
    LotNumberRequired(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
