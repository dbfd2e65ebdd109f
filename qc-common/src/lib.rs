//! # QC Common Library
//!
//! Shared code for the QC press station binaries:
//! - Configuration loading and backend selection
//! - Data models (users, blends, lot images)
//! - Persistence over SQLite, MySQL or flat files
//! - Operator sessions and lot numbering
//! - Image storage (upload server or local directory)
//! - Blend spreadsheet CSV parsing

pub mod blend_csv;
pub mod config;
pub mod db;
pub mod error;
pub mod files;
pub mod images;
pub mod lots;
pub mod models;
pub mod session;
pub mod store;

pub use error::{Error, Result};
pub use models::{Blend, LotImage, User};
pub use session::Session;
pub use store::Store;
