//! qc-station library - press operator first-piece lot comparison
//!
//! Operators log in, pick a blend, compare against the previous lot's
//! reference image, upload the current lot and have it confirmed.

pub mod display;
pub mod station;

pub use station::{BlendView, Station};
