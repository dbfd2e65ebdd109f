//! Data models

use serde::{Deserialize, Serialize};

/// Operator account. PINs are stored as entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub username: String,
    pub pin: String,
}

/// Product formulation and its pressing targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Blend {
    pub code: String,
    pub product: String,
    /// Thousands of tablets per production unit
    pub tablets_amount: i64,
    pub kilos_to_produce: f64,
    pub tablet_size: String,
    pub tablet_weight: f64,
}

impl Blend {
    /// Only blends with a positive tablet weight may be selected for pressing
    pub fn is_selectable(&self) -> bool {
        self.tablet_weight > 0.0
    }
}

/// Reference photo recorded for one lot of a blend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LotImage {
    pub blend_code: String,
    pub lot_number: i64,
    /// Local path or server URL of the image
    pub image_path: String,
    /// Initials of the confirming supervisor; empty until confirmed
    pub confirmed_by: String,
}

impl LotImage {
    pub fn is_confirmed(&self) -> bool {
        !self.confirmed_by.is_empty()
    }
}
