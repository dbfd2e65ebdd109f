//! Blend specification sheet (`blend_data.csv`)
//!
//! The file is a spreadsheet export with fixed column headers:
//! `Code, PRODUCT, Tablets Amount, Kilos to Produce, Tablet Size, Tablet weight`.
//! Other columns are ignored. Numeric cells that are empty or unparsable
//! are read as zero, matching how the sheet has always been loaded.

use crate::models::Blend;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Default file name of the blend sheet
pub const BLEND_SHEET_FILE: &str = "blend_data.csv";

const SHEET_HEADERS: [&str; 6] = [
    "Code",
    "PRODUCT",
    "Tablets Amount",
    "Kilos to Produce",
    "Tablet Size",
    "Tablet weight",
];

const REQUIRED_HEADERS: [&str; 2] = ["Code", "PRODUCT"];

/// One spreadsheet row, as text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlendRow {
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "PRODUCT", default)]
    pub product: String,
    #[serde(rename = "Tablets Amount", default)]
    pub tablets_amount: String,
    #[serde(rename = "Kilos to Produce", default)]
    pub kilos_to_produce: String,
    #[serde(rename = "Tablet Size", default)]
    pub tablet_size: String,
    #[serde(rename = "Tablet weight", default)]
    pub tablet_weight: String,
}

impl BlendRow {
    /// Convert to a blend, or `None` when the row has no code
    pub fn into_blend(self) -> Option<Blend> {
        let code = self.code.trim().to_string();
        if code.is_empty() {
            return None;
        }

        Some(Blend {
            tablets_amount: lenient_int(&self.tablets_amount, "Tablets Amount", &code),
            kilos_to_produce: lenient_float(&self.kilos_to_produce, "Kilos to Produce", &code),
            tablet_weight: lenient_float(&self.tablet_weight, "Tablet weight", &code),
            product: self.product.trim().to_string(),
            tablet_size: self.tablet_size.trim().to_string(),
            code,
        })
    }
}

impl From<&Blend> for BlendRow {
    fn from(blend: &Blend) -> Self {
        Self {
            code: blend.code.clone(),
            product: blend.product.clone(),
            tablets_amount: blend.tablets_amount.to_string(),
            kilos_to_produce: blend.kilos_to_produce.to_string(),
            tablet_size: blend.tablet_size.clone(),
            tablet_weight: blend.tablet_weight.to_string(),
        }
    }
}

fn lenient_int(raw: &str, column: &str, code: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }
    raw.parse().unwrap_or_else(|_| {
        debug!("{}: unreadable {} '{}', using 0", code, column, raw);
        0
    })
}

fn lenient_float(raw: &str, column: &str, code: &str) -> f64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0.0;
    }
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            debug!("{}: unreadable {} '{}', using 0", code, column, raw);
            0.0
        }
    }
}

/// Read every blend row from a CSV stream, skipping rows without a code
pub fn read_blends_from<R: Read>(reader: R) -> Result<Vec<Blend>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for required in REQUIRED_HEADERS {
        if !headers.iter().any(|h| h == required) {
            return Err(Error::InvalidInput(format!(
                "blend sheet is missing the '{}' column",
                required
            )));
        }
    }

    let mut blends = Vec::new();
    for (index, row) in csv_reader.deserialize::<BlendRow>().enumerate() {
        // Header is line 1
        let line = index + 2;
        match row?.into_blend() {
            Some(blend) => blends.push(blend),
            None => warn!("Skipping blend sheet line {}: empty Code", line),
        }
    }
    Ok(blends)
}

/// Read the blend sheet at `path`
pub fn read_blends(path: &Path) -> Result<Vec<Blend>> {
    let file = std::fs::File::open(path)?;
    read_blends_from(file)
}

/// Write blends in the spreadsheet export layout
pub fn write_blends_to<W: Write>(writer: W, blends: &[Blend]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(SHEET_HEADERS)?;
    for blend in blends {
        csv_writer.serialize(BlendRow::from(blend))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Replace the blend sheet at `path`
pub fn write_blends(path: &Path, blends: &[Blend]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_blends_to(file, blends)
}
