//! Text rendering of blend specs and lot captions

use crate::station::BlendView;
use qc_common::{Blend, LotImage};
use std::fmt::Write;

/// Label/value pairs of the blend spec panel, in display order
///
/// Tablets Amount is stored in thousands and shown as a tablet count,
/// clamped to the `i64` range for out-of-range spreadsheet values.
pub fn blend_info_lines(blend: &Blend) -> Vec<(&'static str, String)> {
    vec![
        ("Product", blend.product.clone()),
        ("Tablets Amount", blend.tablets_amount.saturating_mul(1000).to_string()),
        ("Kilos to Produce", blend.kilos_to_produce.to_string()),
        ("Tablet Size", blend.tablet_size.clone()),
        ("Tablet weight", blend.tablet_weight.to_string()),
    ]
}

/// Caption for a previous lot's reference image
pub fn past_caption(lot_number: i64) -> String {
    format!("PAST (Lot {})", lot_number)
}

/// Caption for the image just uploaded
pub fn current_caption(lot_number: i64) -> String {
    format!("CURRENT ({})", lot_number)
}

pub fn confirmation_status(lot: &LotImage) -> String {
    if lot.is_confirmed() {
        format!("confirmed by {}", lot.confirmed_by)
    } else {
        "not confirmed".to_string()
    }
}

/// Full blend screen as plain text
pub fn render_blend_view(view: &BlendView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Blend {}", view.blend.code);
    for (label, value) in blend_info_lines(&view.blend) {
        let _ = writeln!(out, "  {}: {}", label, value);
    }

    match &view.latest {
        Some(lot) => {
            let _ = writeln!(
                out,
                "{}: {} [{}]",
                past_caption(lot.lot_number),
                lot.image_path,
                confirmation_status(lot)
            );
        }
        None => {
            let _ = writeln!(out, "No past lot image found for this blend.");
        }
    }

    if view.lots.is_empty() {
        let _ = writeln!(out, "Lots: No lots available");
    } else {
        let lots: Vec<String> = view.lots.iter().map(i64::to_string).collect();
        let _ = writeln!(out, "Lots: {}", lots.join(", "));
    }
    out
}
