//! Physical viewing geometry to on-screen pixel sizes.
//!
//! At 6 m a 5 arc-minute optotype is 8.73 mm tall. Every size in the kiosk is
//! derived from that reference, the viewing distance and the monitor's pixel
//! density.

pub mod row_size;

use serde::Serialize;

pub use row_size::RowSize;

/// Height in mm of a 5 arc-minute optotype viewed from 600 cm.
pub const FIVE_ARC_MINUTES_MM: f64 = 8.73;
/// Viewing distance the chart row sizes are calibrated for.
pub const REFERENCE_DISTANCE_CM: f64 = 600.0;

/// Ratio applied per size step.
pub const SIZE_STEP_RATIO: f64 = 1.05;
/// Sizes never shrink below one pixel.
pub const MIN_SIZE_PX: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalConfig {
    pub viewing_distance_cm: f64,
    pub screen_height_mm: f64,
    pub screen_height_px: u32,
    pub red_channel_value: u8,
    pub green_channel_value: u8,
}

impl PhysicalConfig {
    pub fn hex_red(&self) -> String {
        format!("#{:02x}0000", self.red_channel_value)
    }

    pub fn hex_green(&self) -> String {
        format!("#00{:02x}00", self.green_channel_value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedScale {
    pub pixels_per_mm: f64,
    pub distance_factor: f64,
    pub five_arc_minute_px: f64,
}

/// Derives the scale as one unit. Heights must be validated as positive
/// beforehand, a zero height yields `inf`/`NaN` here.
pub fn compute_derived_scale(config: &PhysicalConfig) -> DerivedScale {
    let pixels_per_mm = f64::from(config.screen_height_px) / config.screen_height_mm;
    DerivedScale {
        pixels_per_mm,
        distance_factor: config.viewing_distance_cm / REFERENCE_DISTANCE_CM,
        five_arc_minute_px: FIVE_ARC_MINUTES_MM * pixels_per_mm,
    }
}

/// Pixel height of a chart row. Unknown descriptors fall back to the
/// baseline row (decimal acuity 1.0).
pub fn pixel_size_for_row(row: &RowSize, scale: &DerivedScale) -> f64 {
    scale.five_arc_minute_px * scale.distance_factor / row.decimal_acuity()
}

/// Applies `steps` multiplicative size steps; negative steps shrink.
pub fn step_size(size_px: f64, steps: i32) -> f64 {
    (size_px * SIZE_STEP_RATIO.powi(steps)).max(MIN_SIZE_PX)
}
