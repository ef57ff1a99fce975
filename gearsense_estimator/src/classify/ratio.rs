//! Ratio-based primary classifier.
//!
//! Back-computes the total transmission ratio from engine and wheel speed:
//!
//! ```text
//! ratio = (rpm · 2π/60 · tire_radius) / (speed_mps · final_drive_ratio)
//! ```
//!
//! and snaps it to the closest ratio-table entry. The candidate is accepted
//! only when the residual stays inside a speed-dependent tolerance: the
//! wheel-speed signal is heavily quantized at parking speeds, so the
//! tolerance relaxes there and tightens on the open road. A rejected
//! candidate degrades to the bare selector letter, never to a wrong digit.

use super::{ClassifySample, apply_snow_floor, stationary_label};
use crate::config::EstimatorConfig;
use gearsense_common::consts::{
    RATIO_TOLERANCE_HIGH, RATIO_TOLERANCE_LOW, RATIO_TOLERANCE_LOW_BELOW_KMH, RATIO_TOLERANCE_MID,
    RATIO_TOLERANCE_MID_BELOW_KMH,
};
use gearsense_common::gear::{GearLabel, GearNumber};
use std::f32::consts::PI;

/// Acceptance tolerance on the ratio residual for a given road speed.
#[inline]
pub fn ratio_tolerance(speed_kmh: f32) -> f32 {
    if speed_kmh < RATIO_TOLERANCE_LOW_BELOW_KMH {
        RATIO_TOLERANCE_LOW
    } else if speed_kmh < RATIO_TOLERANCE_MID_BELOW_KMH {
        RATIO_TOLERANCE_MID
    } else {
        RATIO_TOLERANCE_HIGH
    }
}

/// The implied total gear ratio for a moving sample.
///
/// Callers must rule out the stationary case first; the division is only
/// defined for speed above the stationary threshold.
#[inline]
pub fn implied_ratio(sample: &ClassifySample, cfg: &EstimatorConfig) -> f32 {
    let speed_mps = sample.speed_kmh / 3.6;
    let engine_rad_per_s = sample.rpm * (2.0 * PI / 60.0);
    (engine_rad_per_s * cfg.vehicle.tire_radius_m()) / (speed_mps * cfg.vehicle.final_drive_ratio)
}

/// Classify by implied gear ratio.
pub fn classify_by_ratio(sample: &ClassifySample, cfg: &EstimatorConfig) -> GearLabel {
    if sample.stationary(cfg) {
        return stationary_label(sample);
    }

    // Snow launch: below the creep window the box holds second gear
    // regardless of what the ratio math would say.
    if sample.snow_creep(cfg) {
        return GearLabel::Drive(Some(GearNumber::SECOND));
    }

    let ratio = implied_ratio(sample, cfg);

    let mut best_index = 0usize;
    let mut best_diff = f32::MAX;
    for (i, table_ratio) in cfg.vehicle.gear_ratios.iter().enumerate() {
        let diff = (ratio - table_ratio).abs();
        if diff < best_diff {
            best_diff = diff;
            best_index = i;
        }
    }

    // best_index is in range by construction; GEAR_RATIOS has 8 entries.
    let Some(candidate) = GearNumber::new(best_index as u8 + 1) else {
        return GearLabel::from_position(sample.position);
    };
    let candidate = apply_snow_floor(sample, candidate);

    let residual = (ratio - cfg.vehicle.gear_ratios[(candidate.get() - 1) as usize]).abs();
    if residual < ratio_tolerance(sample.speed_kmh) {
        GearLabel::from_position(sample.position).with_number(candidate)
    } else {
        GearLabel::from_position(sample.position)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
