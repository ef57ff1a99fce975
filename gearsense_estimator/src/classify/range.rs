//! Speed/rpm range-table backup classifier.
//!
//! Independent corroboration for the ratio classifier: a fixed lookup of
//! plausible (speed, rpm) windows per gear. The windows overlap on purpose
//! and the first match wins, so the result is a coarse but well-defined
//! answer in the idle and shift-transient bands where the ratio math
//! rejects its candidate.

use super::{ClassifySample, apply_snow_floor, stationary_label};
use crate::config::EstimatorConfig;
use gearsense_common::consts::GEAR_SPEED_RPM_RANGES;
use gearsense_common::gear::{GearLabel, GearNumber};

/// Classify by the speed/rpm window table.
pub fn classify_by_range(sample: &ClassifySample, cfg: &EstimatorConfig) -> GearLabel {
    if sample.stationary(cfg) {
        return stationary_label(sample);
    }

    if sample.snow_creep(cfg) {
        return GearLabel::Drive(Some(GearNumber::SECOND));
    }

    for (i, ((speed_lo, speed_hi), (rpm_lo, rpm_hi))) in
        GEAR_SPEED_RPM_RANGES.iter().enumerate()
    {
        let speed_ok = sample.speed_kmh >= *speed_lo && sample.speed_kmh <= *speed_hi;
        let rpm_ok = sample.rpm >= *rpm_lo && sample.rpm <= *rpm_hi;
        if speed_ok && rpm_ok {
            let Some(number) = GearNumber::new(i as u8 + 1) else {
                break;
            };
            let number = apply_snow_floor(sample, number);
            return GearLabel::from_position(sample.position).with_number(number);
        }
    }

    GearLabel::from_position(sample.position)
}

// ─── Tests ──────────────────────────────────────────────────────────
