//! Gear classification root.
//!
//! Two independent classifiers over the same sample: the ratio-based
//! primary ([`ratio`]) and the speed/rpm range-table backup ([`range`]).
//! Both share the stationary branch and the snow-mode gear-1 lockout.

pub mod range;
pub mod ratio;

use crate::config::EstimatorConfig;
use gearsense_common::gear::{DriveMode, GearLabel, GearNumber, GearPosition};

/// One classification input: the estimator's last-known sensor values.
#[derive(Debug, Clone, Copy)]
pub struct ClassifySample {
    pub speed_kmh: f32,
    pub rpm: f32,
    pub position: GearPosition,
    pub mode: DriveMode,
    /// Transient snow override: a drive-mode or stationary transition may
    /// force snow handling for one recompute before the mode field settles.
    pub force_snow: bool,
}

impl ClassifySample {
    /// Snow handling applies when the mode says so or the caller forces it.
    #[inline]
    pub fn snow(&self) -> bool {
        self.mode == DriveMode::Snow || self.force_snow
    }

    /// Vehicle effectively stationary (guards the ratio division).
    #[inline]
    pub fn stationary(&self, cfg: &EstimatorConfig) -> bool {
        self.speed_kmh <= cfg.stationary_speed_kmh || self.rpm <= cfg.stationary_rpm
    }

    /// Snow creep window: rolling, but slow enough that Snow+D pins to D2.
    #[inline]
    pub fn snow_creep(&self, cfg: &EstimatorConfig) -> bool {
        self.snow()
            && self.position == GearPosition::Drive
            && self.speed_kmh < cfg.snow_creep_speed_kmh
            && self.rpm < cfg.snow_creep_rpm
    }
}

/// The label for a stationary vehicle: D shows its launch gear (D2 in snow,
/// D1 otherwise), M shows the bare letter, everything else shows the raw
/// selector position unchanged.
pub fn stationary_label(sample: &ClassifySample) -> GearLabel {
    match sample.position {
        GearPosition::Drive if sample.snow() => GearLabel::Drive(Some(GearNumber::SECOND)),
        GearPosition::Drive => GearLabel::Drive(Some(GearNumber::FIRST)),
        position => GearLabel::from_position(position),
    }
}

/// Clamp a candidate gear for snow mode (never first gear).
#[inline]
pub fn apply_snow_floor(sample: &ClassifySample, number: GearNumber) -> GearNumber {
    if sample.snow() { number.snow_floor() } else { number }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(position: GearPosition, mode: DriveMode) -> ClassifySample {
        ClassifySample {
            speed_kmh: 0.0,
            rpm: 0.0,
            position,
            mode,
            force_snow: false,
        }
    }

    #[test]
    fn stationary_drive_comfort_is_d1() {
        let s = sample(GearPosition::Drive, DriveMode::Comfort);
        assert_eq!(stationary_label(&s).to_string(), "D1");
    }

    #[test]
    fn stationary_drive_snow_is_d2() {
        let s = sample(GearPosition::Drive, DriveMode::Snow);
        assert_eq!(stationary_label(&s).to_string(), "D2");
    }

    #[test]
    fn stationary_forced_snow_is_d2() {
        let mut s = sample(GearPosition::Drive, DriveMode::Comfort);
        s.force_snow = true;
        assert_eq!(stationary_label(&s).to_string(), "D2");
    }

    #[test]
    fn stationary_manual_is_bare_letter() {
        let s = sample(GearPosition::Manual, DriveMode::Comfort);
        assert_eq!(stationary_label(&s).to_string(), "M");
    }

    #[test]
    fn stationary_park_reverse_neutral_unchanged() {
        for (position, expect) in [
            (GearPosition::Park, "P"),
            (GearPosition::Reverse, "R"),
            (GearPosition::Neutral, "N"),
        ] {
            let s = sample(position, DriveMode::Snow);
            assert_eq!(stationary_label(&s).to_string(), expect);
        }
    }
}
