//! Downshift-transient detection.
//!
//! During braking the box drops gears while engine speed holds or rises,
//! a window where ratio classification swings fast. While the hypothesis
//! is open, recomputation bypasses the rate limiter so the display tracks
//! the shift instead of trailing it by a tick.

use crate::config::DownshiftConfig;
use tracing::debug;

/// Tracks the "currently downshifting" hypothesis.
#[derive(Debug, Clone)]
pub struct DownshiftDetector {
    cfg: DownshiftConfig,
    active: bool,
    /// When the hypothesis opened [ms].
    started_at_ms: u64,
    /// Vehicle state when the hypothesis opened.
    speed_at_start_kmh: f32,
    rpm_at_start: f32,
}

impl DownshiftDetector {
    pub fn new(cfg: DownshiftConfig) -> Self {
        Self {
            cfg,
            active: false,
            started_at_ms: 0,
            speed_at_start_kmh: 0.0,
            rpm_at_start: 0.0,
        }
    }

    /// Feed an old→new speed/rpm observation.
    ///
    /// Opens the hypothesis on marked deceleration with flat-or-rising rpm
    /// (`old_rpm == 0` counts as "no prior rpm" and does not veto); closes
    /// it on speed recovery or a clear rpm drop.
    pub fn update(
        &mut self,
        old_speed_kmh: f32,
        new_speed_kmh: f32,
        old_rpm: f32,
        new_rpm: f32,
        now_ms: u64,
    ) {
        let decelerating = new_speed_kmh < old_speed_kmh - self.cfg.speed_drop_kmh;
        let rpm_flat_or_rising = new_rpm >= old_rpm - self.cfg.rpm_flat_tolerance || old_rpm == 0.0;

        if decelerating && rpm_flat_or_rising {
            if !self.is_active(now_ms) {
                self.active = true;
                self.started_at_ms = now_ms;
                self.speed_at_start_kmh = old_speed_kmh;
                self.rpm_at_start = if old_rpm > 0.0 { old_rpm } else { new_rpm };
                debug!(
                    speed_kmh = self.speed_at_start_kmh,
                    rpm = self.rpm_at_start,
                    "downshift hypothesis opened"
                );
            }
        } else if new_speed_kmh > old_speed_kmh + self.cfg.speed_rise_clear_kmh
            || new_rpm < old_rpm - self.cfg.rpm_drop_clear
        {
            if self.active {
                debug!("downshift hypothesis closed");
            }
            self.clear();
        }
    }

    /// Whether the hypothesis is open at `now_ms` (expired ones count as
    /// closed).
    #[inline]
    pub fn is_active(&self, now_ms: u64) -> bool {
        self.active && now_ms.saturating_sub(self.started_at_ms) <= self.cfg.timeout_ms
    }

    /// Force-close the hypothesis (selector position changed).
    pub fn clear(&mut self) {
        self.active = false;
        self.started_at_ms = 0;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> DownshiftDetector {
        DownshiftDetector::new(DownshiftConfig::default())
    }

    #[test]
    fn braking_with_rising_rpm_opens() {
        let mut d = detector();
        d.update(80.0, 40.0, 1800.0, 2400.0, 1000);
        assert!(d.is_active(1000));
    }

    #[test]
    fn braking_with_flat_rpm_opens() {
        let mut d = detector();
        d.update(60.0, 50.0, 2000.0, 1950.0, 1000);
        assert!(d.is_active(1000));
    }

    #[test]
    fn mild_deceleration_does_not_open() {
        let mut d = detector();
        d.update(60.0, 58.0, 2000.0, 2000.0, 1000);
        assert!(!d.is_active(1000));
    }

    #[test]
    fn braking_with_falling_rpm_does_not_open() {
        // Coasting down in-gear: speed and rpm fall together.
        let mut d = detector();
        d.update(60.0, 50.0, 2200.0, 1900.0, 1000);
        assert!(!d.is_active(1000));
    }

    #[test]
    fn no_prior_rpm_does_not_veto() {
        let mut d = detector();
        d.update(60.0, 50.0, 0.0, 0.0, 1000);
        assert!(d.is_active(1000));
    }

    #[test]
    fn speed_recovery_closes() {
        let mut d = detector();
        d.update(80.0, 40.0, 1800.0, 2400.0, 1000);
        d.update(40.0, 42.0, 2400.0, 2400.0, 1100);
        assert!(!d.is_active(1100));
    }

    #[test]
    fn rpm_drop_closes() {
        let mut d = detector();
        d.update(80.0, 40.0, 1800.0, 2400.0, 1000);
        d.update(40.0, 40.0, 2400.0, 2100.0, 1100);
        assert!(!d.is_active(1100));
    }

    #[test]
    fn hypothesis_expires() {
        let mut d = detector();
        d.update(80.0, 40.0, 1800.0, 2400.0, 1000);
        assert!(d.is_active(1500));
        assert!(!d.is_active(1501));
    }

    #[test]
    fn reopens_after_expiry() {
        let mut d = detector();
        d.update(80.0, 40.0, 1800.0, 2400.0, 1000);
        assert!(!d.is_active(2000));
        d.update(40.0, 30.0, 2400.0, 2500.0, 2000);
        assert!(d.is_active(2000));
    }
}
