//! The gear estimator state machine.
//!
//! Owns every piece of mutable estimation state and applies one event at a
//! time: sensor callbacks, drive-mode changes, and the periodic tick all
//! funnel into [`GearEstimator::apply`] / [`GearEstimator::tick`] on a
//! single execution context. Each application may produce at most one
//! output (the new display label), and only when it actually changed.
//!
//! Timing is caller-supplied monotonic milliseconds; the estimator itself
//! never reads a clock, so rate limiting and the downshift timeout are
//! fully deterministic under test.

use crate::classify::range::classify_by_range;
use crate::classify::ratio::classify_by_ratio;
use crate::classify::{ClassifySample, stationary_label};
use crate::config::EstimatorConfig;
use crate::downshift::DownshiftDetector;
use crate::smooth::GearSmoother;
use gearsense_common::gear::{DriveMode, GearLabel, GearNumber, GearPosition};
use tracing::debug;

/// One discrete input to the estimator.
///
/// The platform delivers these independently and asynchronously; the
/// estimator reuses the last-known value of every field an event does not
/// carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorEvent {
    /// Road speed [km/h], unit-converted upstream.
    Speed(f32),
    /// Engine speed [rpm].
    Rpm(f32),
    /// Transmission selector position.
    Gear(GearPosition),
    /// Drive-mode selector.
    DriveMode(DriveMode),
}

/// Gear inference state machine.
#[derive(Debug)]
pub struct GearEstimator {
    cfg: EstimatorConfig,

    // ── Last-known sensor values ──
    last_speed_kmh: f32,
    last_rpm: f32,
    position: GearPosition,
    mode: DriveMode,

    // ── Output state ──
    /// Last label handed to the sink.
    last_emitted: GearLabel,
    /// Wall clock of the last recompute that actually ran [ms].
    last_recompute_ms: Option<u64>,
    /// The first periodic tick computes immediately instead of waiting out
    /// the rate limiter.
    first_tick_done: bool,
    /// Gear-change log throttle.
    last_log_ms: Option<u64>,

    smoother: GearSmoother,
    downshift: DownshiftDetector,
}

impl GearEstimator {
    pub fn new(cfg: EstimatorConfig) -> Self {
        let downshift = DownshiftDetector::new(cfg.downshift.clone());
        Self {
            last_speed_kmh: 0.0,
            last_rpm: 0.0,
            position: GearPosition::Park,
            mode: DriveMode::Unknown,
            last_emitted: GearLabel::Park,
            last_recompute_ms: None,
            first_tick_done: false,
            last_log_ms: None,
            smoother: GearSmoother::new(GearLabel::Park),
            downshift,
            cfg,
        }
    }

    /// Current selector position.
    #[inline]
    pub fn position(&self) -> GearPosition {
        self.position
    }

    /// Current drive mode.
    #[inline]
    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    /// Last label handed to the sink.
    #[inline]
    pub fn current_label(&self) -> GearLabel {
        self.last_emitted
    }

    /// Whether a downshift hypothesis is open at `now_ms`.
    #[inline]
    pub fn downshift_active(&self, now_ms: u64) -> bool {
        self.downshift.is_active(now_ms)
    }

    // ── Event application ───────────────────────────────────────────

    /// Apply one sensor event. Returns the new display label if it changed.
    pub fn apply(&mut self, event: SensorEvent, now_ms: u64) -> Option<GearLabel> {
        match event {
            SensorEvent::Speed(kmh) => self.on_speed(kmh, now_ms),
            SensorEvent::Rpm(rpm) => self.on_rpm(rpm, now_ms),
            SensorEvent::Gear(position) => self.on_gear(position, now_ms),
            SensorEvent::DriveMode(mode) => self.on_drive_mode(mode, now_ms),
        }
    }

    /// Periodic 50 ms tick. Computes only while the selector is in D/M
    /// (P/R/N need no synthesis); the first tick bypasses the rate limiter
    /// so a fresh estimator publishes without waiting.
    pub fn tick(&mut self, now_ms: u64) -> Option<GearLabel> {
        if !self.position.is_rolling() {
            return None;
        }
        let forced = !self.first_tick_done;
        self.first_tick_done = true;
        self.recompute(now_ms, forced, false)
    }

    /// The combined single-operation surface: update all four inputs from
    /// one sample, then recompute once. Transitions observed in the sample
    /// (selector, mode, stationary/moving boundary, open downshift) force
    /// the recompute past the rate limiter.
    pub fn on_sample(
        &mut self,
        speed_kmh: f32,
        rpm: f32,
        position: GearPosition,
        mode: DriveMode,
        now_ms: u64,
    ) -> Option<GearLabel> {
        let gear_changed = position != self.position;
        let mode_changed = mode != self.mode;
        let old_speed = self.last_speed_kmh;
        let old_rpm = self.last_rpm;

        self.last_speed_kmh = speed_kmh;
        self.last_rpm = rpm;
        if gear_changed {
            self.position = position;
            self.downshift.clear();
            self.smoother.reset();
        }
        if mode_changed {
            self.mode = mode;
        }

        let crossed_stationary = self.crossed_stationary(old_speed, speed_kmh);
        if !gear_changed && self.position.is_rolling() {
            self.downshift.update(old_speed, speed_kmh, old_rpm, rpm, now_ms);
        }

        let forced = gear_changed
            || mode_changed
            || crossed_stationary
            || self.downshift.is_active(now_ms);
        let force_snow = (mode_changed && mode == DriveMode::Snow)
            || (crossed_stationary && self.snow_stop_pending(speed_kmh));
        self.recompute(now_ms, forced, force_snow)
    }

    fn on_speed(&mut self, speed_kmh: f32, now_ms: u64) -> Option<GearLabel> {
        let old_speed = self.last_speed_kmh;
        self.last_speed_kmh = speed_kmh;

        // Stationary/moving boundary always forces a recompute; coming to a
        // halt in Snow+D must pin the launch gear immediately.
        if self.crossed_stationary(old_speed, speed_kmh) {
            let force_snow = self.snow_stop_pending(speed_kmh);
            return self.recompute(now_ms, true, force_snow);
        }

        if (old_speed - speed_kmh).abs() > self.cfg.speed_event_threshold_kmh
            && self.position.is_rolling()
        {
            self.downshift
                .update(old_speed, speed_kmh, self.last_rpm, self.last_rpm, now_ms);
            let forced = self.downshift.is_active(now_ms);
            return self.recompute(now_ms, forced, false);
        }
        None
    }

    fn on_rpm(&mut self, rpm: f32, now_ms: u64) -> Option<GearLabel> {
        let old_rpm = self.last_rpm;
        self.last_rpm = rpm;

        if (old_rpm - rpm).abs() > self.cfg.rpm_event_threshold && self.position.is_rolling() {
            self.downshift
                .update(self.last_speed_kmh, self.last_speed_kmh, old_rpm, rpm, now_ms);
            let forced = self.downshift.is_active(now_ms);
            return self.recompute(now_ms, forced, false);
        }
        None
    }

    fn on_gear(&mut self, position: GearPosition, now_ms: u64) -> Option<GearLabel> {
        if position == self.position {
            return None;
        }
        self.position = position;
        // Old votes are for a different selector letter; the downshift
        // hypothesis belonged to the old gear train state.
        self.downshift.clear();
        self.smoother.reset();
        self.recompute(now_ms, true, false)
    }

    fn on_drive_mode(&mut self, mode: DriveMode, now_ms: u64) -> Option<GearLabel> {
        if mode == self.mode {
            return None;
        }
        self.mode = mode;
        self.recompute(now_ms, true, mode == DriveMode::Snow)
    }

    // ── Recompute pipeline ──────────────────────────────────────────

    /// Run the classification pipeline.
    ///
    /// Non-forced recomputes are rate-limited; forced ones (selector or
    /// mode transition, stationary boundary, open downshift, first tick)
    /// always run. Returns the new label only when it differs from the
    /// last emitted one.
    fn recompute(&mut self, now_ms: u64, forced: bool, force_snow: bool) -> Option<GearLabel> {
        if !forced {
            if let Some(last) = self.last_recompute_ms {
                if now_ms.saturating_sub(last) < self.cfg.recompute_min_interval_ms {
                    return None;
                }
            }
        }
        self.last_recompute_ms = Some(now_ms);

        let sample = ClassifySample {
            speed_kmh: self.last_speed_kmh,
            rpm: self.last_rpm,
            position: self.position,
            mode: self.mode,
            force_snow,
        };

        // Stationary fast path for D/M: the launch label bypasses smoothing
        // so a mode flip lands on the dashboard in the same recompute. When
        // the label is already current, fall through to the full pipeline
        // so the history keeps tracking the stationary label.
        if self.last_speed_kmh <= self.cfg.stationary_speed_kmh && self.position.is_rolling() {
            let label = stationary_label(&sample);
            if label != self.last_emitted {
                return Some(self.emit(label, now_ms));
            }
        }

        let primary = classify_by_ratio(&sample, &self.cfg);
        let backup = classify_by_range(&sample, &self.cfg);
        let reconciled = self.reconcile(primary, backup);
        let overridden = self.stationary_override(reconciled, &sample);
        let smoothed = self.smoother.push(overridden);

        if smoothed != self.last_emitted {
            Some(self.emit(smoothed, now_ms))
        } else {
            None
        }
    }

    /// Prefer the backup result only when the primary degraded to the bare
    /// selector letter while the backup committed to a number. The backup
    /// stays defined in the idle/transition rpm bands where the ratio math
    /// rejects its candidate.
    fn reconcile(&self, primary: GearLabel, backup: GearLabel) -> GearLabel {
        if primary == backup {
            return primary;
        }
        let bare = GearLabel::from_position(self.position);
        if primary == bare && backup != bare {
            backup
        } else {
            primary
        }
    }

    /// Guard the parked-in-D display: while stationary in D the label is
    /// pinned to the launch gear (D2 under snow) and spurious P/R/N results
    /// from the classifiers are overridden to D1.
    fn stationary_override(&self, label: GearLabel, sample: &ClassifySample) -> GearLabel {
        if self.position != GearPosition::Drive
            || self.last_speed_kmh > self.cfg.stationary_speed_kmh
        {
            return label;
        }
        if sample.snow() {
            GearLabel::Drive(Some(GearNumber::SECOND))
        } else if matches!(
            label,
            GearLabel::Park | GearLabel::Reverse | GearLabel::Neutral
        ) {
            GearLabel::Drive(Some(GearNumber::FIRST))
        } else {
            label
        }
    }

    fn emit(&mut self, label: GearLabel, now_ms: u64) -> GearLabel {
        self.last_emitted = label;
        // Numbered labels churn during normal driving; throttle their logs.
        let due = self
            .last_log_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= self.cfg.gear_log_interval_ms);
        if label.number().is_none() || due {
            debug!(
                %label,
                speed_kmh = self.last_speed_kmh,
                rpm = self.last_rpm,
                "gear label changed"
            );
            self.last_log_ms = Some(now_ms);
        }
        label
    }

    // ── Helpers ─────────────────────────────────────────────────────

    /// Did the speed cross the stationary boundary in either direction?
    fn crossed_stationary(&self, old_speed: f32, new_speed: f32) -> bool {
        (old_speed > self.cfg.stationary_speed_kmh) != (new_speed > self.cfg.stationary_speed_kmh)
    }

    /// Just came to a halt in Snow+D: the recompute must treat this as a
    /// snow recompute even before the mode field is re-read.
    fn snow_stop_pending(&self, new_speed: f32) -> bool {
        new_speed <= self.cfg.stationary_speed_kmh
            && self.position == GearPosition::Drive
            && self.mode == DriveMode::Snow
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> GearEstimator {
        GearEstimator::new(EstimatorConfig::default())
    }

    #[test]
    fn initial_state() {
        let e = estimator();
        assert_eq!(e.position(), GearPosition::Park);
        assert_eq!(e.mode(), DriveMode::Unknown);
        assert_eq!(e.current_label(), GearLabel::Park);
    }

    #[test]
    fn gear_event_emits_letter() {
        let mut e = estimator();
        let out = e.apply(SensorEvent::Gear(GearPosition::Reverse), 0);
        assert_eq!(out.map(|l| l.to_string()), Some("R".to_string()));
    }

    #[test]
    fn repeated_gear_event_is_noop() {
        let mut e = estimator();
        e.apply(SensorEvent::Gear(GearPosition::Reverse), 0);
        assert_eq!(e.apply(SensorEvent::Gear(GearPosition::Reverse), 10), None);
    }

    #[test]
    fn tick_is_silent_outside_drive_manual() {
        let mut e = estimator();
        assert_eq!(e.tick(0), None);
        assert_eq!(e.tick(60), None);
    }

    #[test]
    fn drive_at_standstill_shows_launch_gear() {
        let mut e = estimator();
        e.apply(SensorEvent::DriveMode(DriveMode::Comfort), 0);
        let out = e.apply(SensorEvent::Gear(GearPosition::Drive), 10);
        assert_eq!(out.map(|l| l.to_string()), Some("D1".to_string()));
    }

    #[test]
    fn snow_switch_while_parked_in_drive_repins() {
        let mut e = estimator();
        e.apply(SensorEvent::DriveMode(DriveMode::Comfort), 0);
        e.apply(SensorEvent::Gear(GearPosition::Drive), 10);
        // Mode change forces the recompute inside the same 50 ms window.
        let out = e.apply(SensorEvent::DriveMode(DriveMode::Snow), 20);
        assert_eq!(out.map(|l| l.to_string()), Some("D2".to_string()));
    }

    #[test]
    fn rate_limiter_skips_close_nonforced_recomputes() {
        let mut e = estimator();
        e.on_sample(45.0, 2200.0, GearPosition::Drive, DriveMode::Comfort, 0);
        // Within 50 ms, no transition in the sample: skipped.
        assert_eq!(
            e.on_sample(46.0, 2230.0, GearPosition::Drive, DriveMode::Comfort, 10),
            None
        );
    }

    #[test]
    fn unknown_position_classifies_as_manual() {
        let mut e = estimator();
        let pos = GearPosition::from_raw(0x7FFF);
        e.on_sample(0.0, 0.0, pos, DriveMode::Comfort, 0);
        assert_eq!(e.current_label().to_string(), "M");
    }

    #[test]
    fn reconcile_prefers_specific_backup() {
        let e = estimator();
        // Estimator starts in Park; craft labels directly.
        let bare = GearLabel::Park;
        let specific = GearLabel::Drive(Some(GearNumber::SECOND));
        assert_eq!(e.reconcile(bare, specific), specific);
        assert_eq!(e.reconcile(specific, bare), specific);
    }
}
