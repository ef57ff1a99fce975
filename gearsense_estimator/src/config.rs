//! Estimator configuration: timing, thresholds, and vehicle parameters.
//!
//! Every tunable defaults to the stock values in
//! [`gearsense_common::consts`]; a TOML file only needs to name what it
//! overrides. `validate()` rejects configurations the classifier cannot
//! work with (non-monotonic ratio tables, zero intervals).

use gearsense_common::config::{ConfigError, ConfigLoader, SharedConfig};
use gearsense_common::consts;
use gearsense_common::gear::GearNumber;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Drivetrain parameters used by the ratio classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleParams {
    /// Final drive ratio between transmission output and wheels.
    pub final_drive_ratio: f32,
    /// Tire width [mm].
    pub tire_width_mm: f32,
    /// Tire aspect ratio (sidewall height / width).
    pub tire_aspect_ratio: f32,
    /// Rim diameter [inch].
    pub rim_diameter_in: f32,
    /// Transmission ratios, index 0 = first gear, strictly decreasing.
    pub gear_ratios: [f32; 8],
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            final_drive_ratio: consts::FINAL_DRIVE_RATIO,
            tire_width_mm: consts::TIRE_WIDTH_MM,
            tire_aspect_ratio: consts::TIRE_ASPECT_RATIO,
            rim_diameter_in: consts::RIM_DIAMETER_IN,
            gear_ratios: consts::GEAR_RATIOS,
        }
    }
}

impl VehicleParams {
    /// Tire radius [m] from the sidewall-height formula.
    #[inline]
    pub fn tire_radius_m(&self) -> f32 {
        consts::tire_radius_m(self.tire_width_mm, self.tire_aspect_ratio, self.rim_diameter_in)
    }

    /// Engine speed [rpm] implied by a road speed in a given gear, the
    /// inverse of the classifier's ratio computation. Used by the simulated
    /// drive source and the tests to stay exactly on-ratio.
    pub fn engine_rpm_for(&self, speed_kmh: f32, gear: GearNumber) -> f32 {
        let ratio = self.gear_ratios[(gear.get() - 1) as usize];
        let speed_mps = speed_kmh / 3.6;
        let wheel_rad_per_s = speed_mps * self.final_drive_ratio / self.tire_radius_m();
        ratio * wheel_rad_per_s * 60.0 / (2.0 * std::f32::consts::PI)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.final_drive_ratio <= 0.0 {
            return Err(ConfigError::ValidationError(
                "final_drive_ratio must be positive".to_string(),
            ));
        }
        if self.tire_width_mm <= 0.0 || self.tire_aspect_ratio <= 0.0 || self.rim_diameter_in <= 0.0
        {
            return Err(ConfigError::ValidationError(
                "tire geometry must be positive".to_string(),
            ));
        }
        for pair in self.gear_ratios.windows(2) {
            if pair[0] <= pair[1] {
                return Err(ConfigError::ValidationError(format!(
                    "gear_ratios must be strictly decreasing ({} before {})",
                    pair[0], pair[1]
                )));
            }
        }
        if self.gear_ratios[self.gear_ratios.len() - 1] <= 0.0 {
            return Err(ConfigError::ValidationError(
                "gear_ratios must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Downshift-transient detection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownshiftConfig {
    /// Speed must drop by more than this [km/h] to open a hypothesis.
    pub speed_drop_kmh: f32,
    /// RPM may fall at most this much and still count as "flat or rising".
    pub rpm_flat_tolerance: f32,
    /// Speed recovering by more than this clears the hypothesis.
    pub speed_rise_clear_kmh: f32,
    /// RPM falling by more than this clears the hypothesis.
    pub rpm_drop_clear: f32,
    /// Hypothesis expires after this long [ms].
    pub timeout_ms: u64,
}

impl Default for DownshiftConfig {
    fn default() -> Self {
        Self {
            speed_drop_kmh: 3.0,
            rpm_flat_tolerance: 100.0,
            speed_rise_clear_kmh: 1.0,
            rpm_drop_clear: 200.0,
            timeout_ms: consts::DOWNSHIFT_TIMEOUT_MS,
        }
    }
}

/// Top-level estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub shared: SharedConfig,

    /// Periodic recompute tick while in D/M [ms].
    pub tick_interval_ms: u64,
    /// Minimum gap between non-forced recomputes [ms].
    pub recompute_min_interval_ms: u64,

    /// Below this speed the vehicle counts as stationary [km/h].
    pub stationary_speed_kmh: f32,
    /// Below this rpm the engine reading counts as absent.
    pub stationary_rpm: f32,

    /// Snow creep window: under both, Snow+D pins the display to D2.
    pub snow_creep_speed_kmh: f32,
    pub snow_creep_rpm: f32,

    /// Sensor deltas below these skip the event-driven recompute.
    pub speed_event_threshold_kmh: f32,
    pub rpm_event_threshold: f32,

    /// Gear-change log throttle [ms].
    pub gear_log_interval_ms: u64,

    /// SCHED_FIFO priority for the worker thread (requires the `rt`
    /// feature; ignored otherwise).
    pub rt_priority: Option<i32>,

    pub downshift: DownshiftConfig,
    pub vehicle: VehicleParams,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            tick_interval_ms: consts::TICK_INTERVAL_MS,
            recompute_min_interval_ms: consts::RECOMPUTE_MIN_INTERVAL_MS,
            stationary_speed_kmh: consts::STATIONARY_SPEED_KMH,
            stationary_rpm: consts::STATIONARY_RPM,
            snow_creep_speed_kmh: consts::SNOW_CREEP_SPEED_KMH,
            snow_creep_rpm: consts::SNOW_CREEP_RPM,
            speed_event_threshold_kmh: consts::SPEED_EVENT_THRESHOLD_KMH,
            rpm_event_threshold: consts::RPM_EVENT_THRESHOLD,
            gear_log_interval_ms: consts::GEAR_LOG_INTERVAL_MS,
            rt_priority: None,
            downshift: DownshiftConfig::default(),
            vehicle: VehicleParams::default(),
        }
    }
}

impl ConfigLoader for EstimatorConfig {}

impl EstimatorConfig {
    /// Load from TOML and validate.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let cfg = Self::load(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Semantic validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.vehicle.validate()?;
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "tick_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.stationary_speed_kmh <= 0.0 {
            return Err(ConfigError::ValidationError(
                "stationary_speed_kmh must be positive".to_string(),
            ));
        }
        if self.snow_creep_speed_kmh <= self.stationary_speed_kmh {
            return Err(ConfigError::ValidationError(
                "snow_creep_speed_kmh must exceed stationary_speed_kmh".to_string(),
            ));
        }
        if self.downshift.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "downshift.timeout_ms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_valid() {
        assert!(EstimatorConfig::default().validate().is_ok());
    }

    #[test]
    fn rpm_inverse_of_ratio() {
        let v = VehicleParams::default();
        // In sixth gear (ratio 1.0) at 100 km/h the engine turns ~2400 rpm.
        let rpm = v.engine_rpm_for(100.0, GearNumber::new(6).unwrap());
        assert!((2300.0..2550.0).contains(&rpm), "rpm = {rpm}");
    }

    #[test]
    fn non_decreasing_ratio_table_rejected() {
        let mut cfg = EstimatorConfig::default();
        cfg.vehicle.gear_ratios[3] = cfg.vehicle.gear_ratios[2];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_tick_rejected() {
        let cfg = EstimatorConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_overrides_only_named_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("estimator.toml");
        fs::write(
            &path,
            r#"
tick_interval_ms = 25

[shared]
service_name = "bench-rig"

[vehicle]
final_drive_ratio = 3.2
"#,
        )
        .unwrap();

        let cfg = EstimatorConfig::load_validated(&path).unwrap();
        assert_eq!(cfg.tick_interval_ms, 25);
        assert_eq!(cfg.shared.service_name, "bench-rig");
        assert!((cfg.vehicle.final_drive_ratio - 3.2).abs() < 1e-6);
        // Unnamed fields keep their defaults.
        assert_eq!(cfg.recompute_min_interval_ms, 50);
        assert_eq!(cfg.vehicle.gear_ratios, consts::GEAR_RATIOS);
    }
}
