//! System-wide constants for the gearsense workspace.
//!
//! Single source of truth for the drivetrain numbers and timing limits.
//! Imported by all crates; no duplication permitted.

use static_assertions::const_assert;

// ─── Drivetrain ─────────────────────────────────────────────────────

/// Transmission gear ratios, index 0 = first gear (8-speed automatic).
pub const GEAR_RATIOS: [f32; 8] = [5.25, 3.029, 1.95, 1.457, 1.221, 1.0, 0.809, 0.673];

/// Final drive ratio between transmission output and wheels.
pub const FINAL_DRIVE_RATIO: f32 = 3.329;

/// Tire specification 245/45 R20.
pub const TIRE_WIDTH_MM: f32 = 245.0;
pub const TIRE_ASPECT_RATIO: f32 = 0.45;
pub const RIM_DIAMETER_IN: f32 = 20.0;

/// Tire radius in meters from the sidewall-height formula.
pub const fn tire_radius_m(width_mm: f32, aspect_ratio: f32, rim_diameter_in: f32) -> f32 {
    let sidewall_mm = width_mm * aspect_ratio;
    let diameter_mm = rim_diameter_in * 25.4 + 2.0 * sidewall_mm;
    diameter_mm / 1000.0 / 2.0
}

/// Precomputed radius for the stock tire.
pub const TIRE_RADIUS_M: f32 = tire_radius_m(TIRE_WIDTH_MM, TIRE_ASPECT_RATIO, RIM_DIAMETER_IN);

/// Backup classification table: per gear (index 0 = first gear), the
/// plausible (speed km/h, rpm) window. Windows deliberately overlap; the
/// first matching entry wins.
pub const GEAR_SPEED_RPM_RANGES: [((f32, f32), (f32, f32)); 8] = [
    ((0.0, 30.0), (800.0, 3500.0)),
    ((15.0, 50.0), (1000.0, 3500.0)),
    ((25.0, 70.0), (1200.0, 3500.0)),
    ((40.0, 90.0), (1300.0, 3500.0)),
    ((50.0, 110.0), (1400.0, 3500.0)),
    ((60.0, 130.0), (1500.0, 3500.0)),
    ((70.0, 150.0), (1600.0, 3500.0)),
    ((80.0, 200.0), (1700.0, 3500.0)),
];

// ─── Classification thresholds ──────────────────────────────────────

/// Below this speed the vehicle counts as stationary.
pub const STATIONARY_SPEED_KMH: f32 = 0.5;

/// Below this rpm the engine reading counts as absent/implausible.
pub const STATIONARY_RPM: f32 = 0.1;

/// Snow-mode creep window: under these the display is pinned to second gear.
pub const SNOW_CREEP_SPEED_KMH: f32 = 10.0;
pub const SNOW_CREEP_RPM: f32 = 1500.0;

/// Ratio acceptance tolerance, relaxed at low speed where wheel-speed
/// quantization dominates.
pub const RATIO_TOLERANCE_LOW: f32 = 1.0; // below 20 km/h
pub const RATIO_TOLERANCE_MID: f32 = 0.6; // below 60 km/h
pub const RATIO_TOLERANCE_HIGH: f32 = 0.4;

pub const RATIO_TOLERANCE_LOW_BELOW_KMH: f32 = 20.0;
pub const RATIO_TOLERANCE_MID_BELOW_KMH: f32 = 60.0;

// ─── Timing ─────────────────────────────────────────────────────────

/// Periodic recompute tick while in D/M.
pub const TICK_INTERVAL_MS: u64 = 50;

/// Minimum wall-clock gap between non-forced recomputes.
pub const RECOMPUTE_MIN_INTERVAL_MS: u64 = 50;

/// Downshift hypothesis expires after this long.
pub const DOWNSHIFT_TIMEOUT_MS: u64 = 500;

/// Sensor deltas below these do not trigger an event-driven recompute.
pub const SPEED_EVENT_THRESHOLD_KMH: f32 = 0.3;
pub const RPM_EVENT_THRESHOLD: f32 = 20.0;

/// Gear-change log lines are throttled to one per interval.
pub const GEAR_LOG_INTERVAL_MS: u64 = 5000;

// ─── Compile-time consistency ───────────────────────────────────────

const_assert!(GEAR_RATIOS.len() == GEAR_SPEED_RPM_RANGES.len());
const_assert!(STATIONARY_SPEED_KMH > 0.0);
const_assert!(SNOW_CREEP_SPEED_KMH > STATIONARY_SPEED_KMH);
const_assert!(TICK_INTERVAL_MS > 0);
