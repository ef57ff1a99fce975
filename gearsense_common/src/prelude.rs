//! Prelude module for common re-exports.
//!
//! `use gearsense_common::prelude::*;` pulls in the types nearly every
//! consumer needs without listing individual paths.

// ─── Vocabulary ─────────────────────────────────────────────────────
pub use crate::gear::{DriveMode, GearLabel, GearNumber, GearPosition};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── Drivetrain constants ───────────────────────────────────────────
pub use crate::consts::{FINAL_DRIVE_RATIO, GEAR_RATIOS, TIRE_RADIUS_M};
