//! Gear and drive-mode vocabulary.
//!
//! Raw transmission-position codes and drive-mode function values arrive from
//! the vehicle platform as plain integers; everything downstream works on the
//! enums defined here. Unrecognized codes never become errors; they map to
//! the conservative defaults (`Manual`-like for gear, `Unknown` for mode).

use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Raw platform codes ─────────────────────────────────────────────

/// Transmission-position codes as reported by the vehicle sensor bus.
pub mod raw_gear {
    pub const NEUTRAL: i32 = 0x0001;
    pub const REVERSE: i32 = 0x0002;
    pub const PARK: i32 = 0x0004;
    pub const DRIVE: i32 = 0x0008;
    pub const MANUAL: i32 = 0x0100;
    pub const UNKNOWN: i32 = 0x0000;
    /// Fixed gear positions 1–10 (manual boxes report these directly).
    pub const FIXED_BASE: i32 = 0x0010;
    pub const FIXED_MAX: i32 = FIXED_BASE + 9;
}

/// Drive-mode selector function values on the vehicle function bus.
pub mod raw_mode {
    pub const ECO: i32 = 570491137;
    pub const COMFORT: i32 = 570491138;
    pub const DYNAMIC: i32 = 570491139;
    pub const SNOW: i32 = 570491145;
    pub const OFFROAD: i32 = 570491155;
    pub const ADAPTIVE: i32 = 570491158;
}

// ─── Gear position ──────────────────────────────────────────────────

/// Raw transmission-position state reported by the vehicle.
///
/// The sensor knows the selector position, not the engaged forward gear;
/// synthesizing the numeric gear is the estimator's job. `Unknown` behaves
/// like `Manual` for classification and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GearPosition {
    Park = 0,
    Reverse = 1,
    Neutral = 2,
    Drive = 3,
    Manual = 4,
    Unknown = 5,
}

impl GearPosition {
    /// Map a raw platform code. Fixed numeric positions collapse to `Manual`
    /// (the selector is in a gate where the driver picks the gear); anything
    /// unrecognized maps to `Unknown`, which classifies like `Manual`.
    pub const fn from_raw(code: i32) -> Self {
        match code {
            raw_gear::PARK => Self::Park,
            raw_gear::REVERSE => Self::Reverse,
            raw_gear::NEUTRAL => Self::Neutral,
            raw_gear::DRIVE => Self::Drive,
            raw_gear::MANUAL => Self::Manual,
            c if c >= raw_gear::FIXED_BASE && c <= raw_gear::FIXED_MAX => Self::Manual,
            _ => Self::Unknown,
        }
    }

    /// Display letter for this position. `Unknown` renders as manual.
    pub const fn letter(self) -> char {
        match self {
            Self::Park => 'P',
            Self::Reverse => 'R',
            Self::Neutral => 'N',
            Self::Drive => 'D',
            Self::Manual | Self::Unknown => 'M',
        }
    }

    /// Whether the vehicle can be rolling under engine power in this
    /// position, i.e. the positions for which a numeric gear is synthesized.
    #[inline]
    pub const fn is_rolling(self) -> bool {
        matches!(self, Self::Drive | Self::Manual | Self::Unknown)
    }
}

impl Default for GearPosition {
    fn default() -> Self {
        Self::Park
    }
}

// ─── Gear number ────────────────────────────────────────────────────

/// Validated forward gear number, 1–8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GearNumber(u8);

/// Highest forward gear of the 8-speed box.
pub const MAX_GEAR: u8 = 8;

impl GearNumber {
    pub const FIRST: Self = Self(1);
    pub const SECOND: Self = Self(2);

    /// Returns `None` outside 1..=8.
    #[inline]
    pub const fn new(n: u8) -> Option<Self> {
        if n >= 1 && n <= MAX_GEAR {
            Some(Self(n))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Snow mode never displays first gear: clamp to ≥2.
    #[inline]
    pub const fn snow_floor(self) -> Self {
        if self.0 < 2 { Self::SECOND } else { self }
    }
}

impl fmt::Display for GearNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Display label ──────────────────────────────────────────────────

/// The display-ready gear label.
///
/// Only the shapes a dashboard may ever show: the bare letters P/R/N/D/M,
/// or D/M with a synthesized gear number. A bare `Drive`/`Manual` is the
/// "unresolved" fallback: the classifier could not commit to a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GearLabel {
    Park,
    Reverse,
    Neutral,
    Drive(Option<GearNumber>),
    Manual(Option<GearNumber>),
}

impl GearLabel {
    /// The bare-letter label for a sensor position (no numeric suffix).
    pub const fn from_position(position: GearPosition) -> Self {
        match position {
            GearPosition::Park => Self::Park,
            GearPosition::Reverse => Self::Reverse,
            GearPosition::Neutral => Self::Neutral,
            GearPosition::Drive => Self::Drive(None),
            GearPosition::Manual | GearPosition::Unknown => Self::Manual(None),
        }
    }

    /// Attach a synthesized gear number. Only D/M carry numbers; for the
    /// other letters this returns the label unchanged, so the
    /// "letter + digit" invariant holds by construction.
    pub const fn with_number(self, number: GearNumber) -> Self {
        match self {
            Self::Drive(_) => Self::Drive(Some(number)),
            Self::Manual(_) => Self::Manual(Some(number)),
            other => other,
        }
    }

    /// The synthesized gear number, if any.
    #[inline]
    pub const fn number(self) -> Option<GearNumber> {
        match self {
            Self::Drive(n) | Self::Manual(n) => n,
            _ => None,
        }
    }
}

impl fmt::Display for GearLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Park => f.write_str("P"),
            Self::Reverse => f.write_str("R"),
            Self::Neutral => f.write_str("N"),
            Self::Drive(None) => f.write_str("D"),
            Self::Drive(Some(n)) => write!(f, "D{n}"),
            Self::Manual(None) => f.write_str("M"),
            Self::Manual(Some(n)) => write!(f, "M{n}"),
        }
    }
}

// ─── Drive mode ─────────────────────────────────────────────────────

/// Vehicle-wide driving-character setting.
///
/// Snow is the only mode the estimator treats specially (gear-1 lockout);
/// the rest are carried for display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DriveMode {
    Eco = 0,
    Comfort = 1,
    Dynamic = 2,
    Adaptive = 3,
    Snow = 4,
    Offroad = 5,
    Unknown = 6,
}

impl DriveMode {
    /// Map a raw function value; unrecognized values become `Unknown`.
    pub const fn from_raw(value: i32) -> Self {
        match value {
            raw_mode::ECO => Self::Eco,
            raw_mode::COMFORT => Self::Comfort,
            raw_mode::DYNAMIC => Self::Dynamic,
            raw_mode::ADAPTIVE => Self::Adaptive,
            raw_mode::SNOW => Self::Snow,
            raw_mode::OFFROAD => Self::Offroad,
            _ => Self::Unknown,
        }
    }
}

impl Default for DriveMode {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for DriveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eco => "Eco",
            Self::Comfort => "Comfort",
            Self::Dynamic => "Dynamic",
            Self::Adaptive => "Adaptive",
            Self::Snow => "Snow",
            Self::Offroad => "Offroad",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_gear_mapping() {
        assert_eq!(GearPosition::from_raw(raw_gear::PARK), GearPosition::Park);
        assert_eq!(GearPosition::from_raw(raw_gear::DRIVE), GearPosition::Drive);
        assert_eq!(GearPosition::from_raw(raw_gear::MANUAL), GearPosition::Manual);
    }

    #[test]
    fn fixed_positions_collapse_to_manual() {
        for n in 0..10 {
            assert_eq!(
                GearPosition::from_raw(raw_gear::FIXED_BASE + n),
                GearPosition::Manual,
                "fixed position {n}"
            );
        }
    }

    #[test]
    fn unrecognized_code_is_unknown_and_classifies_like_manual() {
        let pos = GearPosition::from_raw(0x7FFF_0000);
        assert_eq!(pos, GearPosition::Unknown);
        assert_eq!(pos.letter(), 'M');
        assert!(pos.is_rolling());
    }

    #[test]
    fn gear_number_bounds() {
        assert!(GearNumber::new(0).is_none());
        assert!(GearNumber::new(9).is_none());
        assert_eq!(GearNumber::new(8).map(GearNumber::get), Some(8));
    }

    #[test]
    fn snow_floor_clamps_first_gear_only() {
        assert_eq!(GearNumber::FIRST.snow_floor(), GearNumber::SECOND);
        let fifth = GearNumber::new(5).unwrap();
        assert_eq!(fifth.snow_floor(), fifth);
    }

    #[test]
    fn label_display() {
        assert_eq!(GearLabel::Park.to_string(), "P");
        assert_eq!(GearLabel::Drive(None).to_string(), "D");
        assert_eq!(
            GearLabel::Drive(GearNumber::new(4)).to_string(),
            "D4"
        );
        assert_eq!(
            GearLabel::Manual(GearNumber::new(2)).to_string(),
            "M2"
        );
    }

    #[test]
    fn numbers_never_attach_to_park_reverse_neutral() {
        let n = GearNumber::new(3).unwrap();
        assert_eq!(GearLabel::Park.with_number(n), GearLabel::Park);
        assert_eq!(GearLabel::Reverse.with_number(n), GearLabel::Reverse);
        assert_eq!(GearLabel::Neutral.with_number(n), GearLabel::Neutral);
    }

    #[test]
    fn drive_mode_mapping() {
        assert_eq!(DriveMode::from_raw(raw_mode::SNOW), DriveMode::Snow);
        assert_eq!(DriveMode::from_raw(raw_mode::COMFORT), DriveMode::Comfort);
        assert_eq!(DriveMode::from_raw(-1), DriveMode::Unknown);
        assert_eq!(DriveMode::from_raw(0), DriveMode::Unknown);
    }
}
