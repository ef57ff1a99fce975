//! Gearsense Common Library
//!
//! Shared vocabulary and configuration loading for the gearsense workspace.
//!
//! # Module Structure
//!
//! - [`gear`] - Gear position, gear number, display label and drive mode types
//! - [`consts`] - Vehicle constants: ratio table, range table, timing thresholds
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod gear;
pub mod prelude;
