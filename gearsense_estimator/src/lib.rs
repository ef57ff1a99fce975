//! # Gearsense Estimator Library
//!
//! Infers and smooths a discrete transmission-gear label from raw wheel
//! speed and engine RPM samples. The transmission reports only the selector
//! position (P/R/N/D/M), so the engaged forward gear has to be synthesized.
//!
//! ## Pipeline
//!
//! 1. **Ratio classifier**: back-computes the total gear ratio from
//!    rpm / wheel speed and snaps it to the fixed ratio table.
//! 2. **Range classifier**: speed/rpm window lookup, corroborates the
//!    ratio result where the ratio math is undefined (idle, transients).
//! 3. **Reconciliation + stationary/snow overrides**.
//! 4. **Majority-vote smoothing**: 2-of-3 consensus before a label may
//!    change, so a single noisy sample never flickers the dashboard.
//!
//! ## Execution model
//!
//! All estimator state is mutated from exactly one worker thread: sensor
//! callbacks and the 50 ms tick are serialized onto a single event loop
//! ([`worker`]). Emissions leave through a post-and-forget display sink.

pub mod classify;
pub mod config;
pub mod downshift;
pub mod estimator;
pub mod rt;
pub mod sink;
pub mod smooth;
pub mod source;
pub mod worker;
