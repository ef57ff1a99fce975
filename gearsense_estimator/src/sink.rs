//! Display sink seam.
//!
//! The estimator hands finished labels across to whatever owns the screen.
//! The hand-off is post-and-forget: the worker thread must never stall
//! waiting on display readiness, so a sink either accepts the update
//! immediately or reports itself closed.

use gearsense_common::gear::GearLabel;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::info;

/// One update for the display collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayUpdate {
    /// The gear label changed.
    Gear(GearLabel),
    /// The vehicle platform never became available; no labels will follow.
    Unavailable,
}

/// The sink went away (display process exited, channel dropped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("display sink disconnected")]
pub struct SinkClosed;

/// Receives display updates from the estimator worker.
///
/// Implementations must not block: the call happens on the estimator's
/// thread between samples.
pub trait DisplaySink: Send {
    fn publish(&self, update: DisplayUpdate) -> Result<(), SinkClosed>;
}

/// Channel-backed sink: the natural cross-thread hand-off.
impl DisplaySink for Sender<DisplayUpdate> {
    fn publish(&self, update: DisplayUpdate) -> Result<(), SinkClosed> {
        self.send(update).map_err(|_| SinkClosed)
    }
}

/// Log-only sink for the demo binary and diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSink;

impl DisplaySink for LoggingSink {
    fn publish(&self, update: DisplayUpdate) -> Result<(), SinkClosed> {
        match update {
            DisplayUpdate::Gear(label) => info!(%label, "display gear"),
            DisplayUpdate::Unavailable => info!("display gear unavailable"),
        }
        Ok(())
    }
}
