//! Single-writer estimator worker.
//!
//! All estimator state is mutated from exactly one thread. The two trigger
//! sources (asynchronous sensor events and the periodic 50 ms tick) are
//! serialized by a single `recv_timeout` loop paced against an absolute
//! next-tick deadline, so ticks do not drift with event traffic.
//!
//! Cancellation is explicit: [`WorkerHandle::stop`] sends the shutdown
//! event and joins the thread. Once it returns, no further sink calls can
//! happen. Dropping every event sender has the same effect.

use crate::config::EstimatorConfig;
use crate::estimator::{GearEstimator, SensorEvent};
use crate::rt;
use crate::sink::{DisplaySink, DisplayUpdate};
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// One message on the worker's event queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VehicleEvent {
    Sensor(SensorEvent),
    /// Terminate the worker loop.
    Shutdown,
}

/// Feed side of the worker queue, handed to platform adapters.
pub type EventSender = Sender<VehicleEvent>;

/// Errors creating or tearing down the worker.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to spawn estimator thread: {0}")]
    Spawn(#[from] io::Error),

    #[error("estimator thread panicked")]
    Panicked,
}

/// O(1) per-loop counters, logged at shutdown and returned from `stop()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Sensor events processed.
    pub events: u64,
    /// Periodic ticks executed.
    pub ticks: u64,
    /// Labels handed to the sink.
    pub emitted: u64,
    /// Ticks that ran a full interval late.
    pub late_ticks: u64,
}

/// Handle owning the worker thread and its queue.
pub struct WorkerHandle {
    tx: EventSender,
    join: JoinHandle<WorkerStats>,
}

impl WorkerHandle {
    /// A new feed handle for a platform adapter.
    pub fn sender(&self) -> EventSender {
        self.tx.clone()
    }

    /// Stop the worker and wait for it to finish.
    ///
    /// After this returns, the estimator thread is gone and no further
    /// sink calls will occur.
    pub fn stop(self) -> Result<WorkerStats, WorkerError> {
        // The worker may already have exited (all senders dropped); a
        // failed send is fine either way.
        let _ = self.tx.send(VehicleEvent::Shutdown);
        self.join.join().map_err(|_| WorkerError::Panicked)
    }
}

/// Spawn the estimator worker.
///
/// The worker owns the queue receiver; feed it through
/// [`WorkerHandle::sender`]. Emitted labels go to `sink` as
/// [`DisplayUpdate::Gear`] messages.
pub fn spawn(
    cfg: EstimatorConfig,
    sink: impl DisplaySink + 'static,
) -> Result<WorkerHandle, WorkerError> {
    let (tx, rx) = mpsc::channel();
    let join = thread::Builder::new()
        .name("gear-estimator".into())
        .spawn(move || run_loop(cfg, rx, sink))?;
    Ok(WorkerHandle { tx, join })
}

fn run_loop(
    cfg: EstimatorConfig,
    rx: Receiver<VehicleEvent>,
    sink: impl DisplaySink,
) -> WorkerStats {
    if let Some(priority) = cfg.rt_priority {
        if let Err(e) = rt::configure_current_thread(priority) {
            warn!("continuing without RT scheduling: {e}");
        }
    }

    let tick = Duration::from_millis(cfg.tick_interval_ms);
    let origin = Instant::now();
    let mut next_tick = origin + tick;
    let mut estimator = GearEstimator::new(cfg);
    let mut stats = WorkerStats::default();
    let mut sink_warned = false;

    loop {
        let now = Instant::now();
        let timeout = next_tick.saturating_duration_since(now);

        match rx.recv_timeout(timeout) {
            Ok(VehicleEvent::Sensor(event)) => {
                stats.events += 1;
                let now_ms = origin.elapsed().as_millis() as u64;
                if let Some(label) = estimator.apply(event, now_ms) {
                    publish(&sink, label, &mut stats, &mut sink_warned);
                }
            }
            Ok(VehicleEvent::Shutdown) => break,
            Err(RecvTimeoutError::Timeout) => {
                stats.ticks += 1;
                let now = Instant::now();
                if now >= next_tick + tick {
                    stats.late_ticks += 1;
                }
                // Advance the absolute deadline; skip missed slots instead
                // of firing a burst to catch up.
                next_tick += tick;
                while next_tick <= now {
                    next_tick += tick;
                }
                let now_ms = origin.elapsed().as_millis() as u64;
                if let Some(label) = estimator.tick(now_ms) {
                    publish(&sink, label, &mut stats, &mut sink_warned);
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(
        events = stats.events,
        ticks = stats.ticks,
        emitted = stats.emitted,
        late_ticks = stats.late_ticks,
        "estimator worker stopped"
    );
    stats
}

fn publish(
    sink: &impl DisplaySink,
    label: gearsense_common::gear::GearLabel,
    stats: &mut WorkerStats,
    sink_warned: &mut bool,
) {
    stats.emitted += 1;
    if sink.publish(DisplayUpdate::Gear(label)).is_err() && !*sink_warned {
        warn!("display sink disconnected; further labels will be dropped");
        *sink_warned = true;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use gearsense_common::gear::{DriveMode, GearPosition};

    #[test]
    fn shutdown_event_stops_the_loop() {
        let (sink_tx, _sink_rx) = mpsc::channel();
        let handle = spawn(EstimatorConfig::default(), sink_tx).unwrap();
        let stats = handle.stop().unwrap();
        assert_eq!(stats.emitted, 0);
    }

    #[test]
    fn dropping_all_senders_stops_the_loop() {
        let (sink_tx, _sink_rx) = mpsc::channel();
        let handle = spawn(EstimatorConfig::default(), sink_tx).unwrap();
        let WorkerHandle { tx, join } = handle;
        drop(tx);
        let stats = join.join().unwrap();
        assert_eq!(stats.events, 0);
    }

    #[test]
    fn sensor_events_flow_to_sink() {
        let (sink_tx, sink_rx) = mpsc::channel();
        let handle = spawn(EstimatorConfig::default(), sink_tx).unwrap();
        let tx = handle.sender();
        tx.send(VehicleEvent::Sensor(SensorEvent::DriveMode(DriveMode::Comfort)))
            .unwrap();
        tx.send(VehicleEvent::Sensor(SensorEvent::Gear(GearPosition::Drive)))
            .unwrap();

        let update = sink_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(
            update,
            DisplayUpdate::Gear(gearsense_common::gear::GearLabel::Drive(
                gearsense_common::gear::GearNumber::new(1)
            ))
        );

        let stats = handle.stop().unwrap();
        assert!(stats.events >= 2);
        assert!(stats.emitted >= 1);
    }
}
