//! Vehicle source seam.
//!
//! The platform side of the estimator: something that, once started, feeds
//! [`VehicleEvent`]s into the worker queue. Startup against real vehicle
//! interfaces can fail transiently during boot, so connection goes through
//! a small bounded retry with growing backoff; exhausting it is the one
//! terminal condition that stops the data feed entirely.

use crate::config::VehicleParams;
use crate::estimator::SensorEvent;
use crate::worker::{EventSender, VehicleEvent};
use gearsense_common::gear::{DriveMode, GearNumber, GearPosition};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from a vehicle source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The platform interfaces never came up.
    #[error("vehicle platform unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },

    /// A started source failed.
    #[error("vehicle source failed: {0}")]
    Failed(String),
}

/// A stream of vehicle events.
///
/// `start` registers/spawns whatever delivers events into `events` and
/// returns once the feed is live. `stop` tears the feed down; no events
/// may be sent after it returns.
pub trait VehicleSource {
    fn start(&mut self, events: EventSender) -> Result<(), SourceError>;
    fn stop(&mut self);
}

/// Bounded-retry connection policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Backoff grows linearly: attempt `n` waits `base_delay × n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Start a source, retrying with increasing backoff.
///
/// # Errors
///
/// `SourceError::Unavailable` once every attempt failed. The caller
/// surfaces that to the display sink as the terminal unavailable signal.
pub fn start_with_retry(
    source: &mut dyn VehicleSource,
    events: &EventSender,
    policy: RetryPolicy,
) -> Result<(), SourceError> {
    for attempt in 1..=policy.attempts.max(1) {
        match source.start(events.clone()) {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(attempt, "vehicle source start failed: {e}");
                if attempt < policy.attempts {
                    thread::sleep(policy.base_delay * attempt);
                }
            }
        }
    }
    Err(SourceError::Unavailable {
        attempts: policy.attempts,
    })
}

// ─── Simulated drive ────────────────────────────────────────────────

/// Synthetic drive-cycle source for the demo binary and integration tests.
///
/// Accelerates to `top_speed_kmh` and brakes back down over `duration`,
/// shifting at a fixed upshift rpm so the run sweeps every gear. Events
/// are emitted on the sensor cadence with speed and rpm kept exactly
/// on-ratio for the active gear.
pub struct SimulatedDrive {
    params: VehicleParams,
    top_speed_kmh: f32,
    duration: Duration,
    cadence: Duration,
    stop_flag: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
}

/// Shift up once the engine would exceed this in the current gear.
const UPSHIFT_RPM: f32 = 2800.0;

impl SimulatedDrive {
    pub fn new(params: VehicleParams, top_speed_kmh: f32, duration: Duration) -> Self {
        Self {
            params,
            top_speed_kmh,
            duration,
            cadence: Duration::from_millis(50),
            stop_flag: Arc::new(AtomicBool::new(false)),
            feeder: None,
        }
    }

    /// The gear an automatic box would hold at this speed: the highest
    /// gear whose implied rpm stays above a comfortable minimum, capped
    /// by the upshift point.
    pub fn plausible_gear(params: &VehicleParams, speed_kmh: f32) -> GearNumber {
        let mut chosen = GearNumber::FIRST;
        for n in 1..=8u8 {
            let gear = match GearNumber::new(n) {
                Some(g) => g,
                None => break,
            };
            chosen = gear;
            if params.engine_rpm_for(speed_kmh, gear) <= UPSHIFT_RPM {
                break;
            }
        }
        chosen
    }

    /// Wait for the feeder to finish its profile (tests and the demo).
    pub fn wait(&mut self) {
        if let Some(handle) = self.feeder.take() {
            let _ = handle.join();
        }
    }
}

impl VehicleSource for SimulatedDrive {
    fn start(&mut self, events: EventSender) -> Result<(), SourceError> {
        let params = self.params.clone();
        let top = self.top_speed_kmh;
        let total = self.duration;
        let cadence = self.cadence;
        let stop_flag = Arc::clone(&self.stop_flag);
        stop_flag.store(false, Ordering::SeqCst);

        let feeder = thread::Builder::new()
            .name("sim-drive".into())
            .spawn(move || {
                let _ = events.send(VehicleEvent::Sensor(SensorEvent::DriveMode(
                    DriveMode::Comfort,
                )));
                let _ = events.send(VehicleEvent::Sensor(SensorEvent::Gear(
                    GearPosition::Drive,
                )));

                let steps = (total.as_millis() / cadence.as_millis()).max(2) as u32;
                let half = steps / 2;
                for step in 0..steps {
                    if stop_flag.load(Ordering::SeqCst) {
                        break;
                    }
                    // Triangle profile: accelerate to the top speed, brake
                    // back to rest.
                    let speed = if step <= half {
                        top * step as f32 / half as f32
                    } else {
                        top * (steps - step) as f32 / (steps - half) as f32
                    };
                    let gear = Self::plausible_gear(&params, speed);
                    let rpm = if speed > 0.5 {
                        params.engine_rpm_for(speed, gear)
                    } else {
                        800.0
                    };
                    let _ = events.send(VehicleEvent::Sensor(SensorEvent::Speed(speed)));
                    let _ = events.send(VehicleEvent::Sensor(SensorEvent::Rpm(rpm)));
                    thread::sleep(cadence);
                }
                debug!("simulated drive finished");
            })
            .map_err(|e| SourceError::Failed(e.to_string()))?;

        self.feeder = Some(feeder);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.wait();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
