//! # Gearsense Estimator
//!
//! Runs the gear-inference worker against a simulated drive cycle and logs
//! every emitted label. On a real head unit the simulated source is
//! replaced by the platform sensor adapter feeding the same event queue.

use clap::Parser;
use gearsense_estimator::config::EstimatorConfig;
use gearsense_estimator::sink::{DisplaySink, DisplayUpdate, LoggingSink};
use gearsense_estimator::source::{
    RetryPolicy, SimulatedDrive, VehicleSource, start_with_retry,
};
use gearsense_estimator::worker;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Gearsense — real-time transmission gear inference
#[derive(Parser, Debug)]
#[command(name = "gearsense_estimator")]
#[command(version)]
#[command(about = "Infers a stable display gear label from speed and rpm telemetry")]
struct Args {
    /// Path to estimator configuration TOML.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Simulated drive length in seconds.
    #[arg(long, default_value_t = 20)]
    duration_secs: u64,

    /// Simulated top speed [km/h].
    #[arg(long, default_value_t = 160.0)]
    top_speed: f32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    setup_tracing(&args);

    info!("gearsense estimator v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("gearsense estimator shutdown complete");
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match &args.config {
        Some(path) => {
            info!("loading config from {}", path.display());
            EstimatorConfig::load_validated(path)?
        }
        None => EstimatorConfig::default(),
    };
    info!(
        service = %cfg.shared.service_name,
        tick_ms = cfg.tick_interval_ms,
        "config OK"
    );

    let sink = LoggingSink;
    let handle = worker::spawn(cfg.clone(), sink)?;

    let mut source = SimulatedDrive::new(
        cfg.vehicle.clone(),
        args.top_speed,
        Duration::from_secs(args.duration_secs),
    );
    let events = handle.sender();
    if let Err(e) = start_with_retry(&mut source, &events, RetryPolicy::default()) {
        // Terminal: tell the display once and stop the feed for good.
        let _ = sink.publish(DisplayUpdate::Unavailable);
        let _ = handle.stop();
        return Err(Box::new(e));
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        info!("received shutdown signal");
        flag.store(true, Ordering::SeqCst);
    })?;

    // Let the drive cycle play out (or bail early on ctrl-c).
    let deadline = std::time::Instant::now() + Duration::from_secs(args.duration_secs);
    while std::time::Instant::now() < deadline && !interrupted.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    source.stop();
    let stats = handle.stop()?;
    info!(
        events = stats.events,
        ticks = stats.ticks,
        emitted = stats.emitted,
        late_ticks = stats.late_ticks,
        "worker statistics"
    );

    Ok(())
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
