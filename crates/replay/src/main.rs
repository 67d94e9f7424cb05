//! Drowsiness Replay - Main Entry Point

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

use clap::Parser;
use drowsiness::{DrowsinessConfig, DrowsinessMonitor};
use drowsiness_replay::replay;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "drowsy-replay",
    version,
    about = "Replay a landmark trace through the drowsiness monitor"
)]
struct Args {
    /// Landmark trace, one JSON record per line
    trace: PathBuf,

    /// Config file (toml/json/yaml); DROWSY_* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Initialize logging on stderr so stdout carries only analyses
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let args = Args::parse();

    info!("=== Drowsiness Replay v{} ===", env!("CARGO_PKG_VERSION"));

    let config = DrowsinessConfig::load(args.config.as_deref())?;
    info!(
        ear_thresh = config.ear_thresh,
        wait_time_secs = config.wait_time_secs,
        "Replaying {}",
        args.trace.display()
    );

    let mut monitor = DrowsinessMonitor::new(&config)?;
    let input = BufReader::new(File::open(&args.trace)?);
    let output = BufWriter::new(io::stdout().lock());

    let summary = replay(&mut monitor, input, output)?;
    info!(
        frames = summary.frames,
        face_frames = summary.face_frames,
        alarm_frames = summary.alarm_frames,
        alarms_raised = summary.alarms_raised,
        longest_streak_secs = summary.longest_streak_secs,
        "Replay finished"
    );

    Ok(())
}
