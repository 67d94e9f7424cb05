//! Landmark Trace Replay
//!
//! Feeds a recorded landmark trace (one JSON object per line) through a
//! [`DrowsinessMonitor`] and writes one [`FrameAnalysis`] JSON line per frame.
//!
//! Trace line format:
//!
//! ```json
//! {"timestamp_s": 1.25, "width": 640, "height": 480, "faces": [[[0.41, 0.37], [0.42, 0.36]]]}
//! ```
//!
//! `faces` holds normalized `[x, y]` landmarks per face; empty or absent means
//! no face in that frame.

use std::io::{BufRead, Write};
use std::time::Duration;

use drowsiness::{
    check_frame_size, DrowsinessError, DrowsinessMonitor, FrameAnalysis, NormalizedLandmark,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Replay error types
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: malformed trace record: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Line {line}: invalid timestamp {value}")]
    Timestamp { line: usize, value: f64 },

    #[error("Line {line}: {source}")]
    Frame {
        line: usize,
        #[source]
        source: DrowsinessError,
    },

    #[error("Failed to write analysis: {0}")]
    Output(#[source] serde_json::Error),
}

/// One recorded frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Monotonic capture time (seconds since recording start)
    pub timestamp_s: f64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub faces: Vec<Vec<[f32; 2]>>,
}

impl TraceRecord {
    /// Landmarks of the first face, if any
    pub fn first_face(&self) -> Option<Vec<NormalizedLandmark>> {
        self.faces
            .first()
            .map(|face| face.iter().map(|&[x, y]| NormalizedLandmark::new(x, y)).collect())
    }
}

/// Totals over a replayed trace
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplaySummary {
    pub frames: usize,
    pub face_frames: usize,
    pub alarm_frames: usize,
    pub alarms_raised: usize,
    pub longest_streak_secs: f64,
}

impl ReplaySummary {
    fn record(&mut self, analysis: &FrameAnalysis) {
        self.frames += 1;
        if analysis.face_detected {
            self.face_frames += 1;
        }
        if analysis.alarm_active {
            self.alarm_frames += 1;
        }
        if analysis.alarm_raised {
            self.alarms_raised += 1;
        }
        self.longest_streak_secs = self.longest_streak_secs.max(analysis.drowsy_elapsed_secs);
    }
}

/// Replay every record from `input`, writing analyses to `output`
pub fn replay<R, W>(
    monitor: &mut DrowsinessMonitor,
    input: R,
    mut output: W,
) -> Result<ReplaySummary, ReplayError>
where
    R: BufRead,
    W: Write,
{
    let mut summary = ReplaySummary::default();

    for (idx, line) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: TraceRecord = serde_json::from_str(&line)
            .map_err(|source| ReplayError::Parse { line: line_no, source })?;
        let now = Duration::try_from_secs_f64(record.timestamp_s).map_err(|_| {
            ReplayError::Timestamp {
                line: line_no,
                value: record.timestamp_s,
            }
        })?;
        check_frame_size(record.width, record.height)
            .map_err(|source| ReplayError::Frame { line: line_no, source })?;

        let face = record.first_face();
        let analysis =
            monitor.process_landmarks(face.as_deref(), record.width, record.height, now);
        if analysis.alarm_raised {
            info!(line = line_no, timestamp_s = record.timestamp_s, "Alarm raised");
        }
        debug!(
            line = line_no,
            avg_ear = analysis.avg_ear,
            state = ?analysis.display_state,
            "Frame replayed"
        );

        serde_json::to_writer(&mut output, &analysis).map_err(ReplayError::Output)?;
        output.write_all(b"\n")?;
        summary.record(&analysis);
    }

    output.flush()?;
    Ok(summary)
}
