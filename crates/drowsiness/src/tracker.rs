//! Drowsiness state tracking
//!
//! Turns the per-frame average EAR into an eyes-closed streak timer and a
//! debounced alarm. One tracker per monitored subject; updates must arrive in
//! frame order with timestamps from a monotonic clock.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::DrowsinessError;

/// Presentation state, mirrors whether the eyes are currently below threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayState {
    #[default]
    Awake,
    Drowsy,
}

impl DisplayState {
    /// Overlay color (RGB): green when awake, red when drowsy
    pub fn color_rgb(&self) -> [u8; 3] {
        match self {
            DisplayState::Awake => [0, 255, 0],
            DisplayState::Drowsy => [255, 0, 0],
        }
    }

    pub fn is_drowsy(&self) -> bool {
        matches!(self, DisplayState::Drowsy)
    }
}

/// Alarm thresholds, fixed for a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    ear_thresh: f32,
    wait_time: Duration,
}

impl Thresholds {
    /// Validate and build thresholds. Both values must be finite and positive.
    pub fn new(ear_thresh: f32, wait_time_secs: f64) -> Result<Self, DrowsinessError> {
        if !ear_thresh.is_finite() || ear_thresh <= 0.0 {
            return Err(DrowsinessError::InvalidThreshold {
                name: "ear_thresh",
                value: ear_thresh as f64,
            });
        }

        let invalid_wait = DrowsinessError::InvalidThreshold {
            name: "wait_time_secs",
            value: wait_time_secs,
        };
        if !wait_time_secs.is_finite() || wait_time_secs <= 0.0 {
            return Err(invalid_wait);
        }
        let wait_time = Duration::try_from_secs_f64(wait_time_secs).map_err(|_| invalid_wait)?;

        Ok(Self {
            ear_thresh,
            wait_time,
        })
    }

    /// EAR below which the eyes count as closed
    pub fn ear_thresh(&self) -> f32 {
        self.ear_thresh
    }

    /// How long the eyes must stay closed before the alarm fires
    pub fn wait_time(&self) -> Duration {
        self.wait_time
    }
}

/// Mutable tracker record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerState {
    /// Start of the current accumulation window, or time of the last update
    pub last_timestamp: Duration,
    /// Time the eyes have been continuously closed
    pub drowsy_elapsed: Duration,
    pub alarm_active: bool,
    pub display_state: DisplayState,
}

impl TrackerState {
    /// Fresh state for a session starting at `start`
    pub fn starting_at(start: Duration) -> Self {
        Self {
            last_timestamp: start,
            drowsy_elapsed: Duration::ZERO,
            alarm_active: false,
            display_state: DisplayState::Awake,
        }
    }
}

/// Result of one tracker update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerOutput {
    pub alarm_active: bool,
    pub display_state: DisplayState,
    /// True only on the frame where the alarm switched on
    pub alarm_raised: bool,
}

/// Eyes-closed streak timer with a debounced alarm
#[derive(Debug, Clone)]
pub struct DrowsinessTracker {
    thresholds: Thresholds,
    state: TrackerState,
}

impl DrowsinessTracker {
    /// Start a session at clock origin zero
    pub fn new(thresholds: Thresholds) -> Self {
        Self::starting_at(thresholds, Duration::ZERO)
    }

    /// Start a session at the given monotonic timestamp
    pub fn starting_at(thresholds: Thresholds, start: Duration) -> Self {
        Self {
            thresholds,
            state: TrackerState::starting_at(start),
        }
    }

    /// Feed one frame.
    ///
    /// Without a face, or with `avg_ear >= ear_thresh`, the streak resets
    /// immediately. Otherwise the time since the previous update is added to
    /// the streak and the alarm is on once the streak reaches `wait_time`.
    pub fn update(&mut self, has_face: bool, avg_ear: f32, now: Duration) -> TrackerOutput {
        let was_active = self.state.alarm_active;

        if !has_face {
            self.reset_streak(now, "no face");
        } else if avg_ear >= self.thresholds.ear_thresh {
            self.reset_streak(now, "eyes open");
        } else {
            // NaN lands here too and counts as closed
            self.accumulate(now);
        }

        TrackerOutput {
            alarm_active: self.state.alarm_active,
            display_state: self.state.display_state,
            alarm_raised: self.state.alarm_active && !was_active,
        }
    }

    /// Feed one frame; `None` means no face was detected
    pub fn observe(&mut self, avg_ear: Option<f32>, now: Duration) -> TrackerOutput {
        match avg_ear {
            Some(ear) => self.update(true, ear, now),
            None => self.update(false, 0.0, now),
        }
    }

    /// Hard reset, e.g. when the monitored subject changes
    pub fn reset(&mut self, now: Duration) {
        self.state = TrackerState::starting_at(now);
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn drowsy_elapsed(&self) -> Duration {
        self.state.drowsy_elapsed
    }

    pub fn alarm_active(&self) -> bool {
        self.state.alarm_active
    }

    pub fn display_state(&self) -> DisplayState {
        self.state.display_state
    }

    fn reset_streak(&mut self, now: Duration, reason: &'static str) {
        if self.state.alarm_active {
            info!(
                reason,
                elapsed_secs = self.state.drowsy_elapsed.as_secs_f64(),
                "Drowsiness alarm cleared"
            );
        }
        self.state = TrackerState::starting_at(now);
    }

    fn accumulate(&mut self, now: Duration) {
        let delta = match now.checked_sub(self.state.last_timestamp) {
            Some(delta) => delta,
            None => {
                warn!(
                    last_secs = self.state.last_timestamp.as_secs_f64(),
                    now_secs = now.as_secs_f64(),
                    "Timestamp went backwards, clamping delta to zero"
                );
                Duration::ZERO
            }
        };

        if !self.state.display_state.is_drowsy() {
            debug!(now_secs = now.as_secs_f64(), "Drowsy streak started");
        }

        self.state.drowsy_elapsed += delta;
        self.state.last_timestamp = now;
        self.state.display_state = DisplayState::Drowsy;

        let active = self.state.drowsy_elapsed >= self.thresholds.wait_time;
        if active && !self.state.alarm_active {
            info!(
                elapsed_secs = self.state.drowsy_elapsed.as_secs_f64(),
                wait_secs = self.thresholds.wait_time.as_secs_f64(),
                "Drowsiness alarm raised"
            );
        }
        self.state.alarm_active = active;
    }
}

/// Monotonic session clock for hosts without capture timestamps
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Time since the session started
    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}
