//! Per-frame analysis handed to renderers and alarm sinks

use serde::{Deserialize, Serialize};

use crate::ear::AvgEar;
use crate::landmark::PixelPoint;
use crate::tracker::{DisplayState, TrackerOutput};

/// Text shown while the alarm is active
pub const ALARM_MESSAGE: &str = "WAKE UP! WAKE UP";

/// Complete drowsiness result for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Whether a face was detected
    pub face_detected: bool,

    /// Mean EAR of both eyes (0 without a face)
    pub avg_ear: f32,
    pub left_ear: f32,
    pub right_ear: f32,

    /// Eye contours in pixel space, absent when unmeasurable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_points: Option<[PixelPoint; 6]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_points: Option<[PixelPoint; 6]>,

    /// Length of the current eyes-closed streak
    pub drowsy_elapsed_secs: f64,

    pub alarm_active: bool,

    /// Set only on the frame where the alarm switched on
    #[serde(default)]
    pub alarm_raised: bool,

    pub display_state: DisplayState,
}

impl FrameAnalysis {
    pub(crate) fn no_face(output: &TrackerOutput, drowsy_elapsed_secs: f64) -> Self {
        Self {
            face_detected: false,
            drowsy_elapsed_secs,
            alarm_active: output.alarm_active,
            alarm_raised: output.alarm_raised,
            display_state: output.display_state,
            ..Default::default()
        }
    }

    pub(crate) fn with_face(
        ear: &AvgEar,
        output: &TrackerOutput,
        drowsy_elapsed_secs: f64,
    ) -> Self {
        Self {
            face_detected: true,
            avg_ear: ear.value,
            left_ear: ear.left.ratio,
            right_ear: ear.right.ratio,
            left_points: ear.left.points,
            right_points: ear.right.points,
            drowsy_elapsed_secs,
            alarm_active: output.alarm_active,
            alarm_raised: output.alarm_raised,
            display_state: output.display_state,
        }
    }

    /// Check if the alarm should be sounding
    pub fn has_alarm(&self) -> bool {
        self.alarm_active
    }

    /// Overlay color for eye markers and text
    pub fn color_rgb(&self) -> [u8; 3] {
        self.display_state.color_rgb()
    }

    /// Overlay text lines: EAR, streak length and, while active, the alarm message
    pub fn overlay_lines(&self) -> Vec<String> {
        if !self.face_detected {
            return Vec::new();
        }

        let mut lines = vec![
            format!("EAR: {:.2}", self.avg_ear),
            format!("DROWSY: {:.3} Secs", self.drowsy_elapsed_secs),
        ];
        if self.alarm_active {
            lines.push(ALARM_MESSAGE.to_string());
        }
        lines
    }
}
