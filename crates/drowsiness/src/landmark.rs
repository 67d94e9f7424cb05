//! Facial landmark types and eye index sets

use serde::{Deserialize, Serialize};

use crate::DrowsinessError;

/// Left eye contour indices in the face mesh: P1..P6
pub const LEFT_EYE: EyeIndices = EyeIndices([362, 385, 387, 263, 373, 380]);

/// Right eye contour indices in the face mesh: P1..P6
pub const RIGHT_EYE: EyeIndices = EyeIndices([33, 160, 158, 133, 153, 144]);

/// Landmarks in the refined face mesh (468 face points + 10 iris points)
pub const FACE_MESH_LANDMARKS: usize = 478;

/// Detector-reported landmark, coordinates normalized to [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
}

impl NormalizedLandmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// All landmarks for one face, indexed by detector landmark id
pub type FaceLandmarks = Vec<NormalizedLandmark>;

/// Landmark in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f32,
    pub y: f32,
}

impl PixelPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Denormalize a landmark against the frame size.
    ///
    /// Returns `None` when either coordinate is non-finite or outside [0, 1],
    /// or when the frame is empty. Valid points are floored to whole pixels
    /// and clamped to the last row/column, so they always land inside the frame.
    pub fn from_normalized(landmark: NormalizedLandmark, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        if !is_valid_normalized(landmark.x) || !is_valid_normalized(landmark.y) {
            return None;
        }

        let x = (landmark.x * width as f32).floor().min((width - 1) as f32);
        let y = (landmark.y * height as f32).floor().min((height - 1) as f32);
        Some(Self { x, y })
    }
}

fn is_valid_normalized(value: f32) -> bool {
    // NaN fails the range check as well
    (0.0..=1.0).contains(&value)
}

/// Six landmark indices describing one eye contour.
///
/// Order: outer corner, two upper-lid points, inner corner, two lower-lid points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EyeIndices(pub [usize; 6]);

impl EyeIndices {
    pub fn new(indices: [usize; 6]) -> Self {
        Self(indices)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Largest referenced landmark index
    pub fn max_index(&self) -> usize {
        self.iter().max().unwrap_or(0)
    }

    /// Check that every index exists in a landmark set of `landmark_count`
    /// points and that no index repeats.
    pub fn validate(&self, landmark_count: usize) -> Result<(), DrowsinessError> {
        if let Some(idx) = self.iter().find(|&idx| idx >= landmark_count) {
            return Err(DrowsinessError::InvalidEyeIndices(format!(
                "index {} out of range for {} landmarks",
                idx, landmark_count
            )));
        }

        for (pos, idx) in self.iter().enumerate() {
            if self.0[pos + 1..].contains(&idx) {
                return Err(DrowsinessError::InvalidEyeIndices(format!(
                    "index {} referenced twice",
                    idx
                )));
            }
        }

        Ok(())
    }
}
