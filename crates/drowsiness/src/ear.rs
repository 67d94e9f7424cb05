//! Eye aspect ratio (EAR) estimation
//!
//! EAR = (|P2-P6| + |P3-P5|) / (2 * |P1-P4|) over the six contour points of
//! one eye. An open eye sits roughly in 0.25..0.35; it drops toward zero as
//! the lids close.

use serde::{Deserialize, Serialize};

use crate::landmark::{EyeIndices, NormalizedLandmark, PixelPoint};

/// Ratio reported for an eye whose contour could not be measured.
///
/// It is below every valid threshold, so the tracker counts such an eye as closed.
pub const UNMEASURABLE_EYE_RATIO: f32 = 0.0;

/// EAR of one eye plus the pixel contour it was computed from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeMeasurement {
    pub ratio: f32,
    /// P1..P6 in pixel space; `None` when the eye was unmeasurable
    pub points: Option<[PixelPoint; 6]>,
}

impl EyeMeasurement {
    pub fn unmeasurable() -> Self {
        Self {
            ratio: UNMEASURABLE_EYE_RATIO,
            points: None,
        }
    }

    pub fn is_measurable(&self) -> bool {
        self.points.is_some()
    }
}

/// Mean EAR over both eyes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvgEar {
    pub value: f32,
    pub left: EyeMeasurement,
    pub right: EyeMeasurement,
}

/// Euclidean distance between two pixel points
pub fn distance(a: PixelPoint, b: PixelPoint) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// EAR of six pixel-space contour points.
///
/// `None` when the corners coincide (zero horizontal spread).
pub fn compute_ear_from_points(points: &[PixelPoint; 6]) -> Option<f32> {
    let [p1, p2, p3, p4, p5, p6] = *points;

    let horizontal = distance(p1, p4);
    if horizontal == 0.0 {
        return None;
    }

    let ratio = (distance(p2, p6) + distance(p3, p5)) / (2.0 * horizontal);
    ratio.is_finite().then_some(ratio)
}

/// EAR of one eye from the full landmark set.
///
/// Never fails: a missing index, an invalid landmark or degenerate geometry
/// yields [`EyeMeasurement::unmeasurable`].
pub fn compute_ear(
    landmarks: &[NormalizedLandmark],
    indices: &EyeIndices,
    frame_width: u32,
    frame_height: u32,
) -> EyeMeasurement {
    let Some(points) = eye_points(landmarks, indices, frame_width, frame_height) else {
        return EyeMeasurement::unmeasurable();
    };

    match compute_ear_from_points(&points) {
        Some(ratio) => EyeMeasurement {
            ratio,
            points: Some(points),
        },
        None => EyeMeasurement::unmeasurable(),
    }
}

/// EAR of both eyes and their arithmetic mean
pub fn compute_avg_ear(
    landmarks: &[NormalizedLandmark],
    left: &EyeIndices,
    right: &EyeIndices,
    frame_width: u32,
    frame_height: u32,
) -> AvgEar {
    let left = compute_ear(landmarks, left, frame_width, frame_height);
    let right = compute_ear(landmarks, right, frame_width, frame_height);

    AvgEar {
        value: (left.ratio + right.ratio) / 2.0,
        left,
        right,
    }
}

fn eye_points(
    landmarks: &[NormalizedLandmark],
    indices: &EyeIndices,
    frame_width: u32,
    frame_height: u32,
) -> Option<[PixelPoint; 6]> {
    let mut points = [PixelPoint::default(); 6];
    for (slot, idx) in points.iter_mut().zip(indices.iter()) {
        let landmark = landmarks.get(idx)?;
        *slot = PixelPoint::from_normalized(*landmark, frame_width, frame_height)?;
    }
    Some(points)
}
