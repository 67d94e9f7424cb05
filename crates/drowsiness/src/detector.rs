//! Landmark source seam
//!
//! Face mesh models (MediaPipe, ONNX ports, ...) live outside this crate and
//! plug in through [`LandmarkSource`].

use camera_capture::VideoFrame;

use crate::landmark::FaceLandmarks;
use crate::DrowsinessError;

/// Facial landmark detector
pub trait LandmarkSource {
    /// Detect faces in a frame.
    ///
    /// Returns one landmark set per face with coordinates normalized to the
    /// frame; an empty vec means no face. Only the first face is tracked.
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DrowsinessError>;
}

impl<F> LandmarkSource for F
where
    F: FnMut(&VideoFrame) -> Result<Vec<FaceLandmarks>, DrowsinessError>,
{
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<FaceLandmarks>, DrowsinessError> {
        self(frame)
    }
}
