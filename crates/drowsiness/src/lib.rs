//! Driver Drowsiness Detection
//!
//! Real-time eyes-closed alarm from facial landmarks:
//! - Eye aspect ratio (EAR) per eye and averaged over both eyes
//! - Eyes-closed streak timer with a debounced alarm
//! - Per-frame monitor wiring a landmark source, the estimator and the tracker

pub mod analysis;
pub mod config;
pub mod detector;
pub mod ear;
pub mod landmark;
pub mod tracker;

pub use analysis::FrameAnalysis;
pub use crate::config::DrowsinessConfig;
pub use detector::LandmarkSource;
pub use ear::{compute_avg_ear, compute_ear, AvgEar, EyeMeasurement};
pub use landmark::{
    EyeIndices, FaceLandmarks, NormalizedLandmark, PixelPoint, LEFT_EYE, RIGHT_EYE,
};
pub use tracker::{
    DisplayState, DrowsinessTracker, SessionClock, Thresholds, TrackerOutput, TrackerState,
};

use std::time::Duration;

use camera_capture::VideoFrame;
use metrics::{counter, gauge};
use thiserror::Error;
use tracing::debug;

/// Drowsiness detection error types
#[derive(Error, Debug)]
pub enum DrowsinessError {
    #[error("Invalid threshold {name}: {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Invalid eye indices: {0}")]
    InvalidEyeIndices(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Landmark inference failed: {0}")]
    Inference(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

/// Reject frames with a zero dimension; no landmark can be placed on them
pub fn check_frame_size(width: u32, height: u32) -> Result<(), DrowsinessError> {
    if width == 0 || height == 0 {
        return Err(DrowsinessError::InvalidFrame(format!("{}x{} frame", width, height)));
    }
    Ok(())
}

/// Drowsiness monitor for one subject
pub struct DrowsinessMonitor {
    left_eye: EyeIndices,
    right_eye: EyeIndices,
    tracker: DrowsinessTracker,
}

impl DrowsinessMonitor {
    /// Create a monitor; the session clock starts at zero
    pub fn new(config: &DrowsinessConfig) -> Result<Self, DrowsinessError> {
        Self::starting_at(config, Duration::ZERO)
    }

    /// Create a monitor whose session starts at `start`
    pub fn starting_at(
        config: &DrowsinessConfig,
        start: Duration,
    ) -> Result<Self, DrowsinessError> {
        config.validate()?;
        Ok(Self {
            left_eye: config.left_eye,
            right_eye: config.right_eye,
            tracker: DrowsinessTracker::starting_at(config.thresholds()?, start),
        })
    }

    /// Run the landmark source on a frame and update the tracker.
    ///
    /// Source errors are returned as-is and leave the tracker untouched.
    pub fn process_frame<S>(
        &mut self,
        source: &mut S,
        frame: &VideoFrame,
    ) -> Result<FrameAnalysis, DrowsinessError>
    where
        S: LandmarkSource + ?Sized,
    {
        check_frame_size(frame.width, frame.height)?;

        let faces = source.detect(frame)?;
        if faces.len() > 1 {
            debug!(faces = faces.len(), "Multiple faces detected, tracking the first");
        }

        Ok(self.process_landmarks(
            faces.first().map(Vec::as_slice),
            frame.width,
            frame.height,
            frame.timestamp(),
        ))
    }

    /// Update the tracker from the first face's landmarks (`None` = no face).
    ///
    /// Callers feeding landmarks directly should reject empty frames with
    /// [`check_frame_size`] first: every eye is unmeasurable on them.
    pub fn process_landmarks(
        &mut self,
        face: Option<&[NormalizedLandmark]>,
        frame_width: u32,
        frame_height: u32,
        now: Duration,
    ) -> FrameAnalysis {
        counter!("drowsiness_frames_total").increment(1);

        let Some(landmarks) = face else {
            counter!("drowsiness_no_face_frames_total").increment(1);
            let output = self.tracker.observe(None, now);
            return FrameAnalysis::no_face(&output, self.elapsed_secs());
        };

        let ear = compute_avg_ear(
            landmarks,
            &self.left_eye,
            &self.right_eye,
            frame_width,
            frame_height,
        );
        if !ear.left.is_measurable() || !ear.right.is_measurable() {
            // The unmeasurable eye contributes a zero ratio, pulling the
            // average down: it is treated as closed.
            debug!(
                left = ear.left.is_measurable(),
                right = ear.right.is_measurable(),
                "Unmeasurable eye counted as closed"
            );
        }
        gauge!("drowsiness_avg_ear").set(ear.value as f64);

        let output = self.tracker.observe(Some(ear.value), now);
        if output.alarm_raised {
            counter!("drowsiness_alarms_raised_total").increment(1);
        }

        FrameAnalysis::with_face(&ear, &output, self.elapsed_secs())
    }

    /// Hard reset, e.g. on driver change
    pub fn reset(&mut self, now: Duration) {
        self.tracker.reset(now);
    }

    pub fn tracker(&self) -> &DrowsinessTracker {
        &self.tracker
    }

    fn elapsed_secs(&self) -> f64 {
        self.tracker.drowsy_elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::FACE_MESH_LANDMARKS;

    const W: u32 = 640;
    const H: u32 = 480;

    /// Face whose eyes have the given EAR: 40px wide, lids 40*ear px apart
    fn face_with_ear(ear: f32) -> FaceLandmarks {
        let mut mesh = vec![NormalizedLandmark::new(0.5, 0.5); FACE_MESH_LANDMARKS];
        let gap = 40.0 * ear;
        for (eye, ox) in [(LEFT_EYE, 380.0), (RIGHT_EYE, 220.0)] {
            let oy = 200.0;
            let contour = [
                (ox, oy),
                (ox + 10.0, oy - gap / 2.0),
                (ox + 30.0, oy - gap / 2.0),
                (ox + 40.0, oy),
                (ox + 30.0, oy + gap / 2.0),
                (ox + 10.0, oy + gap / 2.0),
            ];
            for (idx, (x, y)) in eye.iter().zip(contour) {
                mesh[idx] = NormalizedLandmark::new((x + 0.5) / W as f32, (y + 0.5) / H as f32);
            }
        }
        mesh
    }

    fn config() -> DrowsinessConfig {
        DrowsinessConfig {
            ear_thresh: 0.2,
            wait_time_secs: 2.0,
            ..Default::default()
        }
    }

    fn at(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn frame_at(ms: u64, sequence: u32) -> VideoFrame {
        VideoFrame::blank(W, H, ms * 1_000_000, sequence).unwrap()
    }

    #[test]
    fn test_eyes_closed_scenario() {
        let mut monitor = DrowsinessMonitor::new(&config()).unwrap();
        let closed = face_with_ear(0.15);

        for (i, ms) in [0u64, 500, 1000, 1500].into_iter().enumerate() {
            let analysis = monitor.process_landmarks(Some(closed.as_slice()), W, H, at(ms));
            assert!(!analysis.alarm_active, "frame {}", i);
            assert_eq!(analysis.display_state, DisplayState::Drowsy);
            assert!((analysis.avg_ear - 0.15).abs() < 0.02);
        }
        assert_eq!(monitor.tracker().drowsy_elapsed(), at(1500));

        let analysis = monitor.process_landmarks(Some(closed.as_slice()), W, H, at(2000));
        assert!(analysis.alarm_active);
        assert!(analysis.alarm_raised);
        assert_eq!(analysis.drowsy_elapsed_secs, 2.0);

        let analysis = monitor.process_landmarks(Some(closed.as_slice()), W, H, at(2500));
        assert!(analysis.alarm_active);
        assert!(!analysis.alarm_raised);
    }

    #[test]
    fn test_open_eyes_scenario() {
        let mut monitor = DrowsinessMonitor::new(&config()).unwrap();
        let closed = face_with_ear(0.15);

        monitor.process_landmarks(Some(closed.as_slice()), W, H, at(0));
        let analysis = monitor.process_landmarks(Some(closed.as_slice()), W, H, at(500));
        assert_eq!(analysis.drowsy_elapsed_secs, 0.5);

        let open = face_with_ear(0.3);
        let analysis = monitor.process_landmarks(Some(open.as_slice()), W, H, at(800));
        assert_eq!(analysis.drowsy_elapsed_secs, 0.0);
        assert!(!analysis.alarm_active);
        assert_eq!(analysis.display_state, DisplayState::Awake);
        assert!(analysis.left_points.is_some() && analysis.right_points.is_some());
    }

    #[test]
    fn test_no_face_scenario() {
        let mut monitor = DrowsinessMonitor::new(&config()).unwrap();
        let closed = face_with_ear(0.1);
        for ms in [0u64, 1000, 2000, 3000] {
            monitor.process_landmarks(Some(closed.as_slice()), W, H, at(ms));
        }
        assert!(monitor.tracker().alarm_active());

        let analysis = monitor.process_landmarks(None, W, H, at(3100));
        assert!(!analysis.face_detected);
        assert_eq!(analysis.drowsy_elapsed_secs, 0.0);
        assert!(!analysis.alarm_active);
        assert_eq!(analysis.display_state, DisplayState::Awake);
    }

    #[test]
    fn test_unmeasurable_face_counts_as_closed() {
        let mut monitor = DrowsinessMonitor::new(&config()).unwrap();
        let truncated = vec![NormalizedLandmark::new(0.5, 0.5); 100];

        let analysis = monitor.process_landmarks(Some(truncated.as_slice()), W, H, at(100));
        assert!(analysis.face_detected);
        assert_eq!(analysis.avg_ear, 0.0);
        assert!(analysis.left_points.is_none());
        assert_eq!(analysis.display_state, DisplayState::Drowsy);
        assert_eq!(analysis.drowsy_elapsed_secs, 0.1);
    }

    #[test]
    fn test_process_frame_uses_first_face_and_timestamp() {
        let mut monitor = DrowsinessMonitor::new(&config()).unwrap();
        let mut source = |_: &VideoFrame| -> Result<Vec<FaceLandmarks>, DrowsinessError> {
            Ok(vec![face_with_ear(0.1), face_with_ear(0.35)])
        };

        monitor.process_frame(&mut source, &frame_at(0, 0)).unwrap();
        let analysis = monitor.process_frame(&mut source, &frame_at(2500, 1)).unwrap();
        assert!(analysis.alarm_active);
        assert_eq!(analysis.drowsy_elapsed_secs, 2.5);
    }

    #[test]
    fn test_process_frame_empty_detection_resets() {
        let mut monitor = DrowsinessMonitor::new(&config()).unwrap();
        let mut closed = |_: &VideoFrame| -> Result<Vec<FaceLandmarks>, DrowsinessError> {
            Ok(vec![face_with_ear(0.1)])
        };
        monitor.process_frame(&mut closed, &frame_at(0, 0)).unwrap();
        monitor.process_frame(&mut closed, &frame_at(700, 1)).unwrap();

        let mut empty: Box<dyn LandmarkSource> =
            Box::new(|_: &VideoFrame| -> Result<Vec<FaceLandmarks>, DrowsinessError> {
                Ok(Vec::new())
            });
        let analysis = monitor.process_frame(&mut *empty, &frame_at(900, 2)).unwrap();
        assert!(!analysis.face_detected);
        assert_eq!(monitor.tracker().drowsy_elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_source_error_leaves_tracker_untouched() {
        let mut monitor = DrowsinessMonitor::new(&config()).unwrap();
        let closed = face_with_ear(0.1);
        monitor.process_landmarks(Some(closed.as_slice()), W, H, at(0));
        monitor.process_landmarks(Some(closed.as_slice()), W, H, at(400));
        let before = *monitor.tracker().state();

        let mut failing = |_: &VideoFrame| -> Result<Vec<FaceLandmarks>, DrowsinessError> {
            Err(DrowsinessError::Inference("model not loaded".into()))
        };
        let err = monitor.process_frame(&mut failing, &frame_at(600, 2)).unwrap_err();
        assert!(matches!(err, DrowsinessError::Inference(_)));
        assert_eq!(*monitor.tracker().state(), before);
    }

    #[test]
    fn test_zero_sized_frame_rejected() {
        let mut monitor = DrowsinessMonitor::new(&config()).unwrap();
        let mut frame = frame_at(0, 0);
        frame.width = 0;

        let mut source =
            |_: &VideoFrame| -> Result<Vec<FaceLandmarks>, DrowsinessError> { Ok(Vec::new()) };
        let err = monitor.process_frame(&mut source, &frame).unwrap_err();
        assert!(matches!(err, DrowsinessError::InvalidFrame(_)));
    }

    #[test]
    fn test_check_frame_size() {
        assert!(check_frame_size(W, H).is_ok());
        assert!(matches!(check_frame_size(0, H), Err(DrowsinessError::InvalidFrame(_))));
        assert!(matches!(check_frame_size(W, 0), Err(DrowsinessError::InvalidFrame(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DrowsinessConfig {
            wait_time_secs: -1.0,
            ..Default::default()
        };
        assert!(DrowsinessMonitor::new(&config).is_err());
    }

    #[test]
    fn test_independent_monitors() {
        let mut a = DrowsinessMonitor::new(&config()).unwrap();
        let mut b = DrowsinessMonitor::new(&config()).unwrap();
        let closed = face_with_ear(0.1);

        a.process_landmarks(Some(closed.as_slice()), W, H, at(1000));
        b.process_landmarks(None, W, H, at(1000));

        assert_eq!(a.tracker().drowsy_elapsed(), at(1000));
        assert_eq!(b.tracker().drowsy_elapsed(), Duration::ZERO);
    }
}
