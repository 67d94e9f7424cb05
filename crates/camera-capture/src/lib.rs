//! Camera Frame Types for Driver Monitoring
//!
//! Frames arrive here already decoded to RGB24. Acquisition itself (V4L2,
//! video files) lives outside this workspace; what matters downstream is the
//! pixel buffer, its dimensions and a monotonic capture timestamp.

pub mod frame;

pub use frame::VideoFrame;

use thiserror::Error;

/// Frame construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame has zero width or height ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },

    #[error("RGB data length mismatch: expected {expected} bytes, got {actual}")]
    DataLength { expected: usize, actual: usize },
}
