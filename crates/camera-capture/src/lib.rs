//! Camera Capture Library for Fatigue Monitoring
//!
//! Provides the frame types and the pull-based frame source contract:
//! - `VideoFrame` carries one captured image plus capture metadata
//! - `FrameSource` suspends until the next frame is available
//! - `ChannelFrameSource` bridges a producer task to async consumers

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{ChannelFrameSource, FrameSender, FrameSource};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Frame source closed")]
    Closed,

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

/// Nominal frame size used when a collaborator needs image dimensions
pub const NOMINAL_WIDTH: u32 = 640;
pub const NOMINAL_HEIGHT: u32 = 480;
