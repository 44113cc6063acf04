//! Video frame types

use crate::CameraError;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3), empty for metadata-only frames
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, CameraError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(CameraError::InvalidFrame(format!(
                "expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        })
    }

    /// Frame without pixel data, for sources whose landmarks were recorded upstream
    pub fn metadata_only(width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data: Vec::new(),
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Whether pixel data is attached
    pub fn has_pixels(&self) -> bool {
        !self.data.is_empty()
    }

    /// Capture timestamp in milliseconds
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ns / 1_000_000
    }
}
