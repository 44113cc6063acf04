//! Pull-based frame sources

use std::future::Future;
use tokio::sync::mpsc;
use tracing::debug;

use crate::{CameraError, VideoFrame};

/// Asynchronous supplier of frames, one per call.
///
/// Consumers suspend on `next_frame` until a frame arrives. `None` means the
/// source has been closed and no further frames will come.
pub trait FrameSource {
    fn next_frame(&mut self) -> impl Future<Output = Option<VideoFrame>> + Send;
}

/// Producer half of a channel-backed frame source
#[derive(Clone)]
pub struct FrameSender {
    sender: mpsc::Sender<VideoFrame>,
}

impl FrameSender {
    /// Send a frame from async code
    pub async fn send(&self, frame: VideoFrame) -> Result<(), CameraError> {
        self.sender.send(frame).await.map_err(|_| CameraError::Closed)
    }
}

/// Frame source fed by a producer task through a bounded channel
pub struct ChannelFrameSource {
    receiver: mpsc::Receiver<VideoFrame>,
}

impl ChannelFrameSource {
    /// Create a connected sender/source pair
    pub fn channel(capacity: usize) -> (FrameSender, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (FrameSender { sender: tx }, Self { receiver: rx })
    }
}

impl FrameSource for ChannelFrameSource {
    async fn next_frame(&mut self) -> Option<VideoFrame> {
        let frame = self.receiver.recv().await;
        if frame.is_none() {
            debug!("Frame channel closed");
        }
        frame
    }
}
