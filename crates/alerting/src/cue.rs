//! Audio cue sinks

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Something that plays the alert sound.
///
/// `trigger` takes no arguments and must be idempotent while a cue is
/// already playing.
pub trait AudioCue: Send + Sync {
    fn trigger(&self);
}

impl<T: AudioCue + ?Sized> AudioCue for Arc<T> {
    fn trigger(&self) {
        (**self).trigger()
    }
}

/// Cue sink that only writes a log line, for headless runs
#[derive(Debug, Default)]
pub struct LogCue;

impl AudioCue for LogCue {
    fn trigger(&self) {
        warn!("ALERT CUE");
    }
}

/// Cue sink that counts triggers
#[derive(Debug, Default)]
pub struct CountingCue {
    count: AtomicUsize,
}

impl CountingCue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl AudioCue for CountingCue {
    fn trigger(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_cue_through_arc() {
        let cue = Arc::new(CountingCue::new());
        let sink: Box<dyn AudioCue> = Box::new(cue.clone());

        sink.trigger();
        sink.trigger();
        assert_eq!(cue.count(), 2);
    }
}
