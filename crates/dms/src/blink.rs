//! Adaptive blink detection
//!
//! The eyes-open baseline is an exponential moving average of EAR that only
//! moves while the eye is open, so a blink cannot drag it down. A closure has
//! to last `hysteresis_frames` frames before the reopening counts as a blink.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use storage::CalibrationProfile;
use tracing::debug;

use crate::analysis::{DmsAlert, DmsMessage};
use crate::DmsConfig;

/// Blink detector parameters
#[derive(Debug, Clone)]
pub struct BlinkSettings {
    /// EMA smoothing factor
    pub alpha: f64,
    /// Threshold sits this far below the EMA
    pub threshold_delta: f64,
    /// Minimum consecutive closed frames for a blink
    pub hysteresis_frames: u32,
    /// A blink lasting at least this long is prolonged
    pub min_blink_duration: Duration,
    /// Trailing window for the blink rate
    pub rate_window: Duration,
    /// Blinks per minute above which the rate is flagged
    pub high_rate: f64,
}

impl Default for BlinkSettings {
    fn default() -> Self {
        Self::from_profile(&CalibrationProfile::default(), &DmsConfig::default())
    }
}

impl BlinkSettings {
    /// Personalized parameters from a profile, fixed ones from the config
    pub fn from_profile(profile: &CalibrationProfile, config: &DmsConfig) -> Self {
        Self {
            alpha: profile.blink.alpha,
            threshold_delta: profile.blink.threshold_delta,
            hysteresis_frames: profile.blink.hysteresis_frames,
            min_blink_duration: config.min_blink_duration(),
            rate_window: config.blink_rate_window(),
            high_rate: config.high_blink_rate,
        }
    }
}

/// A completed blink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlinkEvent {
    /// Frame on which the eye reopened
    pub at: Instant,
    /// Time from the first closed frame to reopening
    pub duration: Duration,
    /// Blink count including this one
    pub total: u64,
    /// Duration reached the prolonged-blink threshold
    pub prolonged: bool,
}

/// Result of one `BlinkDetector::update`
#[derive(Debug, Clone)]
pub struct BlinkUpdate {
    /// Dynamic threshold (`ema - threshold_delta`) used for this frame
    pub threshold: f64,
    /// Blinks per minute over the trailing window
    pub rate: f64,
    /// Blink completed on this frame, if any
    pub blink: Option<BlinkEvent>,
    /// Blink line, prolonged flag, rate line, high-rate flag, in that order
    pub messages: Vec<DmsMessage>,
}

impl BlinkUpdate {
    pub fn high_rate(&self) -> bool {
        self.messages
            .contains(&DmsMessage::Alert(DmsAlert::HighBlinkRate))
    }
}

/// EMA-baseline blink detector with hysteresis and a blink-rate window
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    settings: BlinkSettings,
    ema: Option<f64>,
    closed_frames: u32,
    blink_start: Option<Instant>,
    recent_blinks: VecDeque<Instant>,
    blink_count: u64,
    last_blink: Option<BlinkEvent>,
}

impl BlinkDetector {
    pub fn new(settings: BlinkSettings) -> Self {
        Self {
            settings,
            ema: None,
            closed_frames: 0,
            blink_start: None,
            recent_blinks: VecDeque::new(),
            blink_count: 0,
            last_blink: None,
        }
    }

    /// Feed one frame's EAR
    pub fn update(&mut self, ear: f64, now: Instant) -> BlinkUpdate {
        let delta = self.settings.threshold_delta;
        let alpha = self.settings.alpha;
        let mut messages = Vec::new();
        let mut blink = None;

        let mut ema = *self.ema.get_or_insert(ear);
        let provisional = ema - delta;
        if ear >= provisional {
            ema = alpha * ear + (1.0 - alpha) * ema;
        }
        self.ema = Some(ema);

        let threshold = ema - delta;

        if ear < threshold {
            if self.blink_start.is_none() {
                self.blink_start = Some(now);
            }
            self.closed_frames += 1;
        } else {
            if self.closed_frames >= self.settings.hysteresis_frames {
                let duration = now.saturating_duration_since(self.blink_start.unwrap_or(now));
                self.blink_count += 1;
                self.recent_blinks.push_back(now);

                let event = BlinkEvent {
                    at: now,
                    duration,
                    total: self.blink_count,
                    prolonged: duration >= self.settings.min_blink_duration,
                };
                debug!(
                    "Blink #{} after {} closed frames ({:?})",
                    event.total, self.closed_frames, duration
                );

                messages.push(DmsMessage::Blink {
                    duration_secs: duration.as_secs_f64(),
                    total: event.total,
                });
                if event.prolonged {
                    messages.push(DmsMessage::Alert(DmsAlert::ProlongedBlink));
                }

                self.last_blink = Some(event);
                blink = Some(event);
            }
            self.closed_frames = 0;
            self.blink_start = None;
        }

        let rate = self.prune_and_rate(now);
        messages.push(DmsMessage::BlinkRate(rate));
        if rate > self.settings.high_rate {
            messages.push(DmsMessage::Alert(DmsAlert::HighBlinkRate));
        }

        BlinkUpdate {
            threshold,
            rate,
            blink,
            messages,
        }
    }

    /// Drop blinks outside the trailing window and return blinks per minute.
    /// A blink exactly one window old is outside.
    fn prune_and_rate(&mut self, now: Instant) -> f64 {
        let window = self.settings.rate_window;
        self.recent_blinks
            .retain(|&at| now.saturating_duration_since(at) < window);

        let window_secs = window.as_secs_f64();
        if window_secs <= 0.0 {
            return 0.0;
        }
        self.recent_blinks.len() as f64 * (60.0 / window_secs)
    }

    /// Current eyes-open baseline
    pub fn ema(&self) -> Option<f64> {
        self.ema
    }

    /// Current dynamic threshold
    pub fn threshold(&self) -> Option<f64> {
        self.ema.map(|ema| ema - self.settings.threshold_delta)
    }

    /// Blinks since creation or the last reset
    pub fn blink_count(&self) -> u64 {
        self.blink_count
    }

    pub fn last_blink(&self) -> Option<BlinkEvent> {
        self.last_blink
    }

    pub fn settings(&self) -> &BlinkSettings {
        &self.settings
    }

    /// Forget all history (driver change)
    pub fn reset(&mut self) {
        *self = Self::new(self.settings.clone());
    }
}
