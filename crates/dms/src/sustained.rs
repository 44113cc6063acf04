//! Sustained-deviation detection
//!
//! A signal must stay beyond its threshold (by magnitude) for `sustain`
//! before it triggers. Any in-threshold frame returns the detector to idle,
//! cancelling an alert in progress. A triggered alert stays asserted for at
//! most `display`, then the detector has to accumulate again.

use std::time::{Duration, Instant};

/// Detector phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SustainPhase {
    /// Signal within threshold
    Idle,
    /// Deviation seen continuously since the given instant
    Accumulating { since: Instant },
    /// Alert asserted since the given instant
    Triggered { at: Instant },
}

/// Debounced threshold detector shared by the yawn and head-pose signals
#[derive(Debug, Clone)]
pub struct SustainedDeviationDetector {
    threshold: f64,
    sustain: Duration,
    display: Duration,
    phase: SustainPhase,
}

impl SustainedDeviationDetector {
    pub fn new(threshold: f64, sustain: Duration, display: Duration) -> Self {
        Self {
            threshold,
            sustain,
            display,
            phase: SustainPhase::Idle,
        }
    }

    /// Feed one frame's value; returns whether the alert is asserted
    pub fn update(&mut self, value: f64, now: Instant) -> bool {
        if value.abs() <= self.threshold {
            self.phase = SustainPhase::Idle;
            return false;
        }

        match self.phase {
            SustainPhase::Triggered { at } => {
                if now.saturating_duration_since(at) > self.display {
                    self.phase = SustainPhase::Idle;
                    false
                } else {
                    true
                }
            }
            SustainPhase::Idle => {
                self.phase = SustainPhase::Accumulating { since: now };
                self.check_sustained(now)
            }
            SustainPhase::Accumulating { .. } => self.check_sustained(now),
        }
    }

    fn check_sustained(&mut self, now: Instant) -> bool {
        let SustainPhase::Accumulating { since } = self.phase else {
            return false;
        };
        if now.saturating_duration_since(since) >= self.sustain {
            self.phase = SustainPhase::Triggered { at: now };
            true
        } else {
            false
        }
    }

    pub fn phase(&self) -> SustainPhase {
        self.phase
    }

    pub fn is_triggered(&self) -> bool {
        matches!(self.phase, SustainPhase::Triggered { .. })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn sustain(&self) -> Duration {
        self.sustain
    }

    pub fn display(&self) -> Duration {
        self.display
    }

    pub fn reset(&mut self) {
        self.phase = SustainPhase::Idle;
    }
}
