//! Alert Manager Implementation

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Minimum time between two audio cues (milliseconds)
    pub cooldown_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self { cooldown_ms: 5000 }
    }
}

impl AlertConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Global cooldown gate for the audio cue.
///
/// One gate covers every alert kind, so a burst of different fatigue alerts
/// still produces a single cue per cooldown window.
pub struct AlertManager {
    config: AlertConfig,
    last_fired: Option<Instant>,
    fire_count: usize,
    suppressed_count: usize,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            last_fired: None,
            fire_count: 0,
            suppressed_count: 0,
        }
    }

    /// Check if the cooldown allows a cue at `now`
    pub fn should_fire(&self, now: Instant) -> bool {
        match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.config.cooldown(),
        }
    }

    /// Record that a cue was played at `now`
    pub fn record_fire(&mut self, now: Instant) {
        self.last_fired = Some(now);
        self.fire_count += 1;
        info!("Alert cue fired (count: {})", self.fire_count);
    }

    /// Fire if the cooldown allows it; returns whether the cue should play
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if self.should_fire(now) {
            self.record_fire(now);
            true
        } else {
            self.suppressed_count += 1;
            debug!("Alert cue suppressed: in cooldown period");
            false
        }
    }

    /// Time of the last cue
    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }

    /// Number of cues played
    pub fn fire_count(&self) -> usize {
        self.fire_count
    }

    /// Number of cues swallowed by the cooldown
    pub fn suppressed_count(&self) -> usize {
        self.suppressed_count
    }

    /// Forget cue history
    pub fn clear(&mut self) {
        self.last_fired = None;
        self.fire_count = 0;
        self.suppressed_count = 0;
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}
