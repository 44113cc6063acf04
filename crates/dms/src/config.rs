//! DMS configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Named threshold sets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DmsPreset {
    #[default]
    Standard,
    Strict,
    Lenient,
}

/// Fixed detector settings that calibration does not personalize
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Closure at least this long is a prolonged blink (milliseconds)
    pub min_blink_duration_ms: u64,

    /// Trailing window for the blink rate (milliseconds)
    pub blink_rate_window_ms: u64,

    /// Blinks per minute above which the rate is a fatigue sign
    pub high_blink_rate: f64,

    /// Mouth aspect ratio above which the mouth counts as yawning
    pub mouth_ar_threshold: f64,

    /// Yaw deviation threshold (degrees)
    pub yaw_threshold_degrees: f64,

    /// Roll deviation threshold (degrees)
    pub roll_threshold_degrees: f64,

    /// How long yawn, yaw and roll deviations must persist (milliseconds)
    pub sustain_ms: u64,

    /// How long a triggered deviation alert stays asserted (milliseconds)
    pub alert_display_ms: u64,

    /// Enable head pose signals
    pub enable_pose: bool,

    /// Image size handed to the head-pose provider
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            min_blink_duration_ms: 200,
            blink_rate_window_ms: 60_000,
            high_blink_rate: 19.0,
            mouth_ar_threshold: 0.6,
            yaw_threshold_degrees: 20.0,
            roll_threshold_degrees: 20.0,
            sustain_ms: 3000,
            alert_display_ms: 1000,
            enable_pose: true,
            frame_width: camera_capture::NOMINAL_WIDTH,
            frame_height: camera_capture::NOMINAL_HEIGHT,
        }
    }
}

impl DmsConfig {
    pub fn from_preset(preset: DmsPreset) -> Self {
        match preset {
            DmsPreset::Standard => Self::default(),
            DmsPreset::Strict => Self::strict(),
            DmsPreset::Lenient => Self::lenient(),
        }
    }

    /// Create strict config (lower thresholds)
    pub fn strict() -> Self {
        Self {
            mouth_ar_threshold: 0.5,
            yaw_threshold_degrees: 15.0,
            roll_threshold_degrees: 15.0,
            sustain_ms: 2000,
            ..Default::default()
        }
    }

    /// Create lenient config (higher thresholds)
    pub fn lenient() -> Self {
        Self {
            mouth_ar_threshold: 0.75,
            yaw_threshold_degrees: 30.0,
            roll_threshold_degrees: 30.0,
            sustain_ms: 4000,
            ..Default::default()
        }
    }

    pub fn min_blink_duration(&self) -> Duration {
        Duration::from_millis(self.min_blink_duration_ms)
    }

    pub fn blink_rate_window(&self) -> Duration {
        Duration::from_millis(self.blink_rate_window_ms)
    }

    pub fn sustain(&self) -> Duration {
        Duration::from_millis(self.sustain_ms)
    }

    pub fn alert_display(&self) -> Duration {
        Duration::from_millis(self.alert_display_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_move_thresholds() {
        let standard = DmsConfig::from_preset(DmsPreset::Standard);
        let strict = DmsConfig::from_preset(DmsPreset::Strict);
        let lenient = DmsConfig::from_preset(DmsPreset::Lenient);

        assert_eq!(standard.mouth_ar_threshold, 0.6);
        assert_eq!(strict.mouth_ar_threshold, 0.5);
        assert_eq!(lenient.mouth_ar_threshold, 0.75);

        assert_eq!(strict.yaw_threshold_degrees, 15.0);
        assert_eq!(lenient.roll_threshold_degrees, 30.0);
        assert_eq!(strict.sustain(), Duration::from_secs(2));
        assert_eq!(lenient.sustain(), Duration::from_secs(4));

        // Blink and display settings are shared
        assert_eq!(strict.min_blink_duration_ms, standard.min_blink_duration_ms);
        assert_eq!(lenient.alert_display_ms, standard.alert_display_ms);
    }

    #[test]
    fn test_preset_names() {
        let preset: DmsPreset = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(preset, DmsPreset::Strict);
        assert!(serde_json::from_str::<DmsPreset>("\"paranoid\"").is_err());
    }
}
