//! Calibration profile document

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::StorageError;

/// Blink detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlinkParams {
    /// EMA smoothing factor for the eyes-open baseline
    pub alpha: f64,
    /// Distance below the baseline that counts as closed
    pub threshold_delta: f64,
    /// Minimum consecutive closed frames for a blink
    pub hysteresis_frames: u32,
}

/// Head pose detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadPoseParams {
    /// Pitch deviation threshold (degrees)
    pub pitch_threshold: f64,
    /// Seconds a deviation must persist before alerting
    pub sustain_time: f64,
}

/// Statistics observed during calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineStats {
    pub avg_ear: f64,
    pub avg_pitch: f64,
    /// Blinks per minute
    pub blink_rate: f64,
}

/// Per-user calibration profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub blink: BlinkParams,
    pub head_pose: HeadPoseParams,
    pub baseline: BaselineStats,
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            blink: BlinkParams {
                alpha: 0.1,
                threshold_delta: 0.02,
                hysteresis_frames: 3,
            },
            head_pose: HeadPoseParams {
                pitch_threshold: 20.0,
                sustain_time: 3.0,
            },
            baseline: BaselineStats {
                avg_ear: 0.0,
                avg_pitch: 0.0,
                blink_rate: 0.0,
            },
        }
    }
}

impl CalibrationProfile {
    /// Sustain time as a `Duration`, saturating outside the representable range
    pub fn sustain_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.head_pose.sustain_time.max(0.0))
            .unwrap_or(Duration::MAX)
    }

    /// Reject profiles whose parameters would break the detectors
    pub fn validate(&self) -> Result<(), StorageError> {
        let floats = [
            ("blink.alpha", self.blink.alpha),
            ("blink.threshold_delta", self.blink.threshold_delta),
            ("head_pose.pitch_threshold", self.head_pose.pitch_threshold),
            ("head_pose.sustain_time", self.head_pose.sustain_time),
            ("baseline.avg_ear", self.baseline.avg_ear),
            ("baseline.avg_pitch", self.baseline.avg_pitch),
            ("baseline.blink_rate", self.baseline.blink_rate),
        ];

        if let Some((field, value)) = floats.iter().find(|(_, v)| !v.is_finite()) {
            return Err(StorageError::ProfileCorrupt(format!(
                "{} is not finite ({})",
                field, value
            )));
        }

        if !(self.blink.alpha > 0.0 && self.blink.alpha <= 1.0) {
            return Err(StorageError::ProfileCorrupt(format!(
                "blink.alpha {} outside (0, 1]",
                self.blink.alpha
            )));
        }

        if self.blink.threshold_delta < 0.0 {
            return Err(StorageError::ProfileCorrupt(
                "blink.threshold_delta is negative".to_string(),
            ));
        }

        if self.blink.hysteresis_frames == 0 {
            return Err(StorageError::ProfileCorrupt(
                "blink.hysteresis_frames is zero".to_string(),
            ));
        }

        if self.head_pose.sustain_time < 0.0 {
            return Err(StorageError::ProfileCorrupt(
                "head_pose.sustain_time is negative".to_string(),
            ));
        }

        if Duration::try_from_secs_f64(self.head_pose.sustain_time).is_err() {
            return Err(StorageError::ProfileCorrupt(format!(
                "head_pose.sustain_time {} is out of range",
                self.head_pose.sustain_time
            )));
        }

        Ok(())
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    /// Parse and validate a JSON profile document
    pub fn from_json(text: &str) -> Result<Self, StorageError> {
        let profile: Self = serde_json::from_str(text)
            .map_err(|e| StorageError::ProfileCorrupt(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }
}
