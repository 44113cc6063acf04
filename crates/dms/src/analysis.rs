//! DMS analysis results and alerts

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::detector::HeadPose;

/// Fatigue conditions that warrant the audio cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmsAlert {
    /// Eyes stayed closed for a long blink
    ProlongedBlink,

    /// Blink rate above the fatigue threshold
    HighBlinkRate,

    /// Mouth held wide open
    Yawning,

    /// Head pitched away from the personal baseline (nodding off)
    HeadTilt,

    /// Head turned left or right
    HeadYaw,

    /// Head leaning sideways
    HeadRoll,
}

impl fmt::Display for DmsAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DmsAlert::ProlongedBlink => "Fatigue Alert: Prolonged Blink!",
            DmsAlert::HighBlinkRate => "Fatigue Alert: High Blink Rate!",
            DmsAlert::Yawning => "Fatigue Alert: Yawning Detected!",
            DmsAlert::HeadTilt => "Fatigue Alert: Prolonged Head Tilt!",
            DmsAlert::HeadYaw => "Fatigue Alert: Prolonged Yaw!",
            DmsAlert::HeadRoll => "Fatigue Alert: Prolonged Roll!",
        };
        f.write_str(text)
    }
}

/// One line of per-frame output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DmsMessage {
    /// A blink just finished
    Blink { duration_secs: f64, total: u64 },

    /// Current blinks per minute
    BlinkRate(f64),

    /// A fatigue condition
    Alert(DmsAlert),
}

impl DmsMessage {
    pub fn alert(&self) -> Option<DmsAlert> {
        match self {
            DmsMessage::Alert(alert) => Some(*alert),
            _ => None,
        }
    }
}

impl fmt::Display for DmsMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DmsMessage::Blink {
                duration_secs,
                total,
            } => write!(
                f,
                "Blink detected! Duration: {:.3} sec | Total Blinks: {}",
                duration_secs, total
            ),
            DmsMessage::BlinkRate(rate) => write!(f, "Blink Rate: {:.1} blinks/min", rate),
            DmsMessage::Alert(alert) => write!(f, "{}", alert),
        }
    }
}

/// Everything one frame produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertBatch {
    /// Whether a face was present
    pub face_detected: bool,

    /// Mean eye aspect ratio of both eyes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ear: Option<f64>,

    /// Mouth aspect ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mar: Option<f64>,

    /// Head pose (pitch, yaw, roll)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_pose: Option<HeadPose>,

    /// Adaptive blink threshold after this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blink_threshold: Option<f64>,

    /// Ordered messages: blink, yawn, pitch, yaw, roll
    pub messages: Vec<DmsMessage>,

    /// Whether this frame played the audio cue
    pub cue_played: bool,
}

impl AlertBatch {
    /// Batch for a frame without a face
    pub fn no_face() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Fatigue alerts in message order
    pub fn alerts(&self) -> impl Iterator<Item = DmsAlert> + '_ {
        self.messages.iter().filter_map(DmsMessage::alert)
    }

    /// Check if any alerts are active
    pub fn has_alerts(&self) -> bool {
        self.alerts().next().is_some()
    }

    /// Human-readable lines in order
    pub fn lines(&self) -> Vec<String> {
        self.messages.iter().map(ToString::to_string).collect()
    }

    /// Get highest severity alert
    pub fn highest_severity_alert(&self) -> Option<DmsAlert> {
        // Priority: ProlongedBlink > HeadTilt > Yawning > others in order
        [DmsAlert::ProlongedBlink, DmsAlert::HeadTilt, DmsAlert::Yawning]
            .into_iter()
            .find(|candidate| self.alerts().any(|a| a == *candidate))
            .or_else(|| self.alerts().next())
    }
}
