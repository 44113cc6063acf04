//! Driver Monitoring System (DMS)
//!
//! Real-time fatigue inference from facial landmarks:
//! - Adaptive blink detection and blink rate
//! - Yawn detection from mouth opening
//! - Sustained head pitch, yaw and roll deviation
//! - Per-driver calibration of the blink and pitch parameters

pub mod analysis;
pub mod blink;
pub mod calibration;
pub mod config;
pub mod detector;
pub mod state;
pub mod sustained;

pub use analysis::{AlertBatch, DmsAlert, DmsMessage};
pub use blink::{BlinkDetector, BlinkEvent, BlinkSettings, BlinkUpdate};
pub use calibration::{CalibrationConfig, CalibrationOutcome, CalibrationSession, MidpointBlinkCounter};
pub use config::{DmsConfig, DmsPreset};
pub use detector::{FaceLandmarkProvider, HeadPose, HeadPoseProvider, LandmarkPoseEstimator};
pub use state::PitchBaseline;
pub use sustained::{SustainPhase, SustainedDeviationDetector};

use alerting::{AlertConfig, AlertManager, AudioCue};
use feature_engine::{average_eye_aspect_ratio, mouth_aspect_ratio, LandmarkSet, MetricError};
use std::time::Instant;
use storage::{CalibrationProfile, StorageError};
use thiserror::Error;
use tracing::{debug, info};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Invalid landmark input: {0}")]
    InvalidInput(#[from] MetricError),

    #[error("No face detected")]
    NoFace,

    #[error("Head pose unavailable")]
    PoseUnavailable,

    #[error("Not enough calibration samples: {0}")]
    InsufficientSamples(String),

    #[error("Profile storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Driver fatigue monitor.
///
/// One instance per driver. Takes the landmarks of each frame and returns the
/// messages and alerts that frame produced, playing the audio cue at most once
/// per cooldown.
pub struct FatigueMonitor {
    config: DmsConfig,
    profile: CalibrationProfile,
    blink: BlinkDetector,
    yawn: SustainedDeviationDetector,
    pitch: SustainedDeviationDetector,
    yaw: SustainedDeviationDetector,
    roll: SustainedDeviationDetector,
    pitch_baseline: PitchBaseline,
    pose: Box<dyn HeadPoseProvider>,
    cue: Box<dyn AudioCue>,
    alerts: AlertManager,
}

impl FatigueMonitor {
    /// Create a monitor from a calibration profile
    pub fn new(
        config: DmsConfig,
        alert_config: AlertConfig,
        profile: CalibrationProfile,
        pose: Box<dyn HeadPoseProvider>,
        cue: Box<dyn AudioCue>,
    ) -> Self {
        let display = config.alert_display();
        let sustain = config.sustain();

        info!(
            "Fatigue monitor ready (pitch threshold {:.1}, hysteresis {} frames)",
            profile.head_pose.pitch_threshold, profile.blink.hysteresis_frames
        );

        Self {
            blink: BlinkDetector::new(BlinkSettings::from_profile(&profile, &config)),
            yawn: SustainedDeviationDetector::new(config.mouth_ar_threshold, sustain, display),
            pitch: SustainedDeviationDetector::new(
                profile.head_pose.pitch_threshold.abs(),
                profile.sustain_duration(),
                display,
            ),
            yaw: SustainedDeviationDetector::new(config.yaw_threshold_degrees, sustain, display),
            roll: SustainedDeviationDetector::new(config.roll_threshold_degrees, sustain, display),
            pitch_baseline: PitchBaseline::new(profile.blink.alpha),
            pose,
            cue,
            alerts: AlertManager::new(alert_config),
            config,
            profile,
        }
    }

    /// Process one frame's landmarks. `None` means no face was found.
    ///
    /// Only a landmark set too short to hold both eyes is an error.
    pub fn process_frame(
        &mut self,
        landmarks: Option<&LandmarkSet>,
        now: Instant,
    ) -> Result<AlertBatch, DmsError> {
        let Some(landmarks) = landmarks else {
            return Ok(AlertBatch::no_face());
        };

        // Validate shape before any detector state changes
        landmarks.left_eye()?;
        landmarks.right_eye()?;

        let mut batch = AlertBatch {
            face_detected: true,
            ..Default::default()
        };

        match average_eye_aspect_ratio(landmarks) {
            Ok(ear) => {
                let update = self.blink.update(ear, now);
                batch.ear = Some(ear);
                batch.blink_threshold = Some(update.threshold);
                batch.messages.extend(update.messages);
            }
            Err(MetricError::Degenerate) => debug!("Collapsed eye geometry, blink skipped"),
            Err(e) => return Err(e.into()),
        }

        let mar = mouth_aspect_ratio(&landmarks.mouth());
        batch.mar = Some(mar);
        if self.yawn.update(mar, now) {
            batch.messages.push(DmsMessage::Alert(DmsAlert::Yawning));
        }

        if self.config.enable_pose {
            self.pose_signals(landmarks, now, &mut batch);
        }

        if batch.has_alerts() && self.alerts.try_fire(now) {
            self.cue.trigger();
            batch.cue_played = true;
        }

        Ok(batch)
    }

    /// Process one frame stamped with the current time
    pub fn process(&mut self, landmarks: Option<&LandmarkSet>) -> Result<AlertBatch, DmsError> {
        self.process_frame(landmarks, Instant::now())
    }

    fn pose_signals(&mut self, landmarks: &LandmarkSet, now: Instant, batch: &mut AlertBatch) {
        let estimate = self
            .pose
            .estimate(landmarks, self.config.frame_width, self.config.frame_height);
        let Some(pose) = estimate else {
            debug!("Head pose unavailable, pose signals skipped");
            return;
        };
        batch.head_pose = Some(pose);

        let deviation = self.pitch_baseline.deviation(pose.pitch);
        if self.pitch.update(deviation, now) {
            batch.messages.push(DmsMessage::Alert(DmsAlert::HeadTilt));
        }
        if self.yaw.update(pose.yaw, now) {
            batch.messages.push(DmsMessage::Alert(DmsAlert::HeadYaw));
        }
        if self.roll.update(pose.roll, now) {
            batch.messages.push(DmsMessage::Alert(DmsAlert::HeadRoll));
        }
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    pub fn blink_detector(&self) -> &BlinkDetector {
        &self.blink
    }

    pub fn alert_manager(&self) -> &AlertManager {
        &self.alerts
    }

    /// Reset driver state (on driver change)
    pub fn reset(&mut self) {
        self.blink.reset();
        self.yawn.reset();
        self.pitch.reset();
        self.yaw.reset();
        self.roll.reset();
        self.pitch_baseline.reset();
        self.alerts.clear();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use feature_engine::{LandmarkSet, Point2, LEFT_EYE_IDX, MOUTH_IDX, RIGHT_EYE_IDX};

    use crate::detector::tests::model_face;

    const EYE_WIDTH: f64 = 0.05;
    const MOUTH_WIDTH: f64 = 0.1;

    fn place_eye(points: &mut [Point2], idx: [usize; 6], direction: f64, ear: f64) {
        let outer = points[idx[0]];
        let w = EYE_WIDTH * direction;
        let h = ear * EYE_WIDTH;
        let at = |fx: f64, dy: f64| Point2::new(outer.x + w * fx, outer.y + dy);

        points[idx[1]] = at(1.0 / 3.0, -h / 2.0);
        points[idx[2]] = at(2.0 / 3.0, -h / 2.0);
        points[idx[3]] = at(1.0, 0.0);
        points[idx[4]] = at(2.0 / 3.0, h / 2.0);
        points[idx[5]] = at(1.0 / 3.0, h / 2.0);
    }

    /// Frontal face with the given eye and mouth aspect ratios
    pub(crate) fn synthetic_face(ear: f64, mar: f64) -> LandmarkSet {
        posed_face(ear, mar, 0.0, (0.0, 0.0))
    }

    /// Face with roll and a displaced nose, for pose-driven tests
    pub(crate) fn posed_face(ear: f64, mar: f64, roll: f64, nose_shift: (f64, f64)) -> LandmarkSet {
        let mut points = model_face(roll, nose_shift).points().to_vec();

        place_eye(&mut points, LEFT_EYE_IDX, 1.0, ear);
        place_eye(&mut points, RIGHT_EYE_IDX, -1.0, ear);

        let [upper, lower, left, right] = MOUTH_IDX;
        let (cx, cy) = (0.5, 0.7);
        let h = mar * MOUTH_WIDTH;
        points[upper] = Point2::new(cx, cy - h / 2.0);
        points[lower] = Point2::new(cx, cy + h / 2.0);
        points[left] = Point2::new(cx - MOUTH_WIDTH / 2.0, cy);
        points[right] = Point2::new(cx + MOUTH_WIDTH / 2.0, cy);

        LandmarkSet::new(points)
    }
}
