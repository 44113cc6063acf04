//! Per-driver calibration
//!
//! Watches the driver for a fixed wall-clock period and derives the blink and
//! head-pose parameters of a `CalibrationProfile` from what it saw.

use camera_capture::FrameSource;
use feature_engine::{average_eye_aspect_ratio, MetricError, RunningRange, StatisticalFeatures};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use storage::{
    BaselineStats, BlinkParams, CalibrationProfile, HeadPoseParams, ProfileStore, StorageError,
};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::detector::{FaceLandmarkProvider, HeadPoseProvider};
use crate::DmsError;

/// EMA factor written into every new profile
pub const PROFILE_ALPHA: f64 = 0.1;

/// Sustain time (seconds) written into every new profile
pub const PROFILE_SUSTAIN_SECS: f64 = 3.0;

/// Lower bound on the derived hysteresis
pub const MIN_HYSTERESIS_FRAMES: u32 = 3;

/// Calibration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Session length (milliseconds)
    pub duration_ms: u64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { duration_ms: 10_000 }
    }
}

impl CalibrationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Blink counter used only during calibration.
///
/// The threshold is the midpoint between the smallest and largest EAR seen so
/// far, and a blink is counted on the frame the eye first falls below it. It
/// has no EMA and no hysteresis, so it counts single-frame dips that the
/// runtime detector ignores.
#[derive(Debug, Clone, Default)]
pub struct MidpointBlinkCounter {
    range: RunningRange,
    closed: bool,
    count: u32,
}

impl MidpointBlinkCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one EAR sample; returns true when it starts a new blink
    pub fn observe(&mut self, ear: f64) -> bool {
        self.range.push(ear);
        let Some(threshold) = self.range.midpoint() else {
            return false;
        };

        if ear < threshold {
            if !self.closed {
                self.closed = true;
                self.count += 1;
                return true;
            }
        } else {
            self.closed = false;
        }
        false
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Where the profile in use came from
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    /// Read from the store
    Loaded(CalibrationProfile),
    /// Produced by a fresh session and saved
    Calibrated(CalibrationProfile),
}

impl CalibrationOutcome {
    pub fn profile(&self) -> &CalibrationProfile {
        match self {
            CalibrationOutcome::Loaded(p) | CalibrationOutcome::Calibrated(p) => p,
        }
    }

    pub fn into_profile(self) -> CalibrationProfile {
        match self {
            CalibrationOutcome::Loaded(p) | CalibrationOutcome::Calibrated(p) => p,
        }
    }
}

/// A calibration run over a frame source
pub struct CalibrationSession<F, P> {
    config: CalibrationConfig,
    face: F,
    pose: P,
}

impl<F, P> CalibrationSession<F, P>
where
    F: FaceLandmarkProvider,
    P: HeadPoseProvider,
{
    pub fn new(config: CalibrationConfig, face: F, pose: P) -> Self {
        Self { config, face, pose }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Pull frames until the configured duration elapses (or the source ends)
    /// and derive a profile from them. A stalled source is cut off at the
    /// deadline.
    pub async fn run<S: FrameSource>(&self, source: &mut S) -> Result<CalibrationProfile, DmsError> {
        let duration = self.config.duration();
        let deadline = Instant::now() + duration;

        let mut ears = Vec::new();
        let mut pitches = Vec::new();
        let mut blinks = MidpointBlinkCounter::new();
        let mut frames = 0u64;
        let mut faces = 0u64;

        info!("Calibration started ({:?})", duration);

        while Instant::now() < deadline {
            let frame = match timeout_at(deadline, source.next_frame()).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    warn!("Frame source closed after {} frames, ending calibration early", frames);
                    break;
                }
                Err(_) => break,
            };
            frames += 1;

            let Some(landmarks) = self.face.detect(&frame) else {
                continue;
            };
            faces += 1;

            let ear = match average_eye_aspect_ratio(&landmarks) {
                Ok(ear) => ear,
                Err(MetricError::Degenerate) => {
                    debug!("Skipping frame {} with collapsed eye", frame.sequence);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            ears.push(ear);
            blinks.observe(ear);

            if let Some(pose) = self.pose.estimate(&landmarks, frame.width, frame.height) {
                pitches.push(pose.pitch);
            }
        }

        info!(
            "Calibration finished: {} frames, {} faces, {} EAR samples, {} pitch samples, {} blinks",
            frames,
            faces,
            ears.len(),
            pitches.len(),
            blinks.count()
        );

        if frames > 0 && faces == 0 {
            return Err(DmsError::NoFace);
        }
        derive_profile(&ears, &pitches, blinks.count(), duration)
    }

    /// Use the stored profile if there is a valid one; otherwise calibrate and
    /// save. A corrupt stored profile is replaced by a fresh calibration.
    pub async fn load_or_run<St, S>(
        &self,
        store: &St,
        source: &mut S,
    ) -> Result<CalibrationOutcome, DmsError>
    where
        St: ProfileStore + ?Sized,
        S: FrameSource,
    {
        match store.load() {
            Ok(Some(profile)) => {
                info!("Using stored calibration profile");
                return Ok(CalibrationOutcome::Loaded(profile));
            }
            Ok(None) => info!("No calibration profile stored, calibrating"),
            Err(StorageError::ProfileCorrupt(reason)) => {
                warn!("Stored profile is corrupt ({}), recalibrating", reason);
            }
            Err(e) => return Err(e.into()),
        }

        let profile = self.run(source).await?;
        store.save(&profile)?;
        Ok(CalibrationOutcome::Calibrated(profile))
    }
}

/// Build a profile from calibration samples.
///
/// Eye samples without a single pitch sample mean the pose solver never
/// succeeded, reported as `PoseUnavailable`.
pub fn derive_profile(
    ears: &[f64],
    pitches: &[f64],
    blink_count: u32,
    duration: Duration,
) -> Result<CalibrationProfile, DmsError> {
    if ears.is_empty() {
        return Err(DmsError::InsufficientSamples("no eye samples".into()));
    }
    if pitches.is_empty() {
        return Err(DmsError::PoseUnavailable);
    }

    let ear = StatisticalFeatures::compute(ears);
    let pitch = StatisticalFeatures::compute(pitches);

    let hysteresis = ((ear.std_dev * 30.0).round() as u32).max(MIN_HYSTERESIS_FRAMES);

    let minutes = duration.as_secs_f64() / 60.0;
    let blink_rate = if minutes > 0.0 {
        blink_count as f64 / minutes
    } else {
        0.0
    };

    Ok(CalibrationProfile {
        blink: BlinkParams {
            alpha: PROFILE_ALPHA,
            threshold_delta: 0.5 * ear.std_dev,
            hysteresis_frames: hysteresis,
        },
        head_pose: HeadPoseParams {
            pitch_threshold: pitch.mean + 2.0 * pitch.std_dev,
            sustain_time: PROFILE_SUSTAIN_SECS,
        },
        baseline: BaselineStats {
            avg_ear: ear.mean,
            avg_pitch: pitch.mean,
            blink_rate,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blink::{BlinkDetector, BlinkSettings};
    use crate::detector::HeadPose;
    use crate::testing::synthetic_face;
    use camera_capture::VideoFrame;
    use feature_engine::LandmarkSet;
    use storage::MemoryStore;

    /// Source producing metadata frames at a fixed interval
    struct TickSource {
        interval: Duration,
        sequence: u32,
        limit: Option<u32>,
    }

    impl TickSource {
        fn every(ms: u64) -> Self {
            Self {
                interval: Duration::from_millis(ms),
                sequence: 0,
                limit: None,
            }
        }
    }

    impl FrameSource for TickSource {
        async fn next_frame(&mut self) -> Option<VideoFrame> {
            if self.limit.is_some_and(|limit| self.sequence >= limit) {
                return None;
            }
            tokio::time::sleep(self.interval).await;
            let frame = VideoFrame::metadata_only(640, 480, 0, self.sequence);
            self.sequence += 1;
            Some(frame)
        }
    }

    /// Source that never yields
    struct StalledSource;

    impl FrameSource for StalledSource {
        async fn next_frame(&mut self) -> Option<VideoFrame> {
            std::future::pending().await
        }
    }

    fn fixed_pitch(pitch: f64) -> impl HeadPoseProvider {
        move |_: &LandmarkSet, _: u32, _: u32| Some(HeadPose::new(pitch, 0.0, 0.0))
    }

    fn steady_session() -> CalibrationSession<impl FaceLandmarkProvider, impl HeadPoseProvider> {
        let face = synthetic_face(0.3, 0.2);
        CalibrationSession::new(
            CalibrationConfig::default(),
            move |_: &VideoFrame| Some(face.clone()),
            fixed_pitch(5.0),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_constant_driver_profile() {
        let session = steady_session();
        let started = Instant::now();

        let profile = session.run(&mut TickSource::every(33)).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(profile.blink.alpha, 0.1);
        assert_eq!(profile.blink.threshold_delta, 0.0);
        assert_eq!(profile.blink.hysteresis_frames, 3);
        assert_eq!(profile.head_pose.pitch_threshold, 5.0);
        assert_eq!(profile.head_pose.sustain_time, 3.0);
        assert_eq!(profile.baseline.blink_rate, 0.0);
        assert!((profile.baseline.avg_ear - 0.3).abs() < 1e-9);
        assert_eq!(profile.baseline.avg_pitch, 5.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blink_rate_over_configured_duration() {
        let open = synthetic_face(0.3, 0.2);
        let closed = synthetic_face(0.1, 0.2);
        let session = CalibrationSession::new(
            CalibrationConfig::default(),
            move |frame: &VideoFrame| {
                if frame.sequence % 10 == 5 {
                    Some(closed.clone())
                } else {
                    Some(open.clone())
                }
            },
            fixed_pitch(0.0),
        );

        // Frames at 90 ms: sequences 0..=110 land before the deadline
        let profile = session.run(&mut TickSource::every(90)).await.unwrap();

        assert!((profile.baseline.blink_rate - 66.0).abs() < 1e-9);
        assert!(profile.blink.threshold_delta > 0.0);
        assert_eq!(profile.blink.hysteresis_frames, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_source_is_cut_off() {
        let session = steady_session();
        let started = Instant::now();

        let result = session.run(&mut StalledSource).await;

        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(11));
        assert!(matches!(result, Err(DmsError::InsufficientSamples(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_source_ends_early() {
        let session = steady_session();
        let mut source = TickSource {
            limit: Some(30),
            ..TickSource::every(33)
        };
        let started = Instant::now();

        let profile = session.run(&mut source).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(profile.blink.hysteresis_frames, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_face_in_any_frame_fails_calibration() {
        let session = CalibrationSession::new(
            CalibrationConfig::default(),
            |_: &VideoFrame| -> Option<LandmarkSet> { None },
            fixed_pitch(0.0),
        );
        let result = session.run(&mut TickSource::every(33)).await;
        assert!(matches!(result, Err(DmsError::NoFace)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_without_face_are_skipped() {
        let face = synthetic_face(0.3, 0.2);
        let session = CalibrationSession::new(
            CalibrationConfig::default(),
            move |frame: &VideoFrame| -> Option<LandmarkSet> {
                (frame.sequence % 2 == 0).then(|| face.clone())
            },
            fixed_pitch(4.0),
        );
        let profile = session.run(&mut TickSource::every(33)).await.unwrap();
        assert_eq!(profile.baseline.avg_pitch, 4.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pose_unavailable_fails_calibration() {
        let face = synthetic_face(0.3, 0.2);
        let session = CalibrationSession::new(
            CalibrationConfig::default(),
            move |_: &VideoFrame| Some(face.clone()),
            |_: &LandmarkSet, _: u32, _: u32| -> Option<HeadPose> { None },
        );
        let result = session.run(&mut TickSource::every(33)).await;
        assert!(matches!(result, Err(DmsError::PoseUnavailable)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_landmarks_are_invalid_input() {
        let session = CalibrationSession::new(
            CalibrationConfig::default(),
            |_: &VideoFrame| Some(LandmarkSet::new(vec![Default::default(); 50])),
            fixed_pitch(0.0),
        );
        let result = session.run(&mut TickSource::every(33)).await;
        assert!(matches!(result, Err(DmsError::InvalidInput(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stored_profile_takes_precedence() {
        let stored = CalibrationProfile {
            head_pose: HeadPoseParams {
                pitch_threshold: 12.5,
                sustain_time: 3.0,
            },
            ..Default::default()
        };
        let store = MemoryStore::new();
        store.save(&stored).unwrap();

        let outcome = steady_session()
            .load_or_run(&store, &mut StalledSource)
            .await
            .unwrap();

        assert_eq!(outcome, CalibrationOutcome::Loaded(stored));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_profile_is_calibrated_and_saved() {
        let store = MemoryStore::new();

        let outcome = steady_session()
            .load_or_run(&store, &mut TickSource::every(33))
            .await
            .unwrap();

        assert!(matches!(outcome, CalibrationOutcome::Calibrated(_)));
        assert_eq!(store.load().unwrap().as_ref(), Some(outcome.profile()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupt_profile_is_recalibrated() {
        let store = MemoryStore::with_document("{ not json");

        let outcome = steady_session()
            .load_or_run(&store, &mut TickSource::every(33))
            .await
            .unwrap();

        let profile = outcome.into_profile();
        assert_eq!(profile.head_pose.pitch_threshold, 5.0);
        assert_eq!(store.load().unwrap(), Some(profile));
    }

    #[test]
    fn test_midpoint_counter_and_runtime_detector_differ() {
        // Single-frame dips: each one is a calibration blink, none is a runtime blink
        let ears: Vec<f64> = [0.3, 0.3, 0.1].iter().cycle().take(30).copied().collect();

        let mut counter = MidpointBlinkCounter::new();
        for &ear in &ears {
            counter.observe(ear);
        }

        let mut detector = BlinkDetector::new(BlinkSettings::default());
        let t0 = std::time::Instant::now();
        for (i, &ear) in ears.iter().enumerate() {
            detector.update(ear, t0 + Duration::from_millis(33 * i as u64));
        }

        assert_eq!(counter.count(), 10);
        assert_eq!(detector.blink_count(), 0);
    }

    #[test]
    fn test_midpoint_counter_counts_falling_edges() {
        let mut counter = MidpointBlinkCounter::new();
        assert!(!counter.observe(0.3));
        assert!(counter.observe(0.1));
        assert!(!counter.observe(0.1));
        assert!(!counter.observe(0.3));
        assert!(counter.observe(0.1));
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_hysteresis_rounds_and_has_floor() {
        let duration = Duration::from_secs(10);

        // std 0.16 -> 4.8 rounds to 5
        let wide = derive_profile(&[0.14, 0.46], &[0.0], 0, duration).unwrap();
        assert_eq!(wide.blink.hysteresis_frames, 5);

        let narrow = derive_profile(&[0.29, 0.31], &[0.0], 0, duration).unwrap();
        assert_eq!(narrow.blink.hysteresis_frames, 3);
    }

    #[test]
    fn test_pitch_threshold_uses_two_sigma() {
        let profile =
            derive_profile(&[0.3], &[2.0, 4.0, 6.0, 8.0], 0, Duration::from_secs(10)).unwrap();
        let std = 5.0f64.sqrt();
        assert!((profile.head_pose.pitch_threshold - (5.0 + 2.0 * std)).abs() < 1e-9);
        assert_eq!(profile.baseline.avg_pitch, 5.0);
    }
}
