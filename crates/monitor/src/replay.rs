//! Recording replay
//!
//! The opening seconds of a recording feed calibration in real time through a
//! channel frame source; the remainder runs through the fatigue monitor with
//! timestamps taken from the recording.

use alerting::LogCue;
use camera_capture::{ChannelFrameSource, VideoFrame};
use dms::{
    CalibrationOutcome, CalibrationSession, DmsAlert, FaceLandmarkProvider, FatigueMonitor,
    LandmarkPoseEstimator,
};
use feature_engine::LandmarkSet;
use serde::Serialize;
use std::time::{Duration, Instant};
use storage::{JsonFileStore, ProfileStore};
use tokio::time::sleep_until;
use tracing::{debug, info, warn};

use crate::recording::{RecordedFrame, Recording};
use crate::settings::Settings;

/// Frames buffered between the pacing task and calibration
const PACE_BUFFER: usize = 8;

/// Face provider answering from recorded landmarks, keyed by frame sequence
pub struct ReplayLandmarks {
    frames: Vec<Option<LandmarkSet>>,
}

impl ReplayLandmarks {
    pub fn new(frames: &[RecordedFrame]) -> Self {
        Self {
            frames: frames.iter().map(|f| f.landmarks.clone()).collect(),
        }
    }
}

impl FaceLandmarkProvider for ReplayLandmarks {
    fn detect(&self, frame: &VideoFrame) -> Option<LandmarkSet> {
        self.frames.get(frame.sequence as usize).cloned().flatten()
    }
}

/// Feed `frames` into a channel source at their recorded pace.
///
/// Frame sequence numbers are positions in `frames`. The source closes after
/// the last frame; the task stops early once the source is dropped.
pub fn spawn_paced_source(frames: &[RecordedFrame], width: u32, height: u32) -> ChannelFrameSource {
    let (sender, source) = ChannelFrameSource::channel(PACE_BUFFER);
    let stamps: Vec<u64> = frames.iter().map(|f| f.timestamp_ms).collect();

    tokio::spawn(async move {
        let start = tokio::time::Instant::now();
        let first = stamps.first().copied().unwrap_or(0);

        for (seq, &ts) in stamps.iter().enumerate() {
            sleep_until(start + Duration::from_millis(ts - first)).await;
            let frame = VideoFrame::metadata_only(width, height, ts * 1_000_000, seq as u32);
            if sender.send(frame).await.is_err() {
                debug!("Calibration stopped listening after {} frames", seq);
                return;
            }
        }
    });

    source
}

/// What a replay did
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplaySummary {
    /// Whether the profile was loaded or produced by calibration
    pub profile_source: String,
    /// Frames run through the monitor
    pub frames: usize,
    /// Frames with a face
    pub faces: usize,
    /// Frames rejected as malformed
    pub rejected: usize,
    pub blinks: u64,
    /// Fatigue alert messages emitted
    pub alerts: usize,
    /// Audio cues played
    pub cues: usize,
    /// Most severe alert behind each cue
    pub cue_alerts: Vec<DmsAlert>,
}

/// Run frames through the monitor, logging every line
pub fn replay_frames(
    monitor: &mut FatigueMonitor,
    frames: &[RecordedFrame],
    start: Instant,
) -> ReplaySummary {
    let mut summary = ReplaySummary::default();
    let Some(first) = frames.first().map(|f| f.timestamp_ms) else {
        return summary;
    };

    for frame in frames {
        let now = start + Duration::from_millis(frame.timestamp_ms - first);
        summary.frames += 1;

        let batch = match monitor.process_frame(frame.landmarks.as_ref(), now) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Frame at {} ms rejected: {}", frame.timestamp_ms, e);
                summary.rejected += 1;
                continue;
            }
        };

        if batch.face_detected {
            summary.faces += 1;
        }
        for message in &batch.messages {
            if message.alert().is_some() {
                summary.alerts += 1;
                warn!("[{} ms] {}", frame.timestamp_ms, message);
            } else {
                debug!("[{} ms] {}", frame.timestamp_ms, message);
            }
        }
        if batch.cue_played {
            summary.cues += 1;
            if let Some(alert) = batch.highest_severity_alert() {
                info!("[{} ms] Cue played for {:?}", frame.timestamp_ms, alert);
                summary.cue_alerts.push(alert);
            }
        }
    }

    summary.blinks = monitor.blink_detector().blink_count();
    summary
}

/// Calibrate (or load the stored profile), then replay the recording
pub async fn run(settings: &Settings, recording: &Recording) -> anyhow::Result<ReplaySummary> {
    let store = JsonFileStore::in_dir(&settings.profile_dir);
    let (lead, rest) = recording.split_at(settings.calibration.duration());
    let (width, height) = (settings.dms.frame_width, settings.dms.frame_height);

    let session = CalibrationSession::new(
        settings.calibration.clone(),
        ReplayLandmarks::new(lead),
        LandmarkPoseEstimator::new(),
    );
    let mut source = spawn_paced_source(lead, width, height);

    let outcome = if settings.recalibrate {
        info!("Recalibration requested");
        let profile = session.run(&mut source).await?;
        store.save(&profile)?;
        CalibrationOutcome::Calibrated(profile)
    } else {
        session.load_or_run(&store, &mut source).await?
    };
    drop(source);

    // A loaded profile leaves the whole recording for monitoring
    let (profile_source, frames) = match &outcome {
        CalibrationOutcome::Loaded(_) => ("loaded", recording.frames()),
        CalibrationOutcome::Calibrated(_) => ("calibrated", rest),
    };
    info!(
        "Profile {} from {}, replaying {} frames",
        profile_source,
        store.path().display(),
        frames.len()
    );

    let mut monitor = FatigueMonitor::new(
        settings.dms.clone(),
        settings.alerting.clone(),
        outcome.into_profile(),
        Box::new(LandmarkPoseEstimator::new()),
        Box::new(LogCue),
    );

    let mut summary = replay_frames(&mut monitor, frames, Instant::now());
    summary.profile_source = profile_source.to_string();
    Ok(summary)
}
