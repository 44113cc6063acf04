//! Landmark and head-pose providers

use camera_capture::VideoFrame;
use feature_engine::{LandmarkSet, Point2, POSE_MODEL_POINTS};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Head pose (Euler angles)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    /// Pitch (up-down tilt) in degrees, positive when the head drops
    pub pitch: f64,
    /// Yaw (left-right rotation) in degrees
    pub yaw: f64,
    /// Roll (side tilt) in degrees
    pub roll: f64,
}

impl HeadPose {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Face landmark model.
///
/// Returns the landmarks of the first detected face, or `None` when the frame
/// has no face.
pub trait FaceLandmarkProvider: Send + Sync {
    fn detect(&self, frame: &VideoFrame) -> Option<LandmarkSet>;
}

impl<F> FaceLandmarkProvider for F
where
    F: Fn(&VideoFrame) -> Option<LandmarkSet> + Send + Sync,
{
    fn detect(&self, frame: &VideoFrame) -> Option<LandmarkSet> {
        self(frame)
    }
}

/// Head pose solver.
///
/// Landmarks are normalized; `width` and `height` give the pixel scale. Returns
/// `None` when the pose cannot be solved.
pub trait HeadPoseProvider: Send + Sync {
    fn estimate(&self, landmarks: &LandmarkSet, width: u32, height: u32) -> Option<HeadPose>;
}

impl<F> HeadPoseProvider for F
where
    F: Fn(&LandmarkSet, u32, u32) -> Option<HeadPose> + Send + Sync,
{
    fn estimate(&self, landmarks: &LandmarkSet, width: u32, height: u32) -> Option<HeadPose> {
        self(landmarks, width, height)
    }
}

/// Closed-form pose estimate from the six pose landmarks.
///
/// Roll is the angle of the eye line. Yaw and pitch come from how far the nose
/// tip is displaced from where the face model puts it for a frontal head,
/// using the model's nose depth as the lever arm. This is an approximation of
/// a full perspective solve and is good to a few degrees near frontal.
#[derive(Debug, Clone, Copy, Default)]
pub struct LandmarkPoseEstimator;

impl LandmarkPoseEstimator {
    pub fn new() -> Self {
        Self
    }
}

struct FaceModel {
    eye_half_width: f64,
    eye_height: f64,
    face_height: f64,
    nose_depth: f64,
}

impl FaceModel {
    fn from_points() -> Self {
        let [nose, chin, _, right_eye, _, _] = POSE_MODEL_POINTS;
        Self {
            eye_half_width: right_eye[0],
            eye_height: right_eye[1] - nose[1],
            face_height: right_eye[1] - chin[1],
            nose_depth: nose[2] - right_eye[2],
        }
    }
}

impl HeadPoseProvider for LandmarkPoseEstimator {
    fn estimate(&self, landmarks: &LandmarkSet, width: u32, height: u32) -> Option<HeadPose> {
        if width == 0 || height == 0 {
            return None;
        }
        let scale = |p: Point2| Point2::new(p.x * width as f64, p.y * height as f64);
        let [nose, chin, left_eye, right_eye, _, _] = landmarks.pose_points()?.map(scale);

        let (ex, ey) = (right_eye.x - left_eye.x, right_eye.y - left_eye.y);
        let eye_dist = ex.hypot(ey);
        if eye_dist == 0.0 || !eye_dist.is_finite() {
            return None;
        }

        // Eye-line axis and its downward normal
        let (ux, uy) = (ex / eye_dist, ey / eye_dist);
        let (nx, ny) = (-uy, ux);
        let mid = Point2::new(
            (left_eye.x + right_eye.x) / 2.0,
            (left_eye.y + right_eye.y) / 2.0,
        );

        let (dx, dy) = (nose.x - mid.x, nose.y - mid.y);
        let (cx, cy) = (chin.x - mid.x, chin.y - mid.y);
        let lateral = dx * ux + dy * uy;
        let nose_drop = dx * nx + dy * ny;
        let chin_drop = cx * nx + cy * ny;
        if chin_drop <= 0.0 {
            return None;
        }

        let model = FaceModel::from_points();
        let roll = ey.atan2(ex).to_degrees();

        let half_width = eye_dist / 2.0;
        let yaw = ((lateral / half_width) * model.eye_half_width)
            .atan2(model.nose_depth)
            .to_degrees();

        let neutral = model.eye_height / model.face_height;
        let pitch = ((nose_drop / chin_drop - neutral) * model.face_height)
            .atan2(model.nose_depth)
            .to_degrees();

        trace!(pitch, yaw, roll, "Head pose estimated");
        Some(HeadPose { pitch, yaw, roll })
    }
}
