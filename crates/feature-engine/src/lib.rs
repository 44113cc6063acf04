//! Feature Engineering Engine
//!
//! Turns face-mesh landmarks into the scalar signals the fatigue detectors
//! consume (eye and mouth aspect ratios) and summarizes calibration samples.

mod error;
pub mod geometry;
mod statistics;

pub use error::MetricError;
pub use geometry::{
    average_eye_aspect_ratio, eye_aspect_ratio, mouth_aspect_ratio, LandmarkSet, MouthPoints,
    Point2, FACE_MESH_LANDMARKS, LEFT_EYE_IDX, MOUTH_IDX, POSE_LANDMARK_IDX, POSE_MODEL_POINTS,
    RIGHT_EYE_IDX,
};
pub use statistics::{RunningRange, StatisticalFeatures};
