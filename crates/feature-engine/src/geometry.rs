//! Landmark geometry and aspect-ratio metrics

use serde::{Deserialize, Serialize};

use crate::MetricError;

/// Number of points produced by the face-mesh landmark model
pub const FACE_MESH_LANDMARKS: usize = 468;

/// Left eye: outer corner, upper-1, upper-2, inner corner, lower-2, lower-1
pub const LEFT_EYE_IDX: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// Right eye, same ordering as the left eye
pub const RIGHT_EYE_IDX: [usize; 6] = [263, 387, 385, 362, 380, 373];

/// Mouth landmarks: upper lip, lower lip, left corner, right corner
pub const MOUTH_IDX: [usize; 4] = [13, 14, 78, 308];

/// Landmarks fed to the head-pose solver: nose tip, chin, left eye corner,
/// right eye corner, left mouth corner, right mouth corner
pub const POSE_LANDMARK_IDX: [usize; 6] = [1, 152, 33, 263, 61, 291];

/// 3D model points (millimetres) matching `POSE_LANDMARK_IDX`
pub const POSE_MODEL_POINTS: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, -63.6, -12.5],
    [-43.3, 32.7, -26.0],
    [43.3, 32.7, -26.0],
    [-28.9, -28.9, -24.1],
    [28.9, -28.9, -24.1],
];

/// Normalized 2D landmark position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Point2> for (f64, f64) {
    fn from(p: Point2) -> Self {
        (p.x, p.y)
    }
}

/// Named mouth points; any of them may be missing for a frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MouthPoints {
    pub upper: Option<Point2>,
    pub lower: Option<Point2>,
    pub left: Option<Point2>,
    pub right: Option<Point2>,
}

/// Landmarks of a single face for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Point2>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<Point2> {
        self.points.get(idx).copied()
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Select points by index; every index must be present
    pub fn select(&self, indices: &[usize]) -> Result<Vec<Point2>, MetricError> {
        indices
            .iter()
            .map(|&idx| {
                self.get(idx).ok_or(MetricError::InvalidInput {
                    expected: idx + 1,
                    actual: self.len(),
                })
            })
            .collect()
    }

    pub fn left_eye(&self) -> Result<Vec<Point2>, MetricError> {
        self.select(&LEFT_EYE_IDX)
    }

    pub fn right_eye(&self) -> Result<Vec<Point2>, MetricError> {
        self.select(&RIGHT_EYE_IDX)
    }

    /// Mouth points; absent indices become `None` rather than an error
    pub fn mouth(&self) -> MouthPoints {
        let [upper, lower, left, right] = MOUTH_IDX;
        MouthPoints {
            upper: self.get(upper),
            lower: self.get(lower),
            left: self.get(left),
            right: self.get(right),
        }
    }

    /// The six pose-solver landmarks, in `POSE_LANDMARK_IDX` order
    pub fn pose_points(&self) -> Option<[Point2; 6]> {
        let mut out = [Point2::default(); 6];
        for (slot, &idx) in out.iter_mut().zip(POSE_LANDMARK_IDX.iter()) {
            *slot = self.get(idx)?;
        }
        Some(out)
    }
}

impl From<Vec<Point2>> for LandmarkSet {
    fn from(points: Vec<Point2>) -> Self {
        Self::new(points)
    }
}

/// Eye aspect ratio: `(|p2-p6| + |p3-p5|) / (2 |p1-p4|)`.
///
/// Low values mean a closed eye. A collapsed eye (zero width) yields
/// `MetricError::Degenerate`.
pub fn eye_aspect_ratio(points: &[Point2]) -> Result<f64, MetricError> {
    if points.len() < 6 {
        return Err(MetricError::InvalidInput {
            expected: 6,
            actual: points.len(),
        });
    }

    let vertical1 = points[1].distance(&points[5]);
    let vertical2 = points[2].distance(&points[4]);
    let horizontal = points[0].distance(&points[3]);

    if horizontal == 0.0 {
        return Err(MetricError::Degenerate);
    }

    Ok((vertical1 + vertical2) / (2.0 * horizontal))
}

/// Mean EAR of both eyes of a face
pub fn average_eye_aspect_ratio(landmarks: &LandmarkSet) -> Result<f64, MetricError> {
    let left = eye_aspect_ratio(&landmarks.left_eye()?)?;
    let right = eye_aspect_ratio(&landmarks.right_eye()?)?;
    Ok((left + right) / 2.0)
}

/// Mouth aspect ratio: `|upper-lower| / |left-right|`, or `0.0` when a point is
/// missing or the mouth has zero width
pub fn mouth_aspect_ratio(points: &MouthPoints) -> f64 {
    let (Some(upper), Some(lower), Some(left), Some(right)) =
        (points.upper, points.lower, points.left, points.right)
    else {
        return 0.0;
    };

    let vertical = upper.distance(&lower);
    let horizontal = left.distance(&right);

    if horizontal != 0.0 {
        vertical / horizontal
    } else {
        0.0
    }
}
