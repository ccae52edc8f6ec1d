use serde::{Deserialize, Serialize};

use crate::geometry::GeometryError;

/// Number of points in a full-face landmark set.
pub const LANDMARK_COUNT: usize = 68;

/// Landmark indices used by the proportion measurements.
pub mod idx {
    pub const FACE_LEFT: usize = 0;
    pub const CHIN: usize = 8;
    pub const FACE_RIGHT: usize = 16;
    pub const LEFT_BROW_INNER: usize = 21;
    pub const RIGHT_BROW_INNER: usize = 22;
    pub const NOSE_TIP: usize = 33;
    pub const LEFT_EYE_OUTER: usize = 36;
    pub const LEFT_EYE_INNER: usize = 39;
    pub const RIGHT_EYE_INNER: usize = 42;
    pub const RIGHT_EYE_OUTER: usize = 45;
}

/// Bounding box for a detected face.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl BoundingBox {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Integer pixel coordinate of a single landmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Integer midpoint, truncated toward zero on each axis.
    pub fn midpoint(self, other: Point) -> Point {
        let mid = |a: i32, b: i32| ((i64::from(a) + i64::from(b)) / 2) as i32;
        Point {
            x: mid(self.x, other.x),
            y: mid(self.y, other.y),
        }
    }
}

/// A complete 68-point landmark set in source image coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landmarks {
    points: [Point; LANDMARK_COUNT],
}

impl Landmarks {
    /// Build a landmark set from detector output.
    ///
    /// An empty slice means the detector found no face.
    pub fn from_points(points: &[Point]) -> Result<Self, GeometryError> {
        if points.is_empty() {
            return Err(GeometryError::NoFaceDetected);
        }
        let points: [Point; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| GeometryError::LandmarkCount(points.len()))?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point; LANDMARK_COUNT] {
        &self.points
    }
}

impl std::ops::Index<usize> for Landmarks {
    type Output = Point;

    fn index(&self, index: usize) -> &Point {
        &self.points[index]
    }
}

/// Scores for one candidate photo, one per detector variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    #[serde(rename = "ID")]
    pub id: String,
    pub score: u8,
    #[serde(rename = "score_CNN")]
    pub score_cnn: u8,
}
