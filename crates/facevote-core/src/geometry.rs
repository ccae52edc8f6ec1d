//! Facial proportion measurements and the attractiveness score.
//!
//! Two vertical "courts" (brow to nose tip, nose tip to chin) and five
//! horizontal "eyes" (face edge, eye, gap, eye, face edge) are compared against
//! the classical ideal of equal parts. Each percentage point of deviation costs
//! one point of a 100 point score.

use crate::types::{idx, Landmarks, Point};
use thiserror::Error;

const FULL_SCORE: u8 = 100;
const IDEAL_TWO_COURTS: [f64; 2] = [0.5, 0.5];
const IDEAL_FIVE_EYES: [f64; 5] = [0.2; 5];
const PENALTY_PER_UNIT: f64 = 100.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("no face detected")]
    NoFaceDetected,
    #[error("expected 68 landmarks, got {0}")]
    LandmarkCount(usize),
    #[error("degenerate face geometry: {0} has zero length")]
    DegenerateFace(&'static str),
}

/// Vertical proportions: `[mid, low]`, summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoCourts {
    pub mid: f64,
    pub low: f64,
}

impl TwoCourts {
    pub fn as_array(&self) -> [f64; 2] {
        [self.mid, self.low]
    }
}

/// Horizontal proportions of face width, left to right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveEyes {
    pub left_face: f64,
    pub left_eye: f64,
    pub eye_gap: f64,
    pub right_eye: f64,
    pub right_face: f64,
}

impl FiveEyes {
    pub fn as_array(&self) -> [f64; 5] {
        [
            self.left_face,
            self.left_eye,
            self.eye_gap,
            self.right_eye,
            self.right_face,
        ]
    }
}

/// Euclidean distance between two landmarks.
pub fn distance(p1: Point, p2: Point) -> f64 {
    let dx = f64::from(p1.x) - f64::from(p2.x);
    let dy = f64::from(p1.y) - f64::from(p2.y);
    (dx * dx + dy * dy).sqrt()
}

/// Brow-midpoint to nose tip and nose tip to chin, as fractions of their sum.
pub fn two_courts_ratios(landmarks: &Landmarks) -> Result<TwoCourts, GeometryError> {
    let brow = landmarks[idx::LEFT_BROW_INNER].midpoint(landmarks[idx::RIGHT_BROW_INNER]);
    let midcourt = distance(brow, landmarks[idx::NOSE_TIP]);
    let lowcourt = distance(landmarks[idx::NOSE_TIP], landmarks[idx::CHIN]);

    let total = midcourt + lowcourt;
    if total == 0.0 {
        return Err(GeometryError::DegenerateFace("two-courts height"));
    }

    Ok(TwoCourts {
        mid: midcourt / total,
        low: lowcourt / total,
    })
}

/// The five horizontal segments, each as a fraction of outer face width.
///
/// Segments are straight-line distances, so they only sum to 1.0 when the
/// six points are colinear.
pub fn five_eyes_ratios(landmarks: &Landmarks) -> Result<FiveEyes, GeometryError> {
    let face_width = distance(landmarks[idx::FACE_LEFT], landmarks[idx::FACE_RIGHT]);
    if face_width == 0.0 {
        return Err(GeometryError::DegenerateFace("face width"));
    }

    let seg = |a: usize, b: usize| distance(landmarks[a], landmarks[b]) / face_width;

    Ok(FiveEyes {
        left_face: seg(idx::FACE_LEFT, idx::LEFT_EYE_OUTER),
        left_eye: seg(idx::LEFT_EYE_OUTER, idx::LEFT_EYE_INNER),
        eye_gap: seg(idx::LEFT_EYE_INNER, idx::RIGHT_EYE_INNER),
        right_eye: seg(idx::RIGHT_EYE_INNER, idx::RIGHT_EYE_OUTER),
        right_face: seg(idx::RIGHT_EYE_OUTER, idx::FACE_RIGHT),
    })
}

/// Combine both proportion sets into a score in `[0, 100]`.
///
/// The penalty is truncated, not rounded, before it is subtracted.
pub fn score(two_courts: &TwoCourts, five_eyes: &FiveEyes) -> u8 {
    let deviation = |actual: &[f64], ideal: &[f64]| -> f64 {
        actual
            .iter()
            .zip(ideal)
            .map(|(a, b)| (a - b).abs() * PENALTY_PER_UNIT)
            .sum()
    };

    let penalty = deviation(&two_courts.as_array(), &IDEAL_TWO_COURTS)
        + deviation(&five_eyes.as_array(), &IDEAL_FIVE_EYES);

    if !penalty.is_finite() {
        return 0;
    }

    let deducted = penalty.trunc().min(FULL_SCORE as f64) as u8;
    FULL_SCORE - deducted
}

/// Run the full measurement on one landmark set.
pub fn score_landmarks(landmarks: &Landmarks) -> Result<u8, GeometryError> {
    let two_courts = two_courts_ratios(landmarks)?;
    let five_eyes = five_eyes_ratios(landmarks)?;
    let value = score(&two_courts, &five_eyes);

    tracing::trace!(
        mid = two_courts.mid,
        low = two_courts.low,
        five_eyes = ?five_eyes.as_array(),
        score = value,
        "scored landmarks"
    );

    Ok(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A face with equal courts and five equal horizontal segments.
    pub(crate) fn ideal_points() -> Vec<Point> {
        let mut pts = vec![Point::new(50, 50); 68];
        pts[idx::FACE_LEFT] = Point::new(0, 50);
        pts[idx::LEFT_EYE_OUTER] = Point::new(20, 50);
        pts[idx::LEFT_EYE_INNER] = Point::new(40, 50);
        pts[idx::RIGHT_EYE_INNER] = Point::new(60, 50);
        pts[idx::RIGHT_EYE_OUTER] = Point::new(80, 50);
        pts[idx::FACE_RIGHT] = Point::new(100, 50);
        pts[idx::LEFT_BROW_INNER] = Point::new(45, 40);
        pts[idx::RIGHT_BROW_INNER] = Point::new(55, 40);
        pts[idx::NOSE_TIP] = Point::new(50, 70);
        pts[idx::CHIN] = Point::new(50, 100);
        pts
    }

    fn landmarks(pts: &[Point]) -> Landmarks {
        Landmarks::from_points(pts).unwrap()
    }

    #[test]
    fn test_distance() {
        assert_eq!(distance(Point::new(0, 0), Point::new(3, 4)), 5.0);
        assert_eq!(distance(Point::new(-2, 7), Point::new(-2, 7)), 0.0);
        assert_eq!(
            distance(Point::new(i32::MAX, 0), Point::new(-1, 0)),
            f64::from(i32::MAX) + 1.0
        );
    }

    #[test]
    fn test_ideal_face_scores_100() {
        let lm = landmarks(&ideal_points());
        let tc = two_courts_ratios(&lm).unwrap();
        assert_eq!(tc.mid, 0.5);
        assert_eq!(tc.low, 0.5);
        let fe = five_eyes_ratios(&lm).unwrap();
        for r in fe.as_array() {
            assert!((r - 0.2).abs() < 1e-12, "ratio {r}");
        }
        assert_eq!(score_landmarks(&lm).unwrap(), 100);
    }

    #[test]
    fn test_two_courts_sum_to_one() {
        let mut pts = ideal_points();
        pts[idx::NOSE_TIP] = Point::new(47, 63);
        pts[idx::CHIN] = Point::new(58, 131);
        pts[idx::LEFT_BROW_INNER] = Point::new(41, 33);
        pts[idx::RIGHT_BROW_INNER] = Point::new(56, 36);
        let tc = two_courts_ratios(&landmarks(&pts)).unwrap();
        assert!((tc.mid + tc.low - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_brow_midpoint_truncated() {
        // Brow midpoint (50.5, 40.5) truncates to (50, 40): midcourt is 30.
        let mut pts = ideal_points();
        pts[idx::LEFT_BROW_INNER] = Point::new(45, 40);
        pts[idx::RIGHT_BROW_INNER] = Point::new(56, 41);
        let tc = two_courts_ratios(&landmarks(&pts)).unwrap();
        assert_eq!(tc.mid, 0.5);
    }

    #[test]
    fn test_nose_on_chin_is_penalized() {
        let mut pts = ideal_points();
        pts[idx::CHIN] = pts[idx::NOSE_TIP];
        let lm = landmarks(&pts);
        let tc = two_courts_ratios(&lm).unwrap();
        assert_eq!(tc.low, 0.0);
        assert_eq!(tc.mid, 1.0);
        assert!(score_landmarks(&lm).unwrap() < 100);
    }

    #[test]
    fn test_degenerate_geometry_errors() {
        let mut pts = vec![Point::new(10, 10); 68];
        assert_eq!(
            two_courts_ratios(&landmarks(&pts)),
            Err(GeometryError::DegenerateFace("two-courts height"))
        );
        pts[idx::CHIN] = Point::new(10, 40);
        assert_eq!(
            five_eyes_ratios(&landmarks(&pts)),
            Err(GeometryError::DegenerateFace("face width"))
        );
    }

    #[test]
    fn test_five_eyes_need_not_sum_to_one() {
        let mut pts = ideal_points();
        pts[idx::LEFT_EYE_OUTER] = Point::new(20, 30);
        let fe = five_eyes_ratios(&landmarks(&pts)).unwrap();
        let sum: f64 = fe.as_array().iter().sum();
        assert!(sum > 1.0);
    }

    #[test]
    fn test_penalty_truncated_not_rounded() {
        let tc = TwoCourts { mid: 0.5, low: 0.5 };
        // Total deviation 0.0199 → penalty 1.99 → deduct 1.
        let fe = FiveEyes {
            left_face: 0.2199,
            left_eye: 0.2,
            eye_gap: 0.2,
            right_eye: 0.2,
            right_face: 0.2,
        };
        assert_eq!(score(&tc, &fe), 99);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let tc = TwoCourts { mid: 1.0, low: 0.0 };
        let fe = FiveEyes {
            left_face: 0.9,
            left_eye: 0.9,
            eye_gap: 0.9,
            right_eye: 0.9,
            right_face: 0.9,
        };
        assert_eq!(score(&tc, &fe), 0);
    }

    #[test]
    fn test_score_non_finite_is_zero() {
        let tc = TwoCourts { mid: f64::NAN, low: 0.5 };
        let fe = FiveEyes {
            left_face: 0.2,
            left_eye: 0.2,
            eye_gap: 0.2,
            right_eye: 0.2,
            right_face: 0.2,
        };
        assert_eq!(score(&tc, &fe), 0);
    }

    #[test]
    fn test_score_bounded_over_grid() {
        // Sweep nose and outer-eye positions; every finite case lands in [0, 100].
        for nose_y in (41..100).step_by(7) {
            for eye_x in (1..99).step_by(9) {
                let mut pts = ideal_points();
                pts[idx::NOSE_TIP] = Point::new(50, nose_y);
                pts[idx::LEFT_EYE_OUTER] = Point::new(eye_x, 55);
                let s = score_landmarks(&landmarks(&pts)).unwrap();
                assert!(s <= 100);
            }
        }
    }

    #[test]
    fn test_score_bounded_at_coordinate_limits() {
        let mut pts = ideal_points();
        pts[idx::LEFT_BROW_INNER] = Point::new(i32::MAX, 40);
        pts[idx::RIGHT_BROW_INNER] = Point::new(i32::MAX, 40);
        assert!(score_landmarks(&landmarks(&pts)).unwrap() <= 100);

        let mut pts = ideal_points();
        pts[idx::FACE_LEFT] = Point::new(i32::MIN, i32::MIN);
        pts[idx::FACE_RIGHT] = Point::new(i32::MAX, i32::MAX);
        pts[idx::CHIN] = Point::new(i32::MAX, i32::MAX);
        assert!(score_landmarks(&landmarks(&pts)).unwrap() <= 100);
    }
}
