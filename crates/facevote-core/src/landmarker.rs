//! 68-point facial landmark regressor via ONNX Runtime.
//!
//! Runs the insightface `1k3d68` model on a 192×192 crop around a detected
//! face. The network emits normalized coordinates in [-1, 1]; the last 68
//! points are the facial landmarks.

use crate::alignment::CropTransform;
use crate::types::{BoundingBox, Landmarks, Point, LANDMARK_COUNT};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const LANDMARK_INPUT_SIZE: usize = 192;
const LANDMARK_MEAN: f32 = 0.0;
const LANDMARK_STD: f32 = 1.0;
/// Outputs at least this long carry (x, y, z) triples, otherwise (x, y) pairs.
const LANDMARK_3D_MIN_LEN: usize = 3000;
pub const LANDMARK_MODEL_FILE: &str = "1k3d68.onnx";

#[derive(Error, Debug)]
pub enum LandmarkerError {
    #[error("model file not found: {0} — download from insightface and place in models/")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ONNX landmark predictor shared by both detector variants.
pub struct LandmarkPredictor {
    session: Session,
}

impl LandmarkPredictor {
    pub fn load(model_path: &str) -> Result<Self, LandmarkerError> {
        if !Path::new(model_path).exists() {
            return Err(LandmarkerError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded landmark model"
        );

        Ok(Self { session })
    }

    /// Predict the 68 landmarks of `face` in a grayscale frame.
    pub fn predict(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
        face: &BoundingBox,
    ) -> Result<Landmarks, LandmarkerError> {
        let transform = CropTransform::around(face, LANDMARK_INPUT_SIZE);
        let crop = transform.warp(frame, width as usize, height as usize, LANDMARK_INPUT_SIZE);
        let input = preprocess(&crop);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| LandmarkerError::InferenceFailed(format!("landmark extraction: {e}")))?;

        let points = decode_landmarks(raw, &transform)?;
        Landmarks::from_points(&points)
            .map_err(|e| LandmarkerError::InferenceFailed(e.to_string()))
    }
}

/// Preprocess a 192×192 grayscale crop into a NCHW float tensor.
fn preprocess(crop: &[u8]) -> Array4<f32> {
    let size = LANDMARK_INPUT_SIZE;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for y in 0..size {
        for x in 0..size {
            let pixel = crop.get(y * size + x).copied().unwrap_or(0) as f32;
            let normalized = (pixel - LANDMARK_MEAN) / LANDMARK_STD;
            tensor[[0, 0, y, x]] = normalized;
            tensor[[0, 1, y, x]] = normalized;
            tensor[[0, 2, y, x]] = normalized;
        }
    }

    tensor
}

/// Turn raw network output into integer source-frame coordinates.
fn decode_landmarks(raw: &[f32], transform: &CropTransform) -> Result<Vec<Point>, LandmarkerError> {
    let dim = if raw.len() >= LANDMARK_3D_MIN_LEN { 3 } else { 2 };
    let available = raw.len() / dim;
    if available < LANDMARK_COUNT {
        return Err(LandmarkerError::InferenceFailed(format!(
            "expected at least {LANDMARK_COUNT} landmarks, got {available}"
        )));
    }

    let half = (LANDMARK_INPUT_SIZE / 2) as f32;
    let first = (available - LANDMARK_COUNT) * dim;

    Ok(raw[first..first + LANDMARK_COUNT * dim]
        .chunks_exact(dim)
        .map(|p| {
            let (sx, sy) = transform.to_source((p[0] + 1.0) * half, (p[1] + 1.0) * half);
            Point::new(sx.round() as i32, sy.round() as i32)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_transform() -> CropTransform {
        // 128px box → 192px extent → unit scale, crop origin at source (0, 0).
        let face = BoundingBox { x: 32.0, y: 32.0, width: 128.0, height: 128.0, confidence: 1.0 };
        CropTransform::around(&face, LANDMARK_INPUT_SIZE)
    }

    #[test]
    fn test_preprocess_shape_and_channels() {
        let crop = vec![77u8; LANDMARK_INPUT_SIZE * LANDMARK_INPUT_SIZE];
        let t = preprocess(&crop);
        assert_eq!(t.shape(), &[1, 3, LANDMARK_INPUT_SIZE, LANDMARK_INPUT_SIZE]);
        assert_eq!(t[[0, 0, 5, 9]], 77.0);
        assert_eq!(t[[0, 1, 5, 9]], t[[0, 2, 5, 9]]);
    }

    #[test]
    fn test_decode_2d_output() {
        let mut raw = vec![0.0f32; LANDMARK_COUNT * 2];
        raw[0] = -1.0;
        raw[1] = -1.0;
        raw[2] = 0.5;
        raw[3] = 0.25;
        let pts = decode_landmarks(&raw, &unit_transform()).unwrap();
        assert_eq!(pts.len(), LANDMARK_COUNT);
        assert_eq!(pts[0], Point::new(0, 0));
        assert_eq!(pts[1], Point::new(144, 120));
        assert_eq!(pts[2], Point::new(96, 96));
    }

    #[test]
    fn test_decode_3d_output_takes_last_68() {
        // 1103 triples: the first 1035 are dense mesh points, the tail is the 68-point set.
        let mut raw = vec![-1.0f32; 3309];
        let tail = (1103 - LANDMARK_COUNT) * 3;
        for v in raw[tail..].iter_mut() {
            *v = 0.0;
        }
        let pts = decode_landmarks(&raw, &unit_transform()).unwrap();
        assert!(pts.iter().all(|p| *p == Point::new(96, 96)));
    }

    #[test]
    fn test_decode_too_short() {
        let raw = vec![0.0f32; 10];
        assert!(matches!(
            decode_landmarks(&raw, &unit_transform()),
            Err(LandmarkerError::InferenceFailed(_))
        ));
    }

    #[test]
    fn test_load_missing_model() {
        assert!(matches!(
            LandmarkPredictor::load("/nonexistent/1k3d68.onnx"),
            Err(LandmarkerError::ModelNotFound(_))
        ));
    }
}
