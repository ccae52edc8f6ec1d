//! Image → landmarks → score, once per detector variant.

use crate::detector::{DetectorConfig, DetectorError, DetectorVariant, FaceDetector};
use crate::geometry::{self, GeometryError};
use crate::imageio::{self, ImageError};
use crate::landmarker::{LandmarkPredictor, LandmarkerError};
use crate::types::{Landmarks, ScoreRecord};
use image::GrayImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoreError {
    #[error("image: {0}")]
    Image(#[from] ImageError),
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("landmarks: {0}")]
    Landmarker(#[from] LandmarkerError),
    #[error("{variant} detector: {source}")]
    Geometry {
        variant: &'static str,
        #[source]
        source: GeometryError,
    },
}

impl ScoreError {
    pub fn is_no_face(&self) -> bool {
        matches!(
            self,
            ScoreError::Geometry {
                source: GeometryError::NoFaceDetected,
                ..
            }
        )
    }
}

/// Anything that can find one face's 68 landmarks in a grayscale image.
///
/// `Ok(None)` means the image contains no detectable face.
pub trait LandmarkSource {
    fn variant(&self) -> DetectorVariant;
    fn landmarks(&mut self, image: &GrayImage) -> Result<Option<Landmarks>, ScoreError>;
}

/// SCRFD detector feeding a 68-point landmark regressor.
pub struct OnnxLandmarkSource {
    variant: DetectorVariant,
    detector: FaceDetector,
    predictor: LandmarkPredictor,
}

impl OnnxLandmarkSource {
    /// Load the detector for `config` and a landmark regressor of its own.
    pub fn load(
        variant: DetectorVariant,
        config: &DetectorConfig,
        landmark_model: &str,
    ) -> Result<Self, ScoreError> {
        let detector = FaceDetector::load(config)?;
        let predictor = LandmarkPredictor::load(landmark_model)?;
        tracing::info!(variant = variant.name(), "landmark source ready");
        Ok(Self { variant, detector, predictor })
    }
}

impl LandmarkSource for OnnxLandmarkSource {
    fn variant(&self) -> DetectorVariant {
        self.variant
    }

    fn landmarks(&mut self, image: &GrayImage) -> Result<Option<Landmarks>, ScoreError> {
        let (width, height) = image.dimensions();
        let faces = self.detector.detect(image.as_raw(), width, height)?;
        // Highest-confidence face only; group photos are out of scope.
        let Some(face) = faces.first() else {
            return Ok(None);
        };
        let landmarks = self.predictor.predict(image.as_raw(), width, height, face)?;
        Ok(Some(landmarks))
    }
}

/// Score one image with one landmark source.
pub fn score_image(source: &mut dyn LandmarkSource, image: &GrayImage) -> Result<u8, ScoreError> {
    let variant = source.variant().name();
    let landmarks = source
        .landmarks(image)?
        .ok_or(ScoreError::Geometry {
            variant,
            source: GeometryError::NoFaceDetected,
        })?;
    geometry::score_landmarks(&landmarks).map_err(|source| ScoreError::Geometry { variant, source })
}

/// Both detector variants, run back to back on every photo.
pub struct DualScorer {
    fast: Box<dyn LandmarkSource>,
    accurate: Box<dyn LandmarkSource>,
}

impl DualScorer {
    pub fn new(fast: Box<dyn LandmarkSource>, accurate: Box<dyn LandmarkSource>) -> Self {
        Self { fast, accurate }
    }

    /// Score an already-decoded image. Both variants must find a face.
    pub fn score(&mut self, id: &str, image: &GrayImage) -> Result<ScoreRecord, ScoreError> {
        let score = score_image(self.fast.as_mut(), image)?;
        let score_cnn = score_image(self.accurate.as_mut(), image)?;
        Ok(ScoreRecord {
            id: id.to_string(),
            score,
            score_cnn,
        })
    }

    /// Normalize, decode and score a photo file. The ID is the file stem.
    pub fn score_file(&mut self, path: &Path) -> Result<ScoreRecord, ScoreError> {
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let image = imageio::load_grayscale(path)?;
        self.score(&id, &image)
    }
}
