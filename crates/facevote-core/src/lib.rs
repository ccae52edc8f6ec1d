//! facevote-core — Facial proportion scoring for candidate photos.
//!
//! Uses SCRFD for face detection and a 68-point landmark regressor, both
//! running via ONNX Runtime for CPU inference, then scores the landmark
//! geometry against the "two courts, five eyes" ideal.

pub mod alignment;
pub mod batch;
pub mod detector;
pub mod geometry;
pub mod imageio;
pub mod landmarker;
pub mod scorer;
pub mod types;

pub use detector::{DetectorConfig, DetectorVariant, FaceDetector};
pub use geometry::{FiveEyes, GeometryError, TwoCourts};
pub use landmarker::LandmarkPredictor;
pub use scorer::{DualScorer, LandmarkSource, OnnxLandmarkSource, ScoreError};
pub use types::{BoundingBox, Landmarks, Point, ScoreRecord};
