use facevote_core::{DetectorConfig, DetectorVariant};
use std::path::PathBuf;

/// Pipeline configuration, loaded from environment variables.
pub struct Config {
    /// Root of `raw/` and `processed/` inputs (default: ./data).
    pub data_dir: PathBuf,
    /// Where tables are written (default: ./results).
    pub results_dir: PathBuf,
    /// Directory containing the detector and landmark ONNX models.
    pub model_dir: PathBuf,
    /// Optional study definition overriding the built-in California study.
    pub study_path: Option<PathBuf>,
    /// Minimum detector confidence for a face.
    pub confidence_threshold: f32,
    /// IoU above which overlapping detections are suppressed.
    pub nms_threshold: f32,
}

impl Config {
    /// Load configuration from `FACEVOTE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("FACEVOTE_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                std::env::var("XDG_DATA_HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| {
                        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                        PathBuf::from(home).join(".local/share")
                    })
                    .join("facevote/models")
            });

        Self {
            data_dir: env_path("FACEVOTE_DATA_DIR", "data"),
            results_dir: env_path("FACEVOTE_RESULTS_DIR", "results"),
            model_dir,
            study_path: std::env::var("FACEVOTE_STUDY").ok().map(PathBuf::from),
            confidence_threshold: env_f32("FACEVOTE_CONFIDENCE_THRESHOLD", 0.5),
            nms_threshold: env_f32("FACEVOTE_NMS_THRESHOLD", 0.4),
        }
    }

    /// Detector settings for one variant, with the configured thresholds.
    pub fn detector(&self, variant: DetectorVariant) -> DetectorConfig {
        DetectorConfig {
            confidence_threshold: self.confidence_threshold,
            nms_threshold: self.nms_threshold,
            ..DetectorConfig::for_variant(variant, &self.model_dir)
        }
    }

    /// Path to the 68-point landmark model.
    pub fn landmark_model_path(&self) -> String {
        self.model_dir
            .join(facevote_core::landmarker::LANDMARK_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
