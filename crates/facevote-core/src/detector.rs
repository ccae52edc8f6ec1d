//! SCRFD face detector via ONNX Runtime.
//!
//! Implements the SCRFD (Sample and Computation Redistribution for Efficient Face
//! Detection) model with 3-stride anchor-free decoding and NMS post-processing.
//! The same decoder serves both detector variants; they differ in model file and
//! input resolution.

use crate::types::BoundingBox;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_STRIDES: [usize; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download from insightface and place in models/")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Which of the two configured detectors produced a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorVariant {
    /// Small SCRFD model at low resolution.
    Fast,
    /// Large SCRFD model at full resolution.
    Accurate,
}

impl DetectorVariant {
    pub fn name(self) -> &'static str {
        match self {
            DetectorVariant::Fast => "fast",
            DetectorVariant::Accurate => "accurate",
        }
    }
}

/// Tunables for one detector instance.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub model_path: String,
    /// Square letterbox side in pixels; must be a multiple of 32.
    pub input_size: usize,
    pub confidence_threshold: f32,
    pub nms_threshold: f32,
}

impl DetectorConfig {
    /// Default configuration for a variant, with the model under `model_dir`.
    pub fn for_variant(variant: DetectorVariant, model_dir: &Path) -> Self {
        let (file, input_size) = match variant {
            DetectorVariant::Fast => ("det_500m.onnx", 320),
            DetectorVariant::Accurate => ("det_10g.onnx", 640),
        };
        Self {
            model_path: model_dir.join(file).to_string_lossy().into_owned(),
            input_size,
            confidence_threshold: 0.5,
            nms_threshold: 0.4,
        }
    }
}

/// Metadata for coordinate de-mapping after letterbox resize.
struct LetterboxInfo {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// Output tensor indices for one stride: (score_idx, bbox_idx).
type StrideOutputIndices = (usize, usize);

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    input_size: usize,
    confidence_threshold: f32,
    nms_threshold: f32,
    /// Per-stride output indices [(score, bbox)] for strides [8, 16, 32].
    stride_indices: [StrideOutputIndices; 3],
}

impl FaceDetector {
    /// Load an SCRFD ONNX model as described by `config`.
    pub fn load(config: &DetectorConfig) -> Result<Self, DetectorError> {
        let model_path = config.model_path.as_str();
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();
        let num_outputs = output_names.len();

        tracing::info!(
            path = model_path,
            input_size = config.input_size,
            outputs = ?output_names,
            "loaded SCRFD model"
        );

        if num_outputs < 6 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model requires at least 6 outputs (3 strides × score/bbox), got {num_outputs}"
            )));
        }

        let stride_indices = discover_output_indices(&output_names);
        tracing::debug!(?stride_indices, "SCRFD output tensor mapping");

        Ok(Self {
            session,
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            nms_threshold: config.nms_threshold,
            stride_indices,
        })
    }

    /// Detect faces in a grayscale frame, returning bounding boxes sorted by confidence.
    pub fn detect(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, DetectorError> {
        let (input, letterbox) = preprocess(frame, width as usize, height as usize, self.input_size);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut all_detections = Vec::new();

        for (stride_pos, &stride) in SCRFD_STRIDES.iter().enumerate() {
            let (score_idx, bbox_idx) = self.stride_indices[stride_pos];

            let (_, scores) = outputs[score_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("scores stride {stride}: {e}")))?;
            let (_, bboxes) = outputs[bbox_idx]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("bboxes stride {stride}: {e}")))?;

            all_detections.extend(decode_stride(
                scores,
                bboxes,
                stride,
                self.input_size,
                &letterbox,
                self.confidence_threshold,
            ));
        }

        let result = nms(all_detections, self.nms_threshold);
        tracing::debug!(faces = result.len(), "SCRFD detections");
        Ok(result)
    }
}

/// Preprocess a grayscale frame into a NCHW float tensor with letterbox padding.
fn preprocess(frame: &[u8], width: usize, height: usize, input_size: usize) -> (Array4<f32>, LetterboxInfo) {
    let scale = (input_size as f32 / width as f32).min(input_size as f32 / height as f32);

    let new_w = ((width as f32 * scale).round() as usize).clamp(1, input_size);
    let new_h = ((height as f32 * scale).round() as usize).clamp(1, input_size);
    let pad_x = (input_size - new_w) as f32 / 2.0;
    let pad_y = (input_size - new_h) as f32 / 2.0;

    let resized = resize_bilinear(frame, width, height, new_w, new_h);

    let pad_x_start = pad_x.floor() as usize;
    let pad_y_start = pad_y.floor() as usize;

    let mut tensor = Array4::<f32>::zeros((1, 3, input_size, input_size));

    for y in 0..input_size {
        for x in 0..input_size {
            let pixel = if y >= pad_y_start
                && y < pad_y_start + new_h
                && x >= pad_x_start
                && x < pad_x_start + new_w
            {
                resized[(y - pad_y_start) * new_w + (x - pad_x_start)] as f32
            } else {
                SCRFD_MEAN // pad value normalizes to 0.0
            };

            let normalized = (pixel - SCRFD_MEAN) / SCRFD_STD;
            // Grayscale → 3-channel: replicate Y → [R=Y, G=Y, B=Y]
            tensor[[0, 0, y, x]] = normalized;
            tensor[[0, 1, y, x]] = normalized;
            tensor[[0, 2, y, x]] = normalized;
        }
    }

    (
        tensor,
        LetterboxInfo {
            scale,
            pad_x: pad_x_start as f32,
            pad_y: pad_y_start as f32,
        },
    )
}

/// Bilinear resize of a grayscale buffer.
fn resize_bilinear(frame: &[u8], width: usize, height: usize, new_w: usize, new_h: usize) -> Vec<u8> {
    let inv_scale_x = width as f32 / new_w as f32;
    let inv_scale_y = height as f32 / new_h as f32;
    let mut resized = vec![0u8; new_w * new_h];

    for y in 0..new_h {
        let src_y = (y as f32 + 0.5) * inv_scale_y - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, height as i32 - 1) as usize;
        let y1 = (y0 + 1).min(height - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..new_w {
            let src_x = (x as f32 + 0.5) * inv_scale_x - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, width as i32 - 1) as usize;
            let x1 = (x0 + 1).min(width - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            let tl = frame[y0 * width + x0] as f32;
            let tr = frame[y0 * width + x1] as f32;
            let bl = frame[y1 * width + x0] as f32;
            let br = frame[y1 * width + x1] as f32;

            let val = tl * (1.0 - fx) * (1.0 - fy)
                + tr * fx * (1.0 - fy)
                + bl * (1.0 - fx) * fy
                + br * fx * fy;

            resized[y * new_w + x] = val.round().clamp(0.0, 255.0) as u8;
        }
    }

    resized
}

/// Discover output tensor ordering by name.
///
/// Named exports ("score_8", "bbox_16", ...) are mapped by name. Otherwise the
/// standard positional ordering is assumed:
///   [0-2] = scores (strides 8, 16, 32)
///   [3-5] = bboxes (strides 8, 16, 32)
fn discover_output_indices(names: &[String]) -> [StrideOutputIndices; 3] {
    let find = |prefix: &str, stride: usize| -> Option<usize> {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| n == &target)
    };

    let mut named = [(0, 0); 3];
    for (slot, &stride) in named.iter_mut().zip(SCRFD_STRIDES.iter()) {
        match (find("score", stride), find("bbox", stride)) {
            (Some(score), Some(bbox)) => *slot = (score, bbox),
            _ => {
                tracing::info!(
                    ?names,
                    "SCRFD: output names not recognized, using positional mapping [0-2]=scores, [3-5]=bboxes"
                );
                return [(0, 3), (1, 4), (2, 5)];
            }
        }
    }

    tracing::info!("SCRFD: using name-based output tensor mapping");
    named
}

/// Decode detections for a single stride level.
fn decode_stride(
    scores: &[f32],
    bboxes: &[f32],
    stride: usize,
    input_size: usize,
    letterbox: &LetterboxInfo,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid = input_size / stride;
    let num_anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;

    let mut detections = Vec::new();

    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= threshold {
            continue;
        }

        let anchor_idx = idx / SCRFD_ANCHORS_PER_CELL;
        let anchor_cx = ((anchor_idx % grid) * stride) as f32;
        let anchor_cy = ((anchor_idx / grid) * stride) as f32;

        // Decode bbox: [x1_offset, y1_offset, x2_offset, y2_offset] * stride
        let bbox_off = idx * 4;
        if bbox_off + 3 >= bboxes.len() {
            continue;
        }
        let x1 = anchor_cx - bboxes[bbox_off] * stride as f32;
        let y1 = anchor_cy - bboxes[bbox_off + 1] * stride as f32;
        let x2 = anchor_cx + bboxes[bbox_off + 2] * stride as f32;
        let y2 = anchor_cy + bboxes[bbox_off + 3] * stride as f32;

        // Map from letterboxed space to original frame space
        let orig_x1 = (x1 - letterbox.pad_x) / letterbox.scale;
        let orig_y1 = (y1 - letterbox.pad_y) / letterbox.scale;
        let orig_x2 = (x2 - letterbox.pad_x) / letterbox.scale;
        let orig_y2 = (y2 - letterbox.pad_y) / letterbox.scale;

        detections.push(BoundingBox {
            x: orig_x1,
            y: orig_y1,
            width: orig_x2 - orig_x1,
            height: orig_y2 - orig_y1,
            confidence: score,
        });
    }

    detections
}

/// Non-Maximum Suppression. The result is sorted by descending confidence.
fn nms(mut detections: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if !suppressed[j] && iou(&detections[i], &detections[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Compute Intersection-over-Union between two bounding boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union_area = a.width * a.height + b.width * b.height - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}
