//! Face crop for the landmark regressor.
//!
//! The detected box is expanded around its center, scaled to a square crop and
//! sampled with bilinear interpolation. Landmark predictions come back in crop
//! coordinates and are mapped to the source frame with the inverse transform.

use crate::types::BoundingBox;

/// Context around the detected box included in the crop.
const CROP_EXPANSION: f32 = 1.5;

/// Axis-aligned scale + translation from source pixels to crop pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropTransform {
    scale: f32,
    center_x: f32,
    center_y: f32,
    half_size: f32,
}

impl CropTransform {
    /// Transform that centers `face` in an `out_size` square crop.
    pub fn around(face: &BoundingBox, out_size: usize) -> Self {
        let (center_x, center_y) = face.center();
        let extent = face.width.max(face.height) * CROP_EXPANSION;
        let scale = if extent > 0.0 { out_size as f32 / extent } else { 1.0 };
        Self {
            scale,
            center_x,
            center_y,
            half_size: (out_size / 2) as f32,
        }
    }

    /// Source pixel → crop pixel.
    #[cfg(test)]
    fn to_crop(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.center_x) * self.scale + self.half_size,
            (y - self.center_y) * self.scale + self.half_size,
        )
    }

    /// Crop pixel → source pixel.
    pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.half_size) / self.scale + self.center_x,
            (y - self.half_size) / self.scale + self.center_y,
        )
    }

    /// Sample a square grayscale crop of side `out_size` from `frame`.
    ///
    /// Out-of-bounds pixels are filled with 0 (black).
    pub fn warp(&self, frame: &[u8], width: usize, height: usize, out_size: usize) -> Vec<u8> {
        let sample = |x: i32, y: i32| -> f32 {
            if x >= 0 && x < width as i32 && y >= 0 && y < height as i32 {
                frame[y as usize * width + x as usize] as f32
            } else {
                0.0
            }
        };

        let mut output = vec![0u8; out_size * out_size];

        for oy in 0..out_size {
            for ox in 0..out_size {
                let (sx, sy) = self.to_source(ox as f32, oy as f32);

                let x0 = sx.floor() as i32;
                let y0 = sy.floor() as i32;
                let fx = sx - x0 as f32;
                let fy = sy - y0 as f32;

                let val = sample(x0, y0) * (1.0 - fx) * (1.0 - fy)
                    + sample(x0 + 1, y0) * fx * (1.0 - fy)
                    + sample(x0, y0 + 1) * (1.0 - fx) * fy
                    + sample(x0 + 1, y0 + 1) * fx * fy;

                output[oy * out_size + ox] = val.round().clamp(0.0, 255.0) as u8;
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox { x, y, width: w, height: h, confidence: 0.9 }
    }

    #[test]
    fn test_center_maps_to_crop_center() {
        let t = CropTransform::around(&face(100.0, 50.0, 80.0, 120.0), 192);
        let (cx, cy) = t.to_crop(140.0, 110.0);
        assert!((cx - 96.0).abs() < 1e-4);
        assert!((cy - 96.0).abs() < 1e-4);
    }

    #[test]
    fn test_roundtrip() {
        let t = CropTransform::around(&face(12.0, 30.0, 64.0, 40.0), 192);
        let (cx, cy) = t.to_crop(33.0, 47.5);
        let (sx, sy) = t.to_source(cx, cy);
        assert!((sx - 33.0).abs() < 1e-3, "x: {sx}");
        assert!((sy - 47.5).abs() < 1e-3, "y: {sy}");
    }

    #[test]
    fn test_crop_covers_expanded_box() {
        // 100px box → 150px extent → scale 192/150.
        let t = CropTransform::around(&face(0.0, 0.0, 100.0, 100.0), 192);
        let (left, _) = t.to_source(0.0, 96.0);
        let (right, _) = t.to_source(192.0, 96.0);
        assert!((left - -25.0).abs() < 1e-3);
        assert!((right - 125.0).abs() < 1e-3);
    }

    #[test]
    fn test_warp_output_size_and_fill() {
        let frame = vec![128u8; 64 * 64];
        // 32px box → 48px extent → unit scale, crop center lands on (32, 32).
        let t = CropTransform::around(&face(16.0, 16.0, 32.0, 32.0), 48);
        let out = t.warp(&frame, 64, 64, 48);
        assert_eq!(out.len(), 48 * 48);
        assert_eq!(out[24 * 48 + 24], 128);
    }

    #[test]
    fn test_warp_out_of_bounds_is_black() {
        let frame = vec![255u8; 10 * 10];
        let t = CropTransform::around(&face(500.0, 500.0, 10.0, 10.0), 16);
        let out = t.warp(&frame, 10, 10, 16);
        assert!(out.iter().all(|&p| p == 0));
    }
}
