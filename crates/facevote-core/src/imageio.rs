//! Candidate photo loading.
//!
//! Photos arrive in whatever format the source site serves. Anything outside
//! the common raster set is re-encoded to a JPEG sibling before detection, and
//! every image is reduced to 8-bit grayscale.

use image::{DynamicImage, GrayImage, ImageReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions fed to the detectors without conversion.
pub const STANDARD_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Whether `path` already has one of the standard extensions.
pub fn has_standard_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| STANDARD_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Return a path the detectors can read, converting to JPEG if needed.
///
/// Non-standard files are decoded by content, flattened to RGB and written
/// next to the original with a `.jpg` extension.
pub fn ensure_standard_format(path: &Path) -> Result<PathBuf, ImageError> {
    if has_standard_extension(path) {
        return Ok(path.to_path_buf());
    }

    let img = decode(path)?;
    let converted = path.with_extension("jpg");
    DynamicImage::ImageRgb8(img.to_rgb8())
        .save_with_format(&converted, image::ImageFormat::Jpeg)
        .map_err(|source| ImageError::Encode {
            path: converted.clone(),
            source,
        })?;

    tracing::info!(
        from = %path.display(),
        to = %converted.display(),
        "converted photo to JPEG"
    );
    Ok(converted)
}

/// Load a photo as grayscale, converting its format first when required.
pub fn load_grayscale(path: &Path) -> Result<GrayImage, ImageError> {
    let path = ensure_standard_format(path)?;
    Ok(decode(&path)?.to_luma8())
}

fn decode(path: &Path) -> Result<DynamicImage, ImageError> {
    ImageReader::open(path)
        .map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .with_guessed_format()
        .map_err(|source| ImageError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| ImageError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_standard_extensions_case_insensitive() {
        assert!(has_standard_extension(Path::new("a/CA_1_1.JPG")));
        assert!(has_standard_extension(Path::new("CA_1_1.png")));
        assert!(!has_standard_extension(Path::new("CA_1_1.webp")));
        assert!(!has_standard_extension(Path::new("CA_1_1")));
    }

    #[test]
    fn test_standard_path_is_untouched() {
        let p = Path::new("/does/not/exist.jpeg");
        assert_eq!(ensure_standard_format(p).unwrap(), p);
    }

    #[test]
    fn test_converts_unknown_extension_by_content() {
        let dir = tempfile::tempdir().unwrap();
        // PNG bytes behind an extension the pipeline does not accept.
        let src = dir.path().join("CA_7_2.tif_");
        let img = RgbaImage::from_pixel(8, 6, Rgba([200, 100, 50, 128]));
        img.save_with_format(&src, image::ImageFormat::Png).unwrap();

        let converted = ensure_standard_format(&src).unwrap();
        assert_eq!(converted, dir.path().join("CA_7_2.jpg"));
        assert!(converted.exists());

        let gray = load_grayscale(&src).unwrap();
        assert_eq!(gray.dimensions(), (8, 6));
    }

    #[test]
    fn test_undecodable_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.gif_");
        std::fs::write(&src, b"not an image").unwrap();
        assert!(matches!(
            ensure_standard_format(&src),
            Err(ImageError::Decode { .. })
        ));
    }
}
