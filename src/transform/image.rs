//! Image optimization.

use std::io::Cursor;

use async_trait::async_trait;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageEncoder, ImageFormat, ImageReader};

use super::{OutputFile, SourceFile, Transform, TransformError};

/// Recompresses PNG files losslessly, keeping the original bytes when the
/// re-encode is not smaller.
///
/// JPEG headers are checked so corrupt files are reported; everything else
/// (SVG, GIF, WebP, fonts) passes through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageTransform;

fn optimize(input: &SourceFile) -> Result<Vec<u8>, TransformError> {
    let format = ImageFormat::from_path(&input.rel).ok();
    match format {
        Some(ImageFormat::Png) => recompress_png(input),
        Some(ImageFormat::Jpeg) => {
            ImageReader::with_format(Cursor::new(&input.bytes), ImageFormat::Jpeg)
                .into_dimensions()
                .map_err(|e| TransformError::per_file(&input.rel, e.to_string()))?;
            Ok(input.bytes.clone())
        }
        _ => Ok(input.bytes.clone()),
    }
}

fn recompress_png(input: &SourceFile) -> Result<Vec<u8>, TransformError> {
    let img = image::load_from_memory_with_format(&input.bytes, ImageFormat::Png)
        .map_err(|e| TransformError::per_file(&input.rel, e.to_string()))?;

    let mut out = Vec::with_capacity(input.bytes.len());
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color().into())
        .map_err(|e| TransformError::per_file(&input.rel, e.to_string()))?;

    if out.len() < input.bytes.len() {
        crate::debug!("image"; "{}: {} -> {} bytes", input.rel.display(), input.bytes.len(), out.len());
        Ok(out)
    } else {
        Ok(input.bytes.clone())
    }
}

#[async_trait]
impl Transform for ImageTransform {
    async fn apply(&self, input: SourceFile) -> Result<Vec<OutputFile>, TransformError> {
        // Encoding is CPU-bound; keep it off the orchestrator thread
        let (rel, bytes) = tokio::task::spawn_blocking(move || {
            let bytes = optimize(&input);
            (input.rel, bytes)
        })
        .await
        .map_err(|e| TransformError::Fatal(format!("image worker: {e}")))?;

        Ok(vec![OutputFile::new(rel, bytes?)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::source;
    use image::{Rgba, RgbaImage};
    use std::path::PathBuf;

    /// A flat image saved with no compression, so there is room to shrink.
    fn uncompressed_png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(64, 64, Rgba([200, 30, 30, 255]));
        let mut out = Vec::new();
        PngEncoder::new_with_quality(&mut out, CompressionType::Fast, FilterType::NoFilter)
            .write_image(img.as_raw(), 64, 64, image::ExtendedColorType::Rgba8)
            .unwrap();
        out
    }

    fn binary(rel: &str, bytes: Vec<u8>) -> SourceFile {
        SourceFile {
            rel: PathBuf::from(rel),
            bytes,
        }
    }

    #[tokio::test]
    async fn test_png_recompressed_losslessly() {
        let original = uncompressed_png();
        let out = ImageTransform
            .apply(binary("assets/images/red.png", original.clone()))
            .await
            .unwrap();

        assert!(out[0].bytes.len() <= original.len());
        let before = image::load_from_memory(&original).unwrap().to_rgba8();
        let after = image::load_from_memory(&out[0].bytes).unwrap().to_rgba8();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_svg_passes_through() {
        let svg = "<svg xmlns=\"http://www.w3.org/2000/svg\"/>";
        let out = ImageTransform
            .apply(source("assets/images/logo.svg", svg))
            .await
            .unwrap();
        assert_eq!(out[0].bytes, svg.as_bytes());
    }

    #[tokio::test]
    async fn test_corrupt_png_is_per_file() {
        let err = ImageTransform
            .apply(binary("assets/images/bad.png", b"not a png".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::PerFile { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_jpeg_is_per_file() {
        let err = ImageTransform
            .apply(binary("photo.jpg", vec![0, 1, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, TransformError::PerFile { .. }));
    }
}
