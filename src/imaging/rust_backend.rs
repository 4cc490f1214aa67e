//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG) | `image::load_from_memory_with_format` |
//! | Resize | `image::DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the configured quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder`, best compression, adaptive filter |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeParams, RasterFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(data: &[u8], format: RasterFormat) -> Result<DynamicImage, BackendError> {
    image::load_from_memory_with_format(data, format.image_format())
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode: {}", e)))
}

/// JPEG has no alpha channel and no 16-bit depth; flatten anything else to RGB8.
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality);
    let result = match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img.write_with_encoder(encoder),
        other => DynamicImage::ImageRgb8(other.to_rgb8()).write_with_encoder(encoder),
    };
    result.map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))?;
    Ok(out)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut out = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilter::Adaptive);
    img.write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("PNG encode failed: {}", e)))?;
    Ok(out)
}

impl ImageBackend for RustBackend {
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
            })?;
        Ok(Dimensions { width, height })
    }

    fn encode(&self, data: &[u8], params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
        let img = decode(data, params.format)?;
        let img = match params.resize {
            Some((width, height)) => img.resize_exact(width, height, FilterType::Lanczos3),
            None => img,
        };
        match params.format {
            RasterFormat::Jpeg => encode_jpeg(&img, params.quality.value() as u8),
            RasterFormat::Png => encode_png(&img),
        }
    }
}
