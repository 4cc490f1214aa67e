//! Parameter types for image re-encoding.
//!
//! These describe *what* to produce, not *how*. The optimizer stage fills
//! them in from the configuration and the source dimensions, and a
//! [`backend`](super::backend) does the pixel work.
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`RasterFormat`]: The formats that can be re-encoded. Output keeps the input format.
//! - [`EncodeParams`]: Format, optional target size, and quality for one re-encode.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Raster formats the optimizer re-encodes.
///
/// Everything else (GIF, WebP, TIFF, ...) passes through untouched so the
/// entry's content-type always matches its bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Jpeg,
    Png,
}

impl RasterFormat {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "image/jpeg" => Some(RasterFormat::Jpeg),
            "image/png" => Some(RasterFormat::Png),
            _ => None,
        }
    }

    pub fn image_format(self) -> image::ImageFormat {
        match self {
            RasterFormat::Jpeg => image::ImageFormat::Jpeg,
            RasterFormat::Png => image::ImageFormat::Png,
        }
    }
}

/// One re-encode: decode as `format`, optionally resize, encode as `format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    pub format: RasterFormat,
    /// Exact output size; `None` keeps the source dimensions.
    pub resize: Option<(u32, u32)>,
    /// Used for JPEG only. PNG is lossless.
    pub quality: Quality,
}
