//! Image processing in pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Resize** | Lanczos3 via `resize_exact` |
//! | **Re-encode JPEG** | `JpegEncoder` at the configured quality |
//! | **Re-encode PNG** | `PngEncoder`, lossless, best compression |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing a re-encode
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//!
//! Deciding *which* files to touch lives in [`crate::optimize`].

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{bytes_saved, scaled_dimensions};
pub use params::{EncodeParams, Quality, RasterFormat};
pub use rust_backend::RustBackend;
