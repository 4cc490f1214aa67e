//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the optimizer
//! needs: identify and encode. Both work on in-memory payloads, since site
//! files are read once and handed from stage to stage.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate's pure Rust codecs.

use super::params::EncodeParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so one backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Read image dimensions from the header.
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode, optionally resize, and re-encode in the same format.
    fn encode(&self, data: &[u8], params: &EncodeParams) -> Result<Vec<u8>, BackendError>;
}
