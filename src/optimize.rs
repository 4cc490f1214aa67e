//! Optional image optimisation stage.
//!
//! Runs only when `optimize-images` is set. For each JPEG or PNG at least
//! `min-image-bytes` large:
//!
//! ```text
//! identify ──► wider than max-image-width? ──► resize (Lanczos3) ──┐
//!                        │ no                                      ├──► re-encode, same format
//!                        └─────────────────────────────────────────┘
//!                                                                  │
//!                             smaller than the original? ──yes──► replace payload
//!                                        │ no
//!                                        └──► keep original
//! ```
//!
//! The archive path and content-type are never touched, so references to
//! the image stay valid. A decode or encode failure is logged and the
//! original bytes pass through.

use crate::config::ConvertConfig;
use crate::imaging::{EncodeParams, ImageBackend, Quality, RasterFormat, scaled_dimensions};
use crate::types::SiteFile;
use serde::Serialize;
use std::io;
use tracing::{debug, warn};

/// Thresholds for the optimizer, taken from the run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeSettings {
    pub max_width: u32,
    pub quality: Quality,
    /// Images smaller than this are left alone.
    pub min_bytes: u64,
}

impl OptimizeSettings {
    pub fn from_config(config: &ConvertConfig) -> Self {
        Self {
            max_width: config.max_image_width,
            quality: Quality::new(config.image_quality),
            min_bytes: config.min_image_bytes,
        }
    }
}

impl Default for OptimizeSettings {
    fn default() -> Self {
        Self::from_config(&ConvertConfig::default())
    }
}

/// Why an image kept its original bytes without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// Not JPEG or PNG.
    Format,
    BelowThreshold,
    /// Re-encoding did not make it smaller.
    NotSmaller,
}

/// What happened to one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Optimized {
        before: u64,
        after: u64,
        resized: Option<(u32, u32)>,
    },
    Skipped(Skip),
    Failed(String),
}

/// Optimise one file in place.
///
/// The only error is failing to read the payload, which is a traversal
/// failure rather than an image problem.
pub fn optimize_file(
    backend: &impl ImageBackend,
    file: &mut SiteFile,
    settings: &OptimizeSettings,
) -> io::Result<Outcome> {
    let Some(format) = RasterFormat::from_content_type(file.content_type) else {
        return Ok(Outcome::Skipped(Skip::Format));
    };
    if file.size < settings.min_bytes {
        return Ok(Outcome::Skipped(Skip::BelowThreshold));
    }

    let data = file.payload.read()?;
    let before = data.len() as u64;

    let encoded = backend.identify(&data).and_then(|dims| {
        let resize = scaled_dimensions((dims.width, dims.height), settings.max_width);
        let params = EncodeParams {
            format,
            resize,
            quality: settings.quality,
        };
        backend.encode(&data, &params).map(|bytes| (bytes, resize))
    });

    let outcome = match encoded {
        Ok((bytes, resized)) if (bytes.len() as u64) < before => {
            let after = bytes.len() as u64;
            drop(data);
            file.replace_payload(bytes);
            debug!(path = %file.path, before, after, "image optimized");
            Outcome::Optimized {
                before,
                after,
                resized,
            }
        }
        Ok(_) => {
            debug!(path = %file.path, "re-encode not smaller; keeping original");
            Outcome::Skipped(Skip::NotSmaller)
        }
        Err(e) => {
            warn!(path = %file.path, error = %e, "image optimization failed; keeping original");
            Outcome::Failed(e.to_string())
        }
    };
    Ok(outcome)
}

/// Totals for the report summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct OptimizeStats {
    pub optimized: usize,
    pub resized: usize,
    pub failed: usize,
    pub bytes_saved: u64,
}

impl OptimizeStats {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Optimized {
                before,
                after,
                resized,
            } => {
                self.optimized += 1;
                if resized.is_some() {
                    self.resized += 1;
                }
                self.bytes_saved += crate::imaging::bytes_saved(*before, *after);
            }
            Outcome::Failed(_) => self.failed += 1,
            Outcome::Skipped(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::rust_backend::tests::synthetic_jpeg;
    use crate::imaging::{Dimensions, RustBackend};
    use crate::mime::ContentFamily;
    use crate::types::Payload;

    fn image_file(path: &str, content_type: &'static str, bytes: Vec<u8>) -> SiteFile {
        SiteFile {
            path: path.to_string(),
            depth: crate::types::depth_of(path),
            content_type,
            family: ContentFamily::Image,
            size: bytes.len() as u64,
            payload: Payload::Bytes(bytes),
        }
    }

    fn settings(min_bytes: u64) -> OptimizeSettings {
        OptimizeSettings {
            max_width: 1920,
            quality: Quality::new(85),
            min_bytes,
        }
    }

    #[test]
    fn settings_follow_config_defaults() {
        let s = OptimizeSettings::default();
        assert_eq!(s.max_width, 1920);
        assert_eq!(s.quality.value(), 85);
        assert_eq!(s.min_bytes, 51_200);
    }

    #[test]
    fn wide_image_is_resized_and_replaced() {
        let backend = MockBackend::new(4000, 3000, vec![7; 100]);
        let mut file = image_file("img/big.jpg", "image/jpeg", vec![0; 1000]);

        let outcome = optimize_file(&backend, &mut file, &settings(0)).unwrap();
        assert_eq!(
            outcome,
            Outcome::Optimized {
                before: 1000,
                after: 100,
                resized: Some((1920, 1440)),
            }
        );
        assert_eq!(file.size, 100);
        assert_eq!(file.path, "img/big.jpg");
        assert_eq!(file.content_type, "image/jpeg");

        let ops = backend.get_operations();
        assert_eq!(ops[0], RecordedOp::Identify(1000));
        assert!(matches!(
            &ops[1],
            RecordedOp::Encode {
                format: RasterFormat::Jpeg,
                resize: Some((1920, 1440)),
                quality: 85,
                ..
            }
        ));
    }

    #[test]
    fn narrow_image_is_reencoded_without_resize() {
        let backend = MockBackend::new(800, 600, vec![7; 10]);
        let mut file = image_file("a.png", "image/png", vec![0; 500]);

        let outcome = optimize_file(&backend, &mut file, &settings(0)).unwrap();
        assert!(matches!(outcome, Outcome::Optimized { resized: None, .. }));
        assert!(matches!(
            &backend.get_operations()[1],
            RecordedOp::Encode {
                format: RasterFormat::Png,
                resize: None,
                ..
            }
        ));
    }

    #[test]
    fn larger_reencode_keeps_original() {
        let backend = MockBackend::new(800, 600, vec![7; 2000]);
        let original = vec![1; 1000];
        let mut file = image_file("a.jpg", "image/jpeg", original.clone());

        let outcome = optimize_file(&backend, &mut file, &settings(0)).unwrap();
        assert_eq!(outcome, Outcome::Skipped(Skip::NotSmaller));
        assert_eq!(file.payload, Payload::Bytes(original));
        assert_eq!(file.size, 1000);
    }

    #[test]
    fn small_images_are_not_touched() {
        let backend = MockBackend::new(4000, 3000, vec![]);
        let mut file = image_file("a.jpg", "image/jpeg", vec![0; 100]);

        let outcome = optimize_file(&backend, &mut file, &settings(51_200)).unwrap();
        assert_eq!(outcome, Outcome::Skipped(Skip::BelowThreshold));
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn other_formats_pass_through() {
        let backend = MockBackend::new(4000, 3000, vec![]);
        for (path, content_type) in [
            ("a.gif", "image/gif"),
            ("a.webp", "image/webp"),
            ("a.svg", "image/svg+xml"),
        ] {
            let mut file = image_file(path, content_type, vec![0; 100_000]);
            let outcome = optimize_file(&backend, &mut file, &settings(0)).unwrap();
            assert_eq!(outcome, Outcome::Skipped(Skip::Format));
        }
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn backend_failure_is_not_fatal() {
        let backend = MockBackend::failing();
        let original = vec![9; 100];
        let mut file = image_file("broken.jpg", "image/jpeg", original.clone());

        let outcome = optimize_file(&backend, &mut file, &settings(0)).unwrap();
        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(file.payload, Payload::Bytes(original));
    }

    #[test]
    fn encode_failure_after_identify_is_not_fatal() {
        let backend = MockBackend {
            dimensions: Some(Dimensions {
                width: 10,
                height: 10,
            }),
            ..MockBackend::default()
        };
        let mut file = image_file("a.png", "image/png", vec![1; 10]);
        let outcome = optimize_file(&backend, &mut file, &settings(0)).unwrap();
        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[test]
    fn unreadable_payload_is_an_io_error() {
        let backend = MockBackend::new(1, 1, vec![]);
        let mut file = image_file("a.jpg", "image/jpeg", vec![]);
        file.payload = Payload::OnDisk("/no/such/image.jpg".into());
        file.size = 1_000_000;
        assert!(optimize_file(&backend, &mut file, &settings(0)).is_err());
    }

    #[test]
    fn real_backend_shrinks_oversized_jpeg() {
        let source = synthetic_jpeg(640, 480);
        let mut file = image_file("photo.jpg", "image/jpeg", source.clone());
        let settings = OptimizeSettings {
            max_width: 320,
            quality: Quality::new(60),
            min_bytes: 0,
        };

        let outcome = optimize_file(&RustBackend::new(), &mut file, &settings).unwrap();
        assert!(matches!(
            outcome,
            Outcome::Optimized {
                resized: Some((320, 240)),
                ..
            }
        ));
        assert!(file.size < source.len() as u64);
    }

    #[test]
    fn stats_accumulate() {
        let mut stats = OptimizeStats::default();
        stats.record(&Outcome::Optimized {
            before: 1000,
            after: 400,
            resized: Some((10, 10)),
        });
        stats.record(&Outcome::Optimized {
            before: 500,
            after: 450,
            resized: None,
        });
        stats.record(&Outcome::Failed("x".into()));
        stats.record(&Outcome::Skipped(Skip::BelowThreshold));

        assert_eq!(
            stats,
            OptimizeStats {
                optimized: 2,
                resized: 1,
                failed: 1,
                bytes_saved: 650,
            }
        );
    }
}
