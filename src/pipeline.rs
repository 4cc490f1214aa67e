//! End-to-end conversion of a site directory.
//!
//! ```text
//!  config ─► validate, collect metadata                    (ConfigError: abort)
//!  root ───► walk ─► PathIndex                             (WalkError: abort)
//!                      │ shared read-only
//!            ┌─────────┴───────── per file, in parallel ───────────────┐
//!            │ classify ─► rewrite ─► validate ─► optimize (optional)  │
//!            └─────────┬──────────── order preserved ──────────────────┘
//!                      ▼
//!                report builder ─► main page check ─► Report
//!                      │
//!            dry run? ─┴─ no ─► assemble ─► ArchiveWriter
//! ```
//!
//! The index is complete before any file is processed, so a reference to a
//! sibling that happens to be processed later still resolves. Nothing is
//! handed to the writer until every file has gone through every stage.

use crate::archive::{ArchiveError, ArchiveMetadata, ArchiveWriter};
use crate::assemble::{AssembleError, assemble};
use crate::config::{ConfigError, ConvertConfig, effective_threads};
use crate::imaging::{ImageBackend, RustBackend};
use crate::mime::{self, ContentFamily};
use crate::optimize::{OptimizeSettings, Outcome, optimize_file};
use crate::report::{Report, ReportBuilder};
use crate::rewrite::{Dialect, RewriteSkipped, rewrite};
use crate::types::{ArchiveEntry, Payload, SiteFile};
use crate::validate::{PathIndex, ValidationRecord};
use crate::walk::{WalkError, walk};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fatal conditions. Everything else ends up in the [`Report`].
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Traversal failed: {0}")]
    Walk(#[from] WalkError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Assembly failed: {0}")]
    Assemble(#[from] AssembleError),
    #[error("Archive writer failed: {0}")]
    Archive(#[from] ArchiveError),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result of a run.
#[derive(Debug)]
pub struct Conversion {
    pub report: Report,
    /// `None` for dry runs.
    pub entries: Option<Vec<ArchiveEntry>>,
    /// `None` for dry runs.
    pub metadata: Option<ArchiveMetadata>,
}

/// Convert `root` with the pure Rust image backend.
pub fn convert(
    root: &Path,
    config: &ConvertConfig,
    writer: Option<&mut dyn ArchiveWriter>,
) -> Result<Conversion, ConvertError> {
    convert_with_backend(root, config, writer, &RustBackend::new())
}

pub fn convert_with_backend(
    root: &Path,
    config: &ConvertConfig,
    writer: Option<&mut dyn ArchiveWriter>,
    backend: &impl ImageBackend,
) -> Result<Conversion, ConvertError> {
    config.validate()?;
    let metadata = if config.dry_run {
        None
    } else {
        Some(ArchiveMetadata::from_config(config)?)
    };

    let files = walk(root)?.collect::<Result<Vec<_>, _>>()?;
    let index = PathIndex::new(files.iter().map(|f| f.path.as_str()));
    info!(root = %root.display(), files = files.len(), "site walked");

    let settings = config
        .optimize_images
        .then(|| OptimizeSettings::from_config(config));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(effective_threads(config))
        .build()?;
    let processed = pool.install(|| {
        files
            .into_par_iter()
            .map(|file| process_file(file, &index, backend, settings.as_ref()))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let mut builder = ReportBuilder::new();
    let mut files = Vec::with_capacity(processed.len());
    for item in processed {
        files.push(item.record_into(&mut builder));
    }
    if !index.contains(&config.main_page) {
        warn!(main_page = %config.main_page, "main page is not in the site");
        builder.missing_main_page(&config.main_page);
    }
    let report = builder.build(config.dry_run);
    info!(
        findings = report.findings.len(),
        rewritten = report.summary.rewritten_references,
        "checks complete"
    );

    let Some(metadata) = metadata else {
        info!("dry run; no archive written");
        return Ok(Conversion {
            report,
            entries: None,
            metadata: None,
        });
    };

    let entries = assemble(files)?;
    if let Some(writer) = writer {
        writer.write(&metadata, &entries)?;
    }
    Ok(Conversion {
        report,
        entries: Some(entries),
        metadata: Some(metadata),
    })
}

/// Everything the stages learned about one file.
struct Processed {
    file: SiteFile,
    unknown_extension: bool,
    skipped: Option<RewriteSkipped>,
    rewritten: usize,
    records: Vec<ValidationRecord>,
    image: Option<Outcome>,
}

impl Processed {
    /// Feed the findings to the report and hand back the file.
    fn record_into(self, builder: &mut ReportBuilder) -> SiteFile {
        let path = &self.file.path;
        builder.file(self.file.size);
        if self.unknown_extension {
            builder.unknown_extension(path);
        }
        if let Some(reason) = &self.skipped {
            builder.rewrite_skipped(path, reason);
        }
        builder.rewrites(path, self.rewritten);
        for record in self.records {
            builder.record(record);
        }
        if let Some(outcome) = &self.image {
            builder.image(path, outcome);
        }
        self.file
    }
}

fn source_path(file: &SiteFile) -> PathBuf {
    match &file.payload {
        Payload::OnDisk(path) => path.clone(),
        Payload::Bytes(_) => PathBuf::from(&file.path),
    }
}

/// classify → rewrite → validate → optimize, for one file.
fn process_file(
    mut file: SiteFile,
    index: &PathIndex,
    backend: &impl ImageBackend,
    settings: Option<&OptimizeSettings>,
) -> Result<Processed, WalkError> {
    let unknown_extension = file.family == ContentFamily::Unknown;
    if unknown_extension {
        debug!(path = %file.path, "unknown extension; labelled {}", file.content_type);
    }

    let mut skipped = None;
    let mut rewritten = 0;
    let mut records = Vec::new();

    if let Some(dialect) = Dialect::for_family(file.family) {
        let data = file
            .payload
            .read()
            .map_err(|e| WalkError::io(source_path(&file), e))?;
        match rewrite(&data, dialect, file.depth) {
            Ok(result) => {
                rewritten = result.rewritten_count();
                records = result
                    .references
                    .iter()
                    .map(|r| index.validate(&file.path, &r.raw))
                    .collect();
                drop(data);
                if let Some(payload) = result.payload {
                    file.replace_payload(payload);
                }
            }
            Err(reason) => {
                warn!(path = %file.path, %reason, "rewrite skipped");
                skipped = Some(reason);
            }
        }
    }

    for record in records.iter().filter(|r| r.reason.is_some()) {
        debug!(origin = %record.origin, reference = %record.reference, "missing reference");
    }

    let image = match settings {
        Some(settings) if mime::is_raster(file.content_type) => Some(
            optimize_file(backend, &mut file, settings)
                .map_err(|e| WalkError::io(source_path(&file), e))?,
        ),
        _ => None,
    };

    Ok(Processed {
        file,
        unknown_extension,
        skipped,
        rewritten,
        records,
        image,
    })
}
