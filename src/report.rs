//! Conversion report: every non-fatal condition of a run in one place.
//!
//! The pipeline feeds a [`ReportBuilder`] as files come out of the per-file
//! stages, in walk order. [`ReportBuilder::build`] produces an immutable
//! [`Report`] that is:
//!
//! - serialised to `conversion_report.json` for programs,
//! - rendered to `conversion_report.html` with maud for people,
//! - formatted for the terminal by [`crate::output`].
//!
//! ## Finding categories
//!
//! | Category | Raised by | Effect on the archive |
//! |---|---|---|
//! | `unknown-extension` | classifier | entry labelled `text/html` |
//! | `rewrite-skipped` | rewriter | payload passed through unchanged |
//! | `missing-reference` | validator, main-page check | none; link rot is reported, not fixed |
//! | `image-optimization-failed` | optimizer | original image bytes kept |

use crate::optimize::{OptimizeStats, Outcome};
use crate::validate::{Status, ValidationRecord};
use maud::{DOCTYPE, Markup, html};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const REPORT_HTML: &str = "conversion_report.html";
pub const REPORT_JSON: &str = "conversion_report.json";

/// Origin used for findings that come from run metadata rather than a file.
pub const METADATA_ORIGIN: &str = "<metadata>";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    UnknownExtension,
    RewriteSkipped,
    MissingReference,
    ImageOptimizationFailed,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::UnknownExtension,
        Category::RewriteSkipped,
        Category::MissingReference,
        Category::ImageOptimizationFailed,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Category::UnknownExtension => "Unknown extensions",
            Category::RewriteSkipped => "Skipped rewrites",
            Category::MissingReference => "Missing references",
            Category::ImageOptimizationFailed => "Image optimization failures",
        }
    }
}

/// A recorded non-fatal condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Finding {
    UnknownExtension {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        extension: Option<String>,
    },
    RewriteSkipped {
        path: String,
        reason: String,
    },
    MissingReference {
        origin: String,
        reference: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        reason: String,
    },
    ImageOptimizationFailed {
        path: String,
        reason: String,
    },
}

impl Finding {
    pub fn category(&self) -> Category {
        match self {
            Finding::UnknownExtension { .. } => Category::UnknownExtension,
            Finding::RewriteSkipped { .. } => Category::RewriteSkipped,
            Finding::MissingReference { .. } => Category::MissingReference,
            Finding::ImageOptimizationFailed { .. } => Category::ImageOptimizationFailed,
        }
    }

    /// The affected file.
    pub fn path(&self) -> &str {
        match self {
            Finding::UnknownExtension { path, .. }
            | Finding::RewriteSkipped { path, .. }
            | Finding::ImageOptimizationFailed { path, .. } => path,
            Finding::MissingReference { origin, .. } => origin,
        }
    }

    /// One-line explanation.
    pub fn reason(&self) -> String {
        match self {
            Finding::UnknownExtension {
                extension: Some(ext),
                ..
            } => format!("unknown extension .{ext}; labelled text/html"),
            Finding::UnknownExtension { extension: None, .. } => {
                "no extension; labelled text/html".to_string()
            }
            Finding::RewriteSkipped { reason, .. } => format!("not rewritten: {reason}"),
            Finding::MissingReference {
                reference,
                target,
                reason,
                ..
            } => match target {
                Some(target) => format!("{reference} → {target}: {reason}"),
                None => format!("{reference}: {reason}"),
            },
            Finding::ImageOptimizationFailed { reason, .. } => {
                format!("kept original: {reason}")
            }
        }
    }
}

/// Headline numbers of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Summary {
    pub files: usize,
    pub bytes: u64,
    /// Files with at least one rewritten reference.
    pub rewritten_files: usize,
    pub rewritten_references: usize,
    pub references: BTreeMap<Status, usize>,
    pub findings: BTreeMap<Category, usize>,
    pub images: OptimizeStats,
    pub dry_run: bool,
}

/// The complete, immutable result of a run's checks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub summary: Summary,
    pub findings: Vec<Finding>,
    /// Rewritten-reference count per file, only for files with rewrites.
    pub rewrite_counts: BTreeMap<String, usize>,
    /// Every validation record, grouped by status.
    pub records: BTreeMap<Status, Vec<ValidationRecord>>,
}

impl Report {
    pub fn findings_in(&self, category: Category) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(move |f| f.category() == category)
    }

    pub fn records_with(&self, status: Status) -> &[ValidationRecord] {
        self.records
            .get(&status)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Accumulates per-file results in walk order.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    report: Report,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(&mut self, size: u64) {
        self.report.summary.files += 1;
        self.report.summary.bytes += size;
    }

    pub fn unknown_extension(&mut self, path: &str) {
        self.report.findings.push(Finding::UnknownExtension {
            path: path.to_string(),
            extension: crate::mime::extension_of(path).map(str::to_string),
        });
    }

    pub fn rewrite_skipped(&mut self, path: &str, reason: impl ToString) {
        self.report.findings.push(Finding::RewriteSkipped {
            path: path.to_string(),
            reason: reason.to_string(),
        });
    }

    pub fn rewrites(&mut self, path: &str, count: usize) {
        if count == 0 {
            return;
        }
        self.report.summary.rewritten_files += 1;
        self.report.summary.rewritten_references += count;
        self.report.rewrite_counts.insert(path.to_string(), count);
    }

    /// Add a validation record; a missing one also becomes a finding.
    pub fn record(&mut self, record: ValidationRecord) {
        if record.status == Status::Missing {
            self.report.findings.push(Finding::MissingReference {
                origin: record.origin.clone(),
                reference: record.reference.clone(),
                target: record.target.clone(),
                reason: record
                    .reason
                    .as_ref()
                    .map_or_else(|| "not found in site".to_string(), ToString::to_string),
            });
        }
        self.report
            .records
            .entry(record.status)
            .or_default()
            .push(record);
    }

    pub fn image(&mut self, path: &str, outcome: &Outcome) {
        self.report.summary.images.record(outcome);
        if let Outcome::Failed(reason) = outcome {
            self.report.findings.push(Finding::ImageOptimizationFailed {
                path: path.to_string(),
                reason: reason.clone(),
            });
        }
    }

    /// The configured main page is not among the site's files.
    pub fn missing_main_page(&mut self, main_page: &str) {
        self.report.findings.push(Finding::MissingReference {
            origin: METADATA_ORIGIN.to_string(),
            reference: main_page.to_string(),
            target: None,
            reason: "main page is not in the site".to_string(),
        });
    }

    pub fn build(mut self, dry_run: bool) -> Report {
        let summary = &mut self.report.summary;
        summary.dry_run = dry_run;
        summary.references = self
            .report
            .records
            .iter()
            .map(|(status, records)| (*status, records.len()))
            .collect();
        for finding in &self.report.findings {
            *summary.findings.entry(finding.category()).or_default() += 1;
        }
        self.report
    }
}

// ============================================================================
// Rendering
// ============================================================================

const CSS: &str = "body{font-family:system-ui,sans-serif;margin:2rem;color:#222}\
table{border-collapse:collapse;margin-bottom:1.5rem}\
th,td{border:1px solid #ccc;padding:.3rem .6rem;text-align:left}\
th{background:#f4f4f4}code{font-size:.9em}.ok{color:#2a7a2a}";

/// Render the human-readable report.
pub fn render_html(report: &Report, title: &str) -> Markup {
    let summary = &report.summary;
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { "Conversion report: " (title) }
                style { (CSS) }
            }
            body {
                h1 { "Conversion report: " (title) }
                @if summary.dry_run {
                    p { em { "Dry run: no archive was written." } }
                }
                h2 { "Summary" }
                table {
                    tr { th { "Files" } td { (summary.files) } }
                    tr { th { "Bytes" } td { (summary.bytes) } }
                    tr { th { "Files rewritten" } td { (summary.rewritten_files) } }
                    tr { th { "References rewritten" } td { (summary.rewritten_references) } }
                    @for status in Status::ALL {
                        tr {
                            th { "References " (status.label()) }
                            td { (summary.references.get(&status).copied().unwrap_or(0)) }
                        }
                    }
                    tr { th { "Images optimized" } td { (summary.images.optimized) } }
                    tr { th { "Image bytes saved" } td { (summary.images.bytes_saved) } }
                }
                @if report.is_clean() {
                    p.ok { "No findings." }
                }
                @for category in Category::ALL {
                    (render_category(report, category))
                }
                @if !report.rewrite_counts.is_empty() {
                    h2 { "Rewritten references per file" }
                    table {
                        tr { th { "File" } th { "Rewritten" } }
                        @for (path, count) in &report.rewrite_counts {
                            tr { td { code { (path) } } td { (count) } }
                        }
                    }
                }
            }
        }
    }
}

fn render_category(report: &Report, category: Category) -> Markup {
    let findings: Vec<&Finding> = report.findings_in(category).collect();
    html! {
        @if !findings.is_empty() {
            h2 { (category.title()) " (" (findings.len()) ")" }
            table {
                tr { th { "Path" } th { "Reason" } }
                @for finding in findings {
                    tr { td { code { (finding.path()) } } td { (finding.reason()) } }
                }
            }
        }
    }
}

/// Write the HTML and JSON forms into `dir`, returning the HTML path.
pub fn write_report(report: &Report, title: &str, dir: &Path) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(dir)?;
    let html_path = dir.join(REPORT_HTML);
    fs::write(&html_path, render_html(report, title).into_string())?;
    fs::write(dir.join(REPORT_JSON), serde_json::to_string_pretty(report)?)?;
    Ok(html_path)
}
