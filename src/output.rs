//! CLI output formatting for a conversion run.
//!
//! # Output Format
//!
//! ```text
//! Summary
//!     Files: 4 (18204 bytes)
//!     Rewritten: 3 references in 2 files
//!     References: 5 resolved, 1 missing, 2 external, 1 skipped
//!     Images: 1 optimized, 1 resized, 40211 bytes saved
//!
//! Missing references (1)
//! 001 blog/post1.html
//!     /images/missing.png → images/missing.png: not found in site
//!
//! Unknown extensions (1)
//! 001 CNAME
//!     no extension; labelled text/html
//! ```
//!
//! Findings are grouped by category; within a category each affected file
//! gets a positional index and its reasons are indented below it, one per
//! line.
//!
//! # Architecture
//!
//! Each section has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure and do no I/O.

use crate::optimize::OptimizeStats;
use crate::report::{Category, Report};
use crate::validate::Status;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 file`, `2 files`.
fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// ============================================================================
// Report
// ============================================================================

pub fn format_summary(report: &Report) -> Vec<String> {
    let s = &report.summary;
    let mut lines = vec!["Summary".to_string()];
    lines.push(format!("{}Files: {} ({} bytes)", indent(1), s.files, s.bytes));
    lines.push(format!(
        "{}Rewritten: {} in {}",
        indent(1),
        plural(s.rewritten_references, "reference"),
        plural(s.rewritten_files, "file")
    ));
    let references: Vec<String> = Status::ALL
        .iter()
        .map(|status| {
            let count = s.references.get(status).copied().unwrap_or(0);
            format!("{count} {}", status.label())
        })
        .collect();
    lines.push(format!("{}References: {}", indent(1), references.join(", ")));
    if s.images != OptimizeStats::default() {
        lines.push(format!(
            "{}Images: {} optimized, {} resized, {} bytes saved",
            indent(1),
            s.images.optimized,
            s.images.resized,
            s.images.bytes_saved
        ));
    }
    if s.dry_run {
        lines.push(format!("{}Dry run: no archive written", indent(1)));
    }
    lines
}

/// One block per non-empty category, files numbered within the block.
pub fn format_findings(report: &Report) -> Vec<String> {
    let mut lines = Vec::new();
    for category in Category::ALL {
        let findings: Vec<_> = report.findings_in(category).collect();
        if findings.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("{} ({})", category.title(), findings.len()));

        let mut position = 0;
        let mut current: Option<&str> = None;
        for finding in findings {
            if current != Some(finding.path()) {
                position += 1;
                current = Some(finding.path());
                lines.push(format!("{} {}", format_index(position), finding.path()));
            }
            lines.push(format!("{}{}", indent(1), finding.reason()));
        }
    }
    lines
}

pub fn format_report(report: &Report) -> Vec<String> {
    let mut lines = format_summary(report);
    lines.extend(format_findings(report));
    lines
}

pub fn print_report(report: &Report) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Artifacts
// ============================================================================

/// Where the run left its outputs.
pub fn format_artifacts(archive: Option<&Path>, report: Option<&Path>) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(path) = archive {
        lines.push(format!("Archive → {}", path.display()));
    }
    if let Some(path) = report {
        lines.push(format!("Report → {}", path.display()));
    }
    lines
}

pub fn print_artifacts(archive: Option<&Path>, report: Option<&Path>) {
    for line in format_artifacts(archive, report) {
        println!("{}", line);
    }
}
