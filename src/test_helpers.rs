//! Shared test utilities.
//!
//! Builds throwaway site trees and provides lookup helpers that panic with a
//! listing of what *was* there, so a failing assertion says more than
//! "called `Option::unwrap()` on a `None` value".
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = write_site(&[
//!     ("index.html", r#"<link href="/css/style.css">"#),
//!     ("css/style.css", "body{}"),
//! ]);
//! let conversion = convert(tmp.path(), &dry_run_config(), None).unwrap();
//! let record = find_record(&conversion.report, "index.html", "/css/style.css");
//! ```

use std::path::Path;
use tempfile::TempDir;

use crate::config::ConvertConfig;
use crate::report::Report;
use crate::types::{ArchiveEntry, Payload};
use crate::validate::ValidationRecord;

// =========================================================================
// Fixture setup
// =========================================================================

/// Create a temp directory holding the given `(relative path, contents)` files.
pub fn write_site(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (path, contents) in files {
        write_file(tmp.path(), path, contents.as_bytes());
    }
    tmp
}

/// Write one file under `root`, creating parent directories.
pub fn write_file(root: &Path, path: &str, bytes: &[u8]) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(full, bytes).unwrap();
}

/// A config with every required metadata field filled in.
pub fn complete_config() -> ConvertConfig {
    ConvertConfig {
        name: Some("test-site".into()),
        title: Some("Test Site".into()),
        creator: Some("Tester".into()),
        description: Some("A site under test".into()),
        language: Some("eng".into()),
        ..ConvertConfig::default()
    }
}

/// A config for report-only runs, with no metadata.
pub fn dry_run_config() -> ConvertConfig {
    ConvertConfig {
        dry_run: true,
        ..ConvertConfig::default()
    }
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find the validation record for `reference` in `origin`. Panics if absent.
pub fn find_record<'a>(report: &'a Report, origin: &str, reference: &str) -> &'a ValidationRecord {
    report
        .records
        .values()
        .flatten()
        .find(|r| r.origin == origin && r.reference == reference)
        .unwrap_or_else(|| {
            let all: Vec<String> = report
                .records
                .values()
                .flatten()
                .map(|r| format!("{} -> {}", r.origin, r.reference))
                .collect();
            panic!("no record for '{reference}' in '{origin}'. Available: {all:?}")
        })
}

/// Find an archive entry by path. Panics if absent.
pub fn find_entry<'a>(entries: &'a [ArchiveEntry], path: &str) -> &'a ArchiveEntry {
    entries.iter().find(|e| e.path == path).unwrap_or_else(|| {
        let paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
        panic!("entry '{path}' not found. Available: {paths:?}")
    })
}

/// The bytes of an entry as UTF-8 text.
pub fn entry_text(entries: &[ArchiveEntry], path: &str) -> String {
    let entry = find_entry(entries, path);
    String::from_utf8(entry.payload.read().unwrap().into_owned()).unwrap()
}

/// Whether an entry still points at its source file, i.e. was never transformed.
pub fn is_untouched(entries: &[ArchiveEntry], path: &str) -> bool {
    matches!(find_entry(entries, path).payload, Payload::OnDisk(_))
}
