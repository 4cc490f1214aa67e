//! Reference validation against the complete file set.
//!
//! A [`PathIndex`] is built once from the walker's output, before any file
//! is processed, and is only read afterwards. Each reference found by the
//! rewriter is resolved against it and becomes one [`ValidationRecord`].
//!
//! ## Resolution
//!
//! ```text
//! origin: blog/2024/post.html
//!
//!   /css/site.css     → css/site.css               (from the root)
//!   ../img/a.png      → blog/img/a.png             (from the origin's directory)
//!   /docs/            → docs/index.html            (default document)
//!   ?page=2           → blog/2024/post.html        (same document)
//!   /caf%C3%A9.html   → café.html                  (tried raw, then decoded)
//! ```
//!
//! The original reference text is resolved, not the rewritten one; both
//! name the same target.
//!
//! Extensionless permalinks that a web server would map onto `name.html`
//! are deliberately not resolved. They are recorded as missing with a
//! reason pointing at the sibling file, so the operator can fix the source.

use crate::mime;
use crate::reference::{ReferenceKind, split_suffix};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

const DEFAULT_DOCUMENT: &str = "index.html";

/// Read-only lookup of every file and directory in the site.
#[derive(Debug, Default, Clone)]
pub struct PathIndex {
    files: HashSet<String>,
    directories: HashSet<String>,
}

impl PathIndex {
    pub fn new<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut index = PathIndex::default();
        index.directories.insert(String::new());
        for path in paths {
            let mut end = path.len();
            while let Some(slash) = path[..end].rfind('/') {
                if !index.directories.insert(path[..slash].to_string()) {
                    break;
                }
                end = slash;
            }
            index.files.insert(path.to_string());
        }
        index
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    pub fn is_directory(&self, path: &str) -> bool {
        self.directories.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Resolve one reference found in `origin`.
    pub fn validate(&self, origin: &str, reference: &str) -> ValidationRecord {
        let kind = ReferenceKind::classify(reference);
        let record = |status, target: Option<String>, reason| ValidationRecord {
            origin: origin.to_string(),
            reference: reference.to_string(),
            kind,
            target,
            status,
            reason,
        };

        match kind {
            ReferenceKind::External => return record(Status::External, None, None),
            ReferenceKind::AnchorOnly | ReferenceKind::UnknownScheme => {
                return record(Status::Skipped, None, None);
            }
            ReferenceKind::SiteAbsolute | ReferenceKind::Relative => {}
        }

        let (path, _) = split_suffix(reference);
        let (base, path) = match kind {
            ReferenceKind::SiteAbsolute => ("", &path[1..]),
            _ if path.is_empty() => {
                return record(Status::Resolved, Some(origin.to_string()), None);
            }
            _ => (parent_of(origin), path),
        };

        let Some(resolved) = Resolved::join(base, path) else {
            return record(Status::Missing, None, Some(MissingReason::EscapesRoot));
        };
        let target = resolved.target();

        if self.contains(&target) {
            return record(Status::Resolved, Some(target), None);
        }
        if let Ok(decoded) = percent_decode_str(&target).decode_utf8() {
            if decoded != target && self.contains(&decoded) {
                return record(Status::Resolved, Some(decoded.into_owned()), None);
            }
        }

        let reason = self.explain_missing(&resolved);
        record(Status::Missing, Some(target), Some(reason))
    }

    fn explain_missing(&self, resolved: &Resolved) -> MissingReason {
        if resolved.directory {
            return if self.is_directory(&resolved.path) {
                MissingReason::NoIndex
            } else {
                MissingReason::NotFound
            };
        }
        if self.is_directory(&resolved.path) {
            return MissingReason::DirectoryWithoutSlash;
        }
        if mime::extension_of(&resolved.path).is_none() {
            let candidate = format!("{}.html", resolved.path);
            if self.contains(&candidate) {
                return MissingReason::Permalink { candidate };
            }
        }
        MissingReason::NotFound
    }
}

/// Directory part of a site-relative file path.
fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// A normalised reference path before the default document is applied.
struct Resolved {
    path: String,
    directory: bool,
}

impl Resolved {
    /// Join `path` onto `base`, collapsing `.` and `..`.
    /// Returns `None` when `..` climbs above the site root.
    fn join(base: &str, path: &str) -> Option<Self> {
        let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
        let mut directory = path.is_empty() || path.ends_with('/');
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop()?;
                }
                _ => segments.push(segment),
            }
        }
        if matches!(path.rsplit('/').next(), Some(".") | Some("..")) {
            directory = true;
        }
        Some(Resolved {
            path: segments.join("/"),
            directory,
        })
    }

    fn target(&self) -> String {
        match (self.directory, self.path.is_empty()) {
            (false, _) => self.path.clone(),
            (true, true) => DEFAULT_DOCUMENT.to_string(),
            (true, false) => format!("{}/{DEFAULT_DOCUMENT}", self.path),
        }
    }
}

/// Outcome of resolving one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Resolved,
    Missing,
    External,
    Skipped,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Resolved,
        Status::Missing,
        Status::External,
        Status::Skipped,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Status::Resolved => "resolved",
            Status::Missing => "missing",
            Status::External => "external",
            Status::Skipped => "skipped",
        }
    }
}

/// Why an internal reference did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MissingReason {
    NotFound,
    NoIndex,
    DirectoryWithoutSlash,
    Permalink { candidate: String },
    EscapesRoot,
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReason::NotFound => write!(f, "not found in site"),
            MissingReason::NoIndex => write!(f, "directory has no {DEFAULT_DOCUMENT}"),
            MissingReason::DirectoryWithoutSlash => {
                write!(f, "names a directory; add a trailing slash")
            }
            MissingReason::Permalink { candidate } => {
                write!(f, "extensionless permalink; {candidate} exists but is not mapped")
            }
            MissingReason::EscapesRoot => write!(f, "climbs above the site root"),
        }
    }
}

/// One validated reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationRecord {
    pub origin: String,
    pub reference: String,
    pub kind: ReferenceKind,
    /// Resolved site path; absent for external and skipped references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<MissingReason>,
}
