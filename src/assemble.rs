//! Entry assembly.
//!
//! Zips each processed [`SiteFile`] into an [`ArchiveEntry`], one to one, in
//! walk order. No business logic lives here; the only checks guard the
//! namespace contract the archive writer relies on.

use crate::types::{ArchiveEntry, SiteFile};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssembleError {
    #[error("Duplicate archive path: {0}")]
    DuplicatePath(String),
    #[error("Invalid archive path: {0:?}")]
    InvalidPath(String),
}

/// A namespace key must be non-empty, relative, and free of empty or dot segments.
fn is_valid_key(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && path
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | ".."))
}

pub fn assemble(files: Vec<SiteFile>) -> Result<Vec<ArchiveEntry>, AssembleError> {
    let mut seen = HashSet::with_capacity(files.len());
    files
        .into_iter()
        .map(|file| {
            if !is_valid_key(&file.path) {
                return Err(AssembleError::InvalidPath(file.path));
            }
            if !seen.insert(file.path.clone()) {
                return Err(AssembleError::DuplicatePath(file.path));
            }
            Ok(ArchiveEntry {
                path: file.path,
                content_type: file.content_type,
                payload: file.payload,
            })
        })
        .collect()
}
