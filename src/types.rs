//! Shared types threaded through every pipeline stage.
//!
//! A [`SiteFile`] is created by the tree walker and flows forward through
//! rewriting, validation and image optimisation. Its identity (the relative
//! path) never changes; its payload may be replaced in place. The entry
//! assembler finally turns each one into an [`ArchiveEntry`].

use crate::mime::ContentFamily;
use std::borrow::Cow;
use std::io;
use std::path::PathBuf;

/// Where the bytes of a file currently live.
///
/// Files start out [`OnDisk`](Payload::OnDisk) and are only read when a stage
/// needs their contents, so the whole site is never held in memory at once.
/// A stage that transforms the bytes swaps in [`Bytes`](Payload::Bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    OnDisk(PathBuf),
    Bytes(Vec<u8>),
}

impl Payload {
    /// Read the payload, borrowing when it is already in memory.
    pub fn read(&self) -> io::Result<Cow<'_, [u8]>> {
        match self {
            Payload::OnDisk(path) => std::fs::read(path).map(Cow::Owned),
            Payload::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, Payload::Bytes(_))
    }
}

/// One regular file of the source site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFile {
    /// Posix-style path relative to the site root, case preserved.
    pub path: String,
    /// Number of `/` separators in `path`; root-level files are depth 0.
    pub depth: usize,
    /// Content-type label from the extension classifier.
    pub content_type: &'static str,
    /// Family tag from the extension classifier.
    pub family: ContentFamily,
    /// Current payload size in bytes.
    pub size: u64,
    pub payload: Payload,
}

impl SiteFile {
    /// Swap in a transformed payload, keeping the recorded size in sync.
    pub fn replace_payload(&mut self, bytes: Vec<u8>) {
        self.size = bytes.len() as u64;
        self.payload = Payload::Bytes(bytes);
    }
}

/// Depth of a site-relative path: one per separator.
///
/// ```
/// # use site2zim::types::depth_of;
/// assert_eq!(depth_of("index.html"), 0);
/// assert_eq!(depth_of("blog/2024/post.html"), 2);
/// ```
pub fn depth_of(path: &str) -> usize {
    path.bytes().filter(|&b| b == b'/').count()
}

/// Final unit handed to the archive writer: one per [`SiteFile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Namespace key; identical to the source file's relative path.
    pub path: String,
    pub content_type: &'static str,
    pub payload: Payload,
}
