//! # site2zim
//!
//! Turns a mirrored website on disk into the namespace of a self-contained
//! offline archive. Every file becomes one entry with a content type, every
//! site-absolute reference in HTML and CSS is rewritten so it still works
//! without a web server, and every reference is checked against the files
//! that actually exist.
//!
//! # Architecture: One Pass, Then Hand Off
//!
//! ```text
//! 1. Walk       mirror/     →  SiteFile list + PathIndex   (fatal on I/O error)
//! 2. Process    per file, in parallel:
//!                 classify → rewrite → validate → optimize (optional)
//! 3. Report     findings + validation records              (never fatal)
//! 4. Assemble   SiteFile list →  ArchiveEntry list          (skipped on dry run)
//! 5. Write      ArchiveWriter (DirectoryWriter by default)
//! ```
//!
//! The index is built from the whole tree before step 2, so validation sees
//! every file regardless of processing order. Step 2 is embarrassingly
//! parallel; results are collected back in walk order so the report and the
//! entry list are deterministic.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`walk`] | Lazy recursive traversal, symlink-cycle detection, depth computation |
//! | [`mime`] | Extension to content-type table with an HTML fallback |
//! | [`reference`] | Classifies one reference and applies the site-absolute rewrite rule |
//! | [`rewrite`] | Finds references in HTML and CSS bytes and rewrites them in place |
//! | [`validate`] | [`validate::PathIndex`] and per-reference resolution with reasons |
//! | [`imaging`] | Pure-Rust decode, resize and re-encode behind [`imaging::ImageBackend`] |
//! | [`optimize`] | Which images to re-encode and what happens when it fails |
//! | [`report`] | Findings, summary counts, JSON and HTML rendering |
//! | [`assemble`] | Final entry list, one per file, duplicate-free |
//! | [`archive`] | Archive metadata and the [`archive::ArchiveWriter`] seam |
//! | [`pipeline`] | Runs the stages above in order |
//! | [`config`] | `site2zim.toml` loading, layering and validation |
//! | [`naming`] | Archive-name and language-code checks |
//! | [`types`] | `SiteFile`, `Payload` and `ArchiveEntry` shared by every stage |
//! | [`output`] | Terminal formatting of the report |
//!
//! # Design Decisions
//!
//! ## Rewrite Only What Is Known To Be Site-Absolute
//!
//! A reference like `/css/style.css` only works when the site is served from
//! a domain root. Inside an archive it must become `css/style.css` (or
//! `../css/style.css` one level down). Relative references, external URLs,
//! anchors and unknown schemes already mean the same thing everywhere and are
//! left byte-for-byte alone. Protocol-relative `//host/x` references are
//! external, not site-absolute.
//!
//! ## Report, Never Guess
//!
//! A reference to a missing file is recorded with a reason (directory
//! without `index.html`, extensionless permalink, escapes the root) but the
//! archive is not patched to "fix" it. Conversion of a broken site succeeds;
//! the report says what is broken.
//!
//! ## Bytes In, Bytes Out
//!
//! Rewriting works on raw bytes, not decoded text. Files in legacy encodings
//! pass through with only their ASCII reference spans touched. Files that are
//! clearly not text (dense with NUL bytes, or UTF-16) are skipped and
//! reported.
//!
//! ## Untouched Files Stay On Disk
//!
//! A file nobody transforms keeps an on-disk payload and is streamed by the
//! writer straight from the mirror. Only rewritten pages and re-encoded
//! images are held in memory.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling, JPEG
//! and PNG encoders). No system libraries are needed, and a re-encode is only
//! kept when it comes out smaller than the original.

pub mod archive;
pub mod assemble;
pub mod config;
pub mod imaging;
pub mod mime;
pub mod naming;
pub mod optimize;
pub mod output;
pub mod pipeline;
pub mod reference;
pub mod report;
pub mod rewrite;
pub mod types;
pub mod validate;
pub mod walk;

#[cfg(test)]
pub(crate) mod test_helpers;
