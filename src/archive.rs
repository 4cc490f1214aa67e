//! Hand-off to the archive container writer.
//!
//! The conversion engine does not know how the final single-file archive is
//! laid out. It hands an ordered entry list plus [`ArchiveMetadata`] to an
//! [`ArchiveWriter`] and is done. The writer is only ever called after every
//! file has been processed without a fatal error.
//!
//! [`DirectoryWriter`] is the built-in writer. It materialises the namespace
//! as an unpacked tree that any packer can consume:
//!
//! ```text
//! <output>/<name>/
//! ├── metadata.json       # title, creator, language, main page, ...
//! ├── entries.json        # path, content-type, size, sha256 per entry
//! ├── illustration        # icon bytes, when configured
//! └── content/
//!     ├── index.html
//!     └── css/style.css
//! ```

use crate::config::{ConfigError, ConvertConfig};
use crate::types::ArchiveEntry;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

pub const METADATA_FILE: &str = "metadata.json";
pub const ENTRIES_FILE: &str = "entries.json";
pub const ILLUSTRATION_FILE: &str = "illustration";
pub const CONTENT_DIR: &str = "content";

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot write entry {path}: {source}")]
    Entry {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Descriptive metadata stored alongside the entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArchiveMetadata {
    pub name: String,
    pub title: String,
    pub creator: String,
    pub publisher: String,
    pub description: String,
    /// ISO 639-3 code.
    pub language: String,
    pub main_page: String,
    /// Icon image bytes, read before any processing starts.
    #[serde(skip)]
    pub icon: Option<Vec<u8>>,
}

impl ArchiveMetadata {
    /// Collect metadata from a validated config, reading the icon if one is set.
    ///
    /// Fails with the list of absent required fields, or if the icon cannot be read.
    pub fn from_config(config: &ConvertConfig) -> Result<Self, ConfigError> {
        config.require_metadata()?;
        let icon = match &config.icon {
            Some(path) => Some(fs::read(path).map_err(|source| ConfigError::Icon {
                path: path.clone(),
                source,
            })?),
            None => None,
        };
        let field = |value: &Option<String>| value.clone().unwrap_or_default();
        Ok(Self {
            name: field(&config.name),
            title: field(&config.title),
            creator: field(&config.creator),
            publisher: config.publisher.clone(),
            description: field(&config.description),
            language: field(&config.language),
            main_page: config.main_page.clone(),
            icon,
        })
    }
}

/// Consumer of the finished namespace.
pub trait ArchiveWriter {
    fn write(
        &mut self,
        metadata: &ArchiveMetadata,
        entries: &[ArchiveEntry],
    ) -> Result<(), ArchiveError>;
}

/// One line of `entries.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct EntryRecord {
    pub path: String,
    pub content_type: String,
    pub size: u64,
    pub sha256: String,
}

/// Writes the namespace as a directory tree under `<output>/<name>/`.
#[derive(Debug, Clone)]
pub struct DirectoryWriter {
    output: PathBuf,
    written: Option<PathBuf>,
}

impl DirectoryWriter {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            written: None,
        }
    }

    /// Archive directory of the last successful write.
    pub fn written(&self) -> Option<&Path> {
        self.written.as_deref()
    }
}

impl ArchiveWriter for DirectoryWriter {
    fn write(
        &mut self,
        metadata: &ArchiveMetadata,
        entries: &[ArchiveEntry],
    ) -> Result<(), ArchiveError> {
        let root = self.output.join(&metadata.name);
        let content = root.join(CONTENT_DIR);
        fs::create_dir_all(&content)?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let bytes = entry.payload.read().map_err(|source| ArchiveError::Entry {
                path: entry.path.clone(),
                source,
            })?;
            let target = content.join(&entry.path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &bytes).map_err(|source| ArchiveError::Entry {
                path: entry.path.clone(),
                source,
            })?;
            debug!(path = %entry.path, size = bytes.len(), "entry written");
            records.push(EntryRecord {
                path: entry.path.clone(),
                content_type: entry.content_type.to_string(),
                size: bytes.len() as u64,
                sha256: format!("{:x}", Sha256::digest(&bytes)),
            });
        }

        fs::write(
            root.join(METADATA_FILE),
            serde_json::to_string_pretty(metadata)?,
        )?;
        fs::write(root.join(ENTRIES_FILE), serde_json::to_string_pretty(&records)?)?;
        if let Some(icon) = &metadata.icon {
            fs::write(root.join(ILLUSTRATION_FILE), icon)?;
        }

        info!(archive = %root.display(), entries = records.len(), "archive written");
        self.written = Some(root);
        Ok(())
    }
}
