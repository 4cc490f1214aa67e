//! Conversion configuration.
//!
//! Handles loading, validating, and merging `site2zim.toml`. Configuration
//! is layered; each layer only overrides the keys it sets:
//!
//! ```text
//! stock defaults  →  site2zim.toml (or --config <path>)  →  command-line flags
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # Archive metadata. Required unless dry-run is set.
//! name = "my-site"
//! title = "My Site"
//! creator = "Jane Doe"
//! description = "Offline copy of my site"
//! language = "eng"             # ISO 639-3
//!
//! # Optional metadata
//! publisher = "You"
//! icon = "icons/comment.png"
//! main-page = "index.html"
//!
//! # Image optimisation
//! optimize-images = false
//! max-image-width = 1920
//! image-quality = 85           # 1-100, JPEG only
//! min-image-bytes = 51200
//!
//! # Run mode
//! dry-run = false              # report only, no archive
//! report = false               # write conversion_report.html/.json
//! max-processes = 4            # omit for auto = CPU cores
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::naming::{is_valid_archive_name, is_valid_language_code};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const CONFIG_FILE: &str = "site2zim.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Missing required metadata: {}", .0.join(", "))]
    MissingField(Vec<&'static str>),
    #[error("Cannot read icon {}: {source}", path.display())]
    Icon {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Run configuration.
///
/// All fields have defaults. Metadata fields are optional here and checked
/// separately by [`require_metadata`](Self::require_metadata), since a dry
/// run does not need them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ConvertConfig {
    /// Archive name; also the output directory name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    pub publisher: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// ISO 639-3 language code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
    /// Entry the archive opens on; must be one of the site's files.
    pub main_page: String,
    pub optimize_images: bool,
    pub max_image_width: u32,
    pub image_quality: u32,
    /// Images smaller than this many bytes are never re-encoded.
    pub min_image_bytes: u64,
    pub dry_run: bool,
    pub report: bool,
    /// Maximum parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            name: None,
            title: None,
            creator: None,
            publisher: "You".to_string(),
            description: None,
            language: None,
            icon: None,
            main_page: "index.html".to_string(),
            optimize_images: false,
            max_image_width: 1920,
            image_quality: 85,
            min_image_bytes: 50 * 1024,
            dry_run: false,
            report: false,
            max_processes: None,
        }
    }
}

impl ConvertConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.image_quality) {
            return Err(ConfigError::Validation(
                "image-quality must be 1-100".into(),
            ));
        }
        if self.max_image_width == 0 {
            return Err(ConfigError::Validation(
                "max-image-width must be greater than 0".into(),
            ));
        }
        if self.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "max-processes must be at least 1".into(),
            ));
        }
        if self.main_page.is_empty() || self.main_page.starts_with('/') {
            return Err(ConfigError::Validation(
                "main-page must be a site-relative path".into(),
            ));
        }
        if let Some(language) = &self.language {
            if !is_valid_language_code(language) {
                return Err(ConfigError::Validation(format!(
                    "language must be a three-letter ISO 639-3 code, got {language:?}"
                )));
            }
        }
        if let Some(name) = &self.name {
            if !is_valid_archive_name(name) {
                return Err(ConfigError::Validation(format!(
                    "name {name:?} contains characters not allowed in file names"
                )));
            }
        }
        Ok(())
    }

    /// Check that every required metadata field is present and non-blank.
    pub fn require_metadata(&self) -> Result<(), ConfigError> {
        let missing: Vec<&'static str> = [
            ("name", &self.name),
            ("title", &self.title),
            ("creator", &self.creator),
            ("description", &self.description),
            ("language", &self.language),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(key, _)| key)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingField(missing))
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ConvertConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ConvertConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge the given layers in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<ConvertConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: ConvertConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the run configuration.
///
/// An explicit `file` must exist. Without one, [`CONFIG_FILE`] in the
/// working directory is used if present. `overrides` (typically from
/// command-line flags) win over both.
pub fn load_config(
    file: Option<&Path>,
    overrides: toml::Value,
) -> Result<ConvertConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let from_file = match file {
        Some(path) => Some(toml::from_str(&fs::read_to_string(path)?)?),
        None => load_raw_config(Path::new(CONFIG_FILE))?,
    };
    resolve_config(base, from_file.into_iter().chain(Some(overrides)))
}

/// Returns a fully-commented stock `site2zim.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# site2zim Configuration
# ======================
# Values shown below are the defaults. Command-line flags override this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Archive metadata
# ---------------------------------------------------------------------------
# Required for a real conversion; a dry run works without them.
# name = "my-site"                  # archive and output directory name
# title = "My Site"
# creator = "Jane Doe"
# description = "Offline copy of my site"
# language = "eng"                  # ISO 639-3, three letters

publisher = "You"

# Path to an icon image stored with the archive.
# icon = "icons/comment.png"

# Entry the archive opens on. Must exist in the site.
main-page = "index.html"

# ---------------------------------------------------------------------------
# Image optimization
# ---------------------------------------------------------------------------
# Re-encode JPEG and PNG files, keeping the result only when it is smaller.
optimize-images = false

# Images wider than this are scaled down, keeping the aspect ratio.
max-image-width = 1920

# JPEG quality (1 = worst, 100 = best). PNG is always lossless.
image-quality = 85

# Images smaller than this many bytes are left alone.
min-image-bytes = 51200

# ---------------------------------------------------------------------------
# Run mode
# ---------------------------------------------------------------------------
# Run every check and produce the report, but write no archive.
dry-run = false

# Write conversion_report.html and conversion_report.json to the output directory.
report = false

# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max-processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn overrides(toml: &str) -> toml::Value {
        toml::from_str(toml).unwrap()
    }

    fn empty() -> toml::Value {
        toml::Value::Table(toml::map::Map::new())
    }

    #[test]
    fn default_config_values() {
        let config = ConvertConfig::default();
        assert_eq!(config.publisher, "You");
        assert_eq!(config.main_page, "index.html");
        assert_eq!(config.max_image_width, 1920);
        assert_eq!(config.image_quality, 85);
        assert_eq!(config.min_image_bytes, 51_200);
        assert!(!config.optimize_images);
        assert!(!config.dry_run);
        assert!(config.name.is_none());
    }

    #[test]
    fn parse_partial_config() {
        let config: ConvertConfig = toml::from_str(
            r#"
title = "My Site"
optimize-images = true
"#,
        )
        .unwrap();
        assert_eq!(config.title.as_deref(), Some("My Site"));
        assert!(config.optimize_images);
        // Unspecified defaults preserved
        assert_eq!(config.image_quality, 85);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<ConvertConfig, _> = toml::from_str("optimise-images = true");
        assert!(result.is_err());
    }

    #[test]
    fn snake_case_keys_are_rejected() {
        let result: Result<ConvertConfig, _> = toml::from_str("max_image_width = 800");
        assert!(result.is_err());
    }

    // =========================================================================
    // validate tests
    // =========================================================================

    #[test]
    fn validate_accepts_defaults() {
        assert!(ConvertConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_range() {
        for quality in [0, 101] {
            let config = ConvertConfig {
                image_quality: quality,
                ..Default::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
        }
        for quality in [1, 100] {
            let config = ConvertConfig {
                image_quality: quality,
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn validate_zero_width() {
        let config = ConvertConfig {
            max_image_width: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_language_code() {
        for bad in ["en", "english", "e1g", ""] {
            let config = ConvertConfig {
                language: Some(bad.into()),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad}");
        }
        let config = ConvertConfig {
            language: Some("fra".into()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_archive_name() {
        let config = ConvertConfig {
            name: Some("bad/name".into()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_main_page_is_relative() {
        let config = ConvertConfig {
            main_page: "/index.html".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_zero_processes() {
        let config = ConvertConfig {
            max_processes: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // require_metadata tests
    // =========================================================================

    #[test]
    fn require_metadata_lists_every_missing_field() {
        let err = ConvertConfig::default().require_metadata().unwrap_err();
        match err {
            ConfigError::MissingField(fields) => assert_eq!(
                fields,
                vec!["name", "title", "creator", "description", "language"]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn require_metadata_treats_blank_as_missing() {
        let config = ConvertConfig {
            title: Some("   ".into()),
            ..crate::test_helpers::complete_config()
        };
        assert!(matches!(
            config.require_metadata(),
            Err(ConfigError::MissingField(f)) if f == vec!["title"]
        ));
    }

    #[test]
    fn require_metadata_accepts_complete_config() {
        assert!(
            crate::test_helpers::complete_config()
                .require_metadata()
                .is_ok()
        );
    }

    #[test]
    fn missing_field_message_names_fields() {
        let err = ConfigError::MissingField(vec!["title", "language"]);
        assert_eq!(err.to_string(), "Missing required metadata: title, language");
    }

    // =========================================================================
    // effective_threads tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ConvertConfig::default()), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let config = ConvertConfig {
            max_processes: Some(100_000),
            ..Default::default()
        };
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_constrained_down() {
        let config = ConvertConfig {
            max_processes: Some(1),
            ..Default::default()
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_overlay_replaces_scalars() {
        let base = overrides("image-quality = 85\npublisher = \"You\"");
        let merged = merge_toml(base, overrides("image-quality = 60"));
        assert_eq!(merged["image-quality"].as_integer(), Some(60));
        assert_eq!(merged["publisher"].as_str(), Some("You"));
    }

    #[test]
    fn merge_nested_tables_key_by_key() {
        let base = overrides("[a]\nx = 1\ny = 2");
        let merged = merge_toml(base, overrides("[a]\ny = 3"));
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_explicit_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "title = \"From File\"\nimage-quality = 70\n").unwrap();

        let config = load_config(Some(&path), empty()).unwrap();
        assert_eq!(config.title.as_deref(), Some("From File"));
        assert_eq!(config.image_quality, 70);
        assert_eq!(config.max_image_width, 1920);
    }

    #[test]
    fn load_config_overrides_win_over_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "title = \"From File\"\nimage-quality = 70\n").unwrap();

        let config = load_config(Some(&path), overrides("image-quality = 40")).unwrap();
        assert_eq!(config.title.as_deref(), Some("From File"));
        assert_eq!(config.image_quality, 40);
    }

    #[test]
    fn load_config_missing_explicit_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(Some(&tmp.path().join("nope.toml")), empty());
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "this is not valid toml [[[").unwrap();
        assert!(matches!(
            load_config(Some(&path), empty()),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn load_config_validates_after_merge() {
        let result = load_config(None, overrides("image-quality = 0"));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_raw_config_absent_file_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(
            load_raw_config(&tmp.path().join("site2zim.toml"))
                .unwrap()
                .is_none()
        );
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_defaults_omit_unset_options() {
        let value = stock_defaults_value().unwrap();
        assert!(value.get("name").is_none());
        assert!(value.get("max-processes").is_none());
        assert_eq!(value["main-page"].as_str(), Some("index.html"));
    }

    #[test]
    fn stock_config_toml_round_trips_to_defaults() {
        let parsed: ConvertConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(parsed, ConvertConfig::default());
    }

    #[test]
    fn stock_config_toml_mentions_every_key() {
        let text = stock_config_toml();
        for key in [
            "name",
            "title",
            "creator",
            "publisher",
            "description",
            "language",
            "icon",
            "main-page",
            "optimize-images",
            "max-image-width",
            "image-quality",
            "min-image-bytes",
            "dry-run",
            "report",
            "max-processes",
        ] {
            assert!(text.contains(&format!("{key} =")), "missing {key}");
        }
    }
}
