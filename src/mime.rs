//! Extension → content-type classification.
//!
//! The table is static and closed: adding a type means adding a row to
//! [`TYPES`]. Lookups are case-insensitive on the extension. An extension
//! missing from the table falls back to [`HTML`] and is tagged
//! [`ContentFamily::Unknown`] so the caller can record the finding; the
//! fallback never happens silently.
//!
//! | Family | Examples |
//! |---|---|
//! | Markup | `html`, `htm`, `xhtml` |
//! | Style | `css`, `scss` |
//! | Script | `js`, `mjs`, `ts`, `sh` |
//! | Image | `png`, `jpg`, `gif`, `svg`, `webp`, `ico` |
//! | Document | `pdf`, `txt`, `docx`, `epub` |
//! | Data | `json`, `xml`, `csv`, `map` |
//! | Media | `mp3`, `mp4`, `wav`, `webm` |
//! | Archive | `zip`, `gz`, `rar`, `bin` |
//! | Font | `woff`, `woff2`, `ttf`, `otf`, `eot` |

use serde::Serialize;

/// Fallback content-type for unknown extensions.
pub const HTML: &str = "text/html";

/// Coarse grouping of content-types, used to decide which stages apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentFamily {
    Markup,
    Style,
    Script,
    Image,
    Document,
    Data,
    Media,
    Archive,
    Font,
    Unknown,
}

use ContentFamily::*;

const TYPES: &[(&str, &str, ContentFamily)] = &[
    // Markup
    ("html", "text/html", Markup),
    ("htm", "text/html", Markup),
    ("xhtml", "application/xhtml+xml", Markup),
    // Style
    ("css", "text/css", Style),
    ("scss", "text/x-scss", Style),
    // Script
    ("js", "application/javascript", Script),
    ("mjs", "application/javascript", Script),
    ("ts", "application/typescript", Script),
    ("sh", "application/x-sh", Script),
    // Image
    ("avif", "image/avif", Image),
    ("bmp", "image/bmp", Image),
    ("gif", "image/gif", Image),
    ("ico", "image/x-icon", Image),
    ("jpeg", "image/jpeg", Image),
    ("jpg", "image/jpeg", Image),
    ("png", "image/png", Image),
    ("svg", "image/svg+xml", Image),
    ("tif", "image/tiff", Image),
    ("tiff", "image/tiff", Image),
    ("webp", "image/webp", Image),
    // Document
    ("doc", "application/msword", Document),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Document,
    ),
    ("epub", "application/epub+zip", Document),
    ("odp", "application/vnd.oasis.opendocument.presentation", Document),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet", Document),
    ("odt", "application/vnd.oasis.opendocument.text", Document),
    ("pdf", "application/pdf", Document),
    ("ppt", "application/vnd.ms-powerpoint", Document),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        Document,
    ),
    ("txt", "text/plain", Document),
    ("md", "text/markdown", Document),
    ("xls", "application/vnd.ms-excel", Document),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Document,
    ),
    // Data
    ("atom", "application/atom+xml", Data),
    ("csv", "text/csv", Data),
    ("ics", "text/calendar", Data),
    ("json", "application/json", Data),
    ("map", "application/json", Data),
    ("rss", "application/rss+xml", Data),
    ("webmanifest", "application/manifest+json", Data),
    ("xml", "application/xml", Data),
    // Media
    ("mid", "audio/midi", Media),
    ("midi", "audio/midi", Media),
    ("mp3", "audio/mpeg", Media),
    ("mp4", "video/mp4", Media),
    ("mpeg", "video/mpeg", Media),
    ("ogg", "audio/ogg", Media),
    ("wav", "audio/x-wav", Media),
    ("webm", "video/webm", Media),
    // Archive
    ("7z", "application/x-7z-compressed", Archive),
    ("bin", "application/octet-stream", Archive),
    ("bz", "application/x-bzip", Archive),
    ("bz2", "application/x-bzip2", Archive),
    ("gz", "application/gzip", Archive),
    ("jar", "application/java-archive", Archive),
    ("rar", "application/x-rar-compressed", Archive),
    ("tar", "application/x-tar", Archive),
    ("zip", "application/zip", Archive),
    // Font
    ("eot", "application/vnd.ms-fontobject", Font),
    ("otf", "font/otf", Font),
    ("ttf", "font/ttf", Font),
    ("woff", "font/woff", Font),
    ("woff2", "font/woff2", Font),
];

/// Raster formats the image optimizer may look at.
const RASTER_TYPES: &[&str] = &[
    "image/avif",
    "image/bmp",
    "image/gif",
    "image/jpeg",
    "image/png",
    "image/tiff",
    "image/webp",
];

/// Result of classifying one extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub content_type: &'static str,
    pub family: ContentFamily,
}

/// Classify a bare extension (without the dot).
pub fn classify_extension(ext: &str) -> Classification {
    TYPES
        .iter()
        .find(|(known, _, _)| known.eq_ignore_ascii_case(ext))
        .map(|&(_, content_type, family)| Classification {
            content_type,
            family,
        })
        .unwrap_or(Classification {
            content_type: HTML,
            family: Unknown,
        })
}

/// Classify a site-relative path by its extension.
pub fn classify_path(path: &str) -> Classification {
    classify_extension(extension_of(path).unwrap_or(""))
}

/// Extension of the last path segment, if any.
///
/// A leading dot marks a hidden file, not an extension: `.htaccess` has none,
/// `.config.json` has `json`.
pub fn extension_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let dot = name.rfind('.')?;
    if dot == 0 || dot + 1 == name.len() {
        return None;
    }
    Some(&name[dot + 1..])
}

/// Whether a content-type is a raster image family member.
pub fn is_raster(content_type: &str) -> bool {
    RASTER_TYPES.contains(&content_type)
}
