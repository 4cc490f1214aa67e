//! Reference rewriting for markup and style content.
//!
//! Scans an HTML or CSS payload for URL-bearing constructs, classifies each
//! occurrence with [`ReferenceKind`], and rewrites site-absolute ones into
//! depth-relative form. Everything else is reported but left byte-for-byte
//! as it was.
//!
//! ## Scanned constructs
//!
//! | Dialect | Construct |
//! |---|---|
//! | HTML | `href`, `xlink:href`, `src`, `action`, `poster`, `data`, `data-src`, `formaction`, `cite`, `background`, `longdesc`, `manifest` attributes (quoted or bare) |
//! | HTML | `srcset` / `data-srcset` candidate lists (quoted or bare) |
//! | HTML + CSS | `url(...)` tokens (inline styles and `<style>` blocks included) |
//! | CSS | `@import "..."` |
//!
//! ## Byte safety
//!
//! Matching runs on raw bytes with Unicode disabled, so a stylesheet that is
//! not valid UTF-8 is still scanned and rewritten; only the bytes of the
//! rewritten references change. A stray NUL byte is matched around like any
//! other byte. Content dense with NULs (binary mislabelled as HTML, or
//! UTF-16) is not text markup at all and is handed back as
//! [`RewriteSkipped`] so it passes through untouched.
//!
//! Quoted values are matched up to, but not including, their closing quote,
//! so `src="/a.png"data-src="/b.png"` yields both values.

use crate::mime::ContentFamily;
use crate::reference::{ReferenceKind, rewrite_site_absolute_bytes};
use regex::bytes::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static HTML_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i-u)(?:^|[\s"'])(?:href|xlink:href|src|action|poster|data|data-src|formaction|cite|background|longdesc|manifest)\s*=\s*(?:"([^"]*)|'([^']*)|([^\s"'<>`]+))"#,
    )
    .expect("attribute pattern must compile")
});

static SRCSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i-u)(?:^|[\s"'])(?:srcset|data-srcset)\s*=\s*(?:"([^"]*)|'([^']*)|([^\s"'<>`]+))"#,
    )
    .expect("srcset pattern must compile")
});

static CSS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]+))\s*\)"#)
        .expect("url() pattern must compile")
});

static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)@import\s+(?:"([^"]*)"|'([^']*)')"#).expect("@import pattern must compile")
});

/// Which scanner applies to a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Html,
    Css,
}

impl Dialect {
    /// Markup and style files are scanned; everything else passes through.
    pub fn for_family(family: ContentFamily) -> Option<Self> {
        match family {
            ContentFamily::Markup => Some(Dialect::Html),
            ContentFamily::Style => Some(Dialect::Css),
            _ => None,
        }
    }
}

/// A payload that could not be scanned. Non-fatal: the file is kept as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteSkipped {
    #[error("mostly NUL bytes; not text markup")]
    Binary,
    #[error("UTF-16 encoded; only byte-compatible encodings are scanned")]
    Utf16,
}

/// One reference found in a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundReference {
    /// Byte range of the reference text in the original payload.
    pub span: Range<usize>,
    /// Reference text as written (lossy if the payload was not UTF-8).
    pub raw: String,
    pub kind: ReferenceKind,
    /// Replacement text, set only for site-absolute references.
    pub rewritten: Option<String>,
}

/// Result of scanning one payload.
#[derive(Debug, Clone, Default)]
pub struct Rewrite {
    /// New payload, or `None` when nothing changed.
    pub payload: Option<Vec<u8>>,
    /// Every reference found, in payload order.
    pub references: Vec<FoundReference>,
}

impl Rewrite {
    pub fn rewritten_count(&self) -> usize {
        self.references
            .iter()
            .filter(|r| r.rewritten.is_some())
            .count()
    }
}

/// Scan `content` and rewrite its site-absolute references for a file at `depth`.
pub fn rewrite(content: &[u8], dialect: Dialect, depth: usize) -> Result<Rewrite, RewriteSkipped> {
    if content.starts_with(&[0xFF, 0xFE]) || content.starts_with(&[0xFE, 0xFF]) {
        return Err(RewriteSkipped::Utf16);
    }
    if looks_binary(content) {
        return Err(RewriteSkipped::Binary);
    }
    if std::str::from_utf8(content).is_err() {
        debug!("payload is not valid UTF-8; matching at byte level");
    }

    let spans = find_spans(content, dialect);
    let mut references = Vec::with_capacity(spans.len());
    let mut output: Option<Vec<u8>> = None;
    let mut copied_to = 0;

    for span in spans {
        let raw_bytes = &content[span.clone()];
        let kind = ReferenceKind::classify_bytes(raw_bytes);
        let replacement = rewrite_site_absolute_bytes(raw_bytes, depth);

        if let Some(bytes) = &replacement {
            let out = output.get_or_insert_with(|| Vec::with_capacity(content.len() + 64));
            out.extend_from_slice(&content[copied_to..span.start]);
            out.extend_from_slice(bytes);
            copied_to = span.end;
        }

        references.push(FoundReference {
            raw: String::from_utf8_lossy(raw_bytes).into_owned(),
            kind,
            rewritten: replacement.map(|b| String::from_utf8_lossy(&b).into_owned()),
            span,
        });
    }

    if let Some(out) = output.as_mut() {
        out.extend_from_slice(&content[copied_to..]);
    }

    Ok(Rewrite {
        payload: output,
        references,
    })
}

/// More than one byte in ten is NUL: binary data or BOM-less UTF-16.
/// A stray NUL in otherwise textual markup does not count.
fn looks_binary(content: &[u8]) -> bool {
    let nuls = content.iter().filter(|&&b| b == 0).count();
    nuls > 0 && nuls * 10 > content.len()
}

/// Byte ranges of every reference, sorted and non-overlapping.
fn find_spans(content: &[u8], dialect: Dialect) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    match dialect {
        Dialect::Html => {
            collect_values(&HTML_ATTR, content, &mut spans);
            collect_srcset(content, &mut spans);
            collect_values(&CSS_URL, content, &mut spans);
        }
        Dialect::Css => {
            collect_values(&CSS_URL, content, &mut spans);
            collect_values(&CSS_IMPORT, content, &mut spans);
        }
    }

    spans.sort_by_key(|s| (s.start, s.end));
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        if merged.last().is_some_and(|last| span.start < last.end) {
            continue;
        }
        merged.push(span);
    }
    merged
}

/// The first participating capture group of each match, trimmed.
fn collect_values(pattern: &Regex, content: &[u8], spans: &mut Vec<Range<usize>>) {
    for caps in pattern.captures_iter(content) {
        let Some(value) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        if let Some(span) = trim_span(content, value.range()) {
            spans.push(span);
        }
    }
}

/// Split `srcset` values into their candidate URLs.
///
/// Candidates are separated by commas, but a URL may itself contain commas
/// (`data:` URLs), so a URL runs to the next whitespace and only trailing
/// commas are dropped from it.
fn collect_srcset(content: &[u8], spans: &mut Vec<Range<usize>>) {
    for caps in SRCSET.captures_iter(content) {
        let Some(value) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        let bytes = value.as_bytes();
        let mut pos = 0;
        while pos < bytes.len() {
            while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b',') {
                pos += 1;
            }
            let start = pos;
            while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let mut end = pos;
            let ended_with_comma = end > start && bytes[end - 1] == b',';
            while end > start && bytes[end - 1] == b',' {
                end -= 1;
            }
            if end > start {
                spans.push(value.start() + start..value.start() + end);
            }
            if !ended_with_comma {
                while pos < bytes.len() && bytes[pos] != b',' {
                    pos += 1;
                }
            }
        }
    }
}

fn trim_span(content: &[u8], mut span: Range<usize>) -> Option<Range<usize>> {
    while span.start < span.end && content[span.start].is_ascii_whitespace() {
        span.start += 1;
    }
    while span.end > span.start && content[span.end - 1].is_ascii_whitespace() {
        span.end -= 1;
    }
    (!span.is_empty()).then_some(span)
}
