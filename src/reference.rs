//! Reference classification and the depth-relative rewrite rule.
//!
//! Every path-like string found in markup or style content is one of five
//! kinds. The kind alone decides what happens to it:
//!
//! | Kind | Example | Rewritten | Validated |
//! |---|---|---|---|
//! | [`SiteAbsolute`](ReferenceKind::SiteAbsolute) | `/css/site.css` | yes | against the file set |
//! | [`Relative`](ReferenceKind::Relative) | `../img/a.png` | no | against the file set |
//! | [`External`](ReferenceKind::External) | `https://x.org`, `//cdn/x.js`, `data:…` | no | recorded as external |
//! | [`AnchorOnly`](ReferenceKind::AnchorOnly) | `#top` | no | skipped |
//! | [`UnknownScheme`](ReferenceKind::UnknownScheme) | `foo:bar` | no | skipped |
//!
//! ## Rewrite rule
//!
//! For a file at depth `D`, a site-absolute reference `/a/b?q#f` becomes
//! `D` copies of `../` followed by `a/b?q#f`. The output never starts with a
//! separator, so running the rule on its own output changes nothing.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    SiteAbsolute,
    Relative,
    External,
    AnchorOnly,
    UnknownScheme,
}

/// Schemes treated as pointing outside the archive.
const EXTERNAL_SCHEMES: &[&str] = &[
    "about", "blob", "data", "file", "ftp", "ftps", "geo", "git", "http", "https", "irc",
    "ircs", "javascript", "magnet", "mailto", "news", "sftp", "sms", "ssh", "tel", "urn",
    "webcal", "ws", "wss", "xmpp",
];

impl ReferenceKind {
    pub fn classify(raw: &str) -> Self {
        Self::classify_bytes(raw.as_bytes())
    }

    /// Classify raw bytes; only the ASCII prefix matters, so content that is
    /// not valid UTF-8 classifies the same as its lossy decoding would.
    pub fn classify_bytes(raw: &[u8]) -> Self {
        match raw {
            [b'#', ..] => ReferenceKind::AnchorOnly,
            [b'/', b'/', ..] => ReferenceKind::External,
            [b'/', ..] => ReferenceKind::SiteAbsolute,
            _ => match scheme_of(raw) {
                Some(scheme) if is_external_scheme(scheme) => ReferenceKind::External,
                Some(_) => ReferenceKind::UnknownScheme,
                None => ReferenceKind::Relative,
            },
        }
    }

    /// Only site-absolute references are ever rewritten.
    pub fn is_rewritable(self) -> bool {
        self == ReferenceKind::SiteAbsolute
    }
}

fn is_external_scheme(scheme: &[u8]) -> bool {
    EXTERNAL_SCHEMES
        .iter()
        .any(|known| known.as_bytes().eq_ignore_ascii_case(scheme))
}

/// URI scheme of a reference, per RFC 3986: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`,
/// appearing before any `/`, `?` or `#`.
fn scheme_of(raw: &[u8]) -> Option<&[u8]> {
    let colon = raw.iter().position(|&b| b == b':')?;
    let scheme = &raw[..colon];
    let (first, rest) = scheme.split_first()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    rest.iter()
        .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
        .then_some(scheme)
}

/// The `../` prefix for a file at `depth`.
pub fn relative_prefix(depth: usize) -> String {
    "../".repeat(depth)
}

/// Rewrite a site-absolute reference for a file at `depth`.
///
/// Returns `None` for any other kind, which is what makes the rule
/// idempotent. A bare root reference (`/`, `/?q`, `/#f`) at depth 0 becomes
/// `./` so it never collapses to an empty string.
///
/// ```
/// # use site2zim::reference::rewrite_site_absolute;
/// assert_eq!(rewrite_site_absolute("/css/style.css", 0).as_deref(), Some("css/style.css"));
/// assert_eq!(rewrite_site_absolute("/img/a.png?v=2", 2).as_deref(), Some("../../img/a.png?v=2"));
/// assert_eq!(rewrite_site_absolute("img/a.png", 2), None);
/// ```
pub fn rewrite_site_absolute(reference: &str, depth: usize) -> Option<String> {
    let bytes = rewrite_site_absolute_bytes(reference.as_bytes(), depth)?;
    // Only ASCII was added and a leading ASCII byte removed.
    String::from_utf8(bytes).ok()
}

/// Byte-level form of [`rewrite_site_absolute`], safe on content that is not
/// valid UTF-8: the original bytes after the separator are copied verbatim.
pub fn rewrite_site_absolute_bytes(reference: &[u8], depth: usize) -> Option<Vec<u8>> {
    if !ReferenceKind::classify_bytes(reference).is_rewritable() {
        return None;
    }
    let rest = &reference[1..];
    let mut out = relative_prefix(depth).into_bytes();
    if out.is_empty() && matches!(rest.first(), None | Some(b'?') | Some(b'#')) {
        out.extend_from_slice(b"./");
    }
    out.extend_from_slice(rest);
    Some(out)
}

/// Split a reference into its path and its `?query#fragment` suffix.
pub fn split_suffix(reference: &str) -> (&str, &str) {
    match reference.find(['?', '#']) {
        Some(at) => reference.split_at(at),
        None => (reference, ""),
    }
}
