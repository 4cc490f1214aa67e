//! Archive naming and metadata value checks.
//!
//! The archive name doubles as a file name, so it must be portable across
//! file systems. Titles typed by people are turned into names with
//! [`sanitize_archive_name`]:
//!
//! - `"My Site"` → `"My-Site"`
//! - `"Notes: 2024/25"` → `"Notes-202425"`
//! - `"  padded  "` → `"padded"`

/// Characters that are invalid in a file name on at least one common platform.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// True if `name` is non-empty and usable as a file name everywhere.
pub fn is_valid_archive_name(name: &str) -> bool {
    !name.trim().is_empty()
        && !name.chars().any(|c| FORBIDDEN.contains(&c) || c.is_control())
        && name != "."
        && name != ".."
}

/// Derive a valid archive name from free text.
///
/// Whitespace runs become a single dash and forbidden characters are
/// dropped. Returns `None` if nothing usable is left.
pub fn sanitize_archive_name(text: &str) -> Option<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .collect();
    let name = cleaned.split_whitespace().collect::<Vec<_>>().join("-");
    is_valid_archive_name(&name).then_some(name)
}

/// ISO 639-3 codes are exactly three ASCII letters.
pub fn is_valid_language_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic())
}
