//! URL Slugs
//!
//! Slugs are the lowercase ASCII form of a title, cut to [`MAX_BASE_LENGTH`]
//! and suffixed with random hex so that two articles with the same title
//! still get distinct slugs. Uniqueness is still enforced by storage.

use crate::crypto::random_hex;

/// Maximum length of the title-derived part of a slug
pub const MAX_BASE_LENGTH: usize = 20;

/// Random bytes in the suffix (rendered as twice as many hex characters)
const SUFFIX_BYTES: usize = 4;

/// Build a fresh slug for `title`
///
/// ```
/// let slug = platform::slug::generate("How to train your dragon");
/// assert!(slug.starts_with("how-to-train-your-"));
/// assert_eq!(slug.len(), "how-to-train-your".len() + 1 + 8);
/// ```
pub fn generate(title: &str) -> String {
    let base = base_slug(title);
    let suffix = random_hex(SUFFIX_BYTES);

    if base.is_empty() {
        suffix
    } else {
        format!("{}-{}", base, suffix)
    }
}

/// Title-derived part of a slug, without the random suffix
pub fn base_slug(title: &str) -> String {
    truncate_at_word(&slug::slugify(title), MAX_BASE_LENGTH).to_string()
}

/// Cut at the last `-` that keeps the result within `max`, or hard-cut a
/// single long word.
fn truncate_at_word(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }

    // slugify only emits ASCII, so byte indices are char boundaries
    match text.as_bytes()[..=max].iter().rposition(|&b| b == b'-') {
        Some(cut) => &text[..cut],
        None => &text[..max],
    }
}
