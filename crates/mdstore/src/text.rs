//! Slug helpers for naming documents on disk.

/// Fallback slug for input with no ASCII letters or digits.
pub const UNTITLED: &str = "untitled";

/// Convert `text` to a filesystem- and URL-safe slug.
///
/// Lowercases, turns every run of characters outside `[a-z0-9]` into a single
/// `-`, and trims leading/trailing hyphens. Returns `"untitled"` when nothing
/// is left. Non-ASCII letters are treated as separators.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        UNTITLED.to_string()
    } else {
        slug
    }
}

/// Slug for `text` that `exists` reports as free.
///
/// Tries `slugify(text)` first, then `<slug>-2`, `<slug>-3`, and so on.
pub fn unique_slug<F>(text: &str, mut exists: F) -> String
where
    F: FnMut(&str) -> bool,
{
    let base = slugify(text);
    if !exists(&base) {
        return base;
    }

    let mut n: u64 = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
