//! Name sanitizing for dedup and search comparisons
//!
//! Display names are compared through [`sanitize`]: parenthesized notes are
//! dropped, the rest is lowercased, stripped of punctuation and trimmed.
//! Two names are "the same" when their sanitized forms are equal, and a query
//! matches a name when the sanitized name contains the sanitized query.

/// Characters removed from names before comparison
pub const STRIPPED_CHARS: &[char] = &[
    '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', '-', '_', '+', '=', '{', '}', '[', ']',
    '\\', '|', ':', ';', '"', '\'', '<', '>', ',', '.', '?', '/', '`', '~',
];

/// Normalize a display name for comparison
///
/// # Examples
///
/// ```
/// use kvt_common::sanitize;
///
/// assert_eq!(sanitize("Hey Jude (Remastered 2015)!!"), "hey jude");
/// assert_eq!(sanitize("  AC/DC "), "acdc");
/// ```
pub fn sanitize(name: &str) -> String {
    strip_parenthesized(name)
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Remove every `(` through the next `)`
///
/// An opening parenthesis without a closing one is kept here and removed
/// later with the rest of the punctuation.
fn strip_parenthesized(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut rest = name;

    while let Some(open) = rest.find('(') {
        match rest[open..].find(')') {
            Some(close) => {
                result.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }

    result.push_str(rest);
    result
}
