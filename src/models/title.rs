//! Page title canonicalization.
//!
//! Canonical titles are the node identity: trimmed, internal whitespace
//! collapsed, spaces replaced by [`TITLE_SEPARATOR`].

/// Separator used in canonical titles in place of spaces.
pub const TITLE_SEPARATOR: char = '_';

/// Canonicalizes a raw title into a node id.
///
/// Idempotent: `canonicalize(&canonicalize(x)) == canonicalize(x)`.
pub fn canonicalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(' ', &TITLE_SEPARATOR.to_string())
}

/// Display form of a canonical title. Not guaranteed to round-trip.
pub fn prettify(id: &str) -> String {
    id.replace(TITLE_SEPARATOR, " ")
}
