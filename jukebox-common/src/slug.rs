//! Deterministic song id derivation
//!
//! The catalog is keyed by a slug built from artist + title so that
//! re-importing the same repertoire converges on the same ids.

/// Derive the catalog id for a song from its artist and title
///
/// Lowercases `"{artist}-{title}"`, maps separators and musical symbols
/// to url-safe text, strips punctuation, and collapses double dashes.
pub fn song_id(artist: &str, title: &str) -> String {
    let combined = format!("{}-{}", artist.to_lowercase(), title.to_lowercase());

    let mut out = String::with_capacity(combined.len());
    for c in combined.chars() {
        match c {
            '/' | ' ' => out.push('-'),
            '#' => out.push_str("sharp"),
            '♭' => out.push_str("flat"),
            '&' => out.push_str("and"),
            '(' | ')' | ',' | '.' | '\'' | ':' | '!' | '?' => {}
            _ => out.push(c),
        }
    }

    out.replace("--", "-")
}
