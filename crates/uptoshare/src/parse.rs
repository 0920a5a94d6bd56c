//! Anchored substring search used by the site answer extractors.

/// The text starting at `begin`, up to (excluding) the next `end`.
pub fn find_link<'a>(text: &'a str, begin: &str, end: &str) -> Option<&'a str> {
    let start = text.find(begin)?;
    let len = text[start..].find(end).filter(|len| *len > 0)?;
    Some(&text[start..start + len])
}

/// Like [`find_link`], without the `prefix` itself.
pub fn find_prefix<'a>(text: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    find_link(text, prefix, suffix).map(|found| &found[prefix.len()..]).filter(|found| !found.is_empty())
}
