//! URI to cache-file mapping.
//!
//! The colon-separated segments of a URI become nested directories and the
//! last segment names the file: `providerX:album:42` maps to
//! `<root>/providerX/album/42.json`.
//!
//! Segments are percent-encoded so that a URI can never escape the cache root
//! and two distinct URIs never share a file.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Extension of every cache entry.
pub const ENTRY_EXTENSION: &str = "json";

fn encode_segment(segment: &str) -> Cow<'_, str> {
    // `urlencoding` leaves '.' alone and always escapes '%', so a bare "%" or
    // "%2E" can only come from these special cases.
    match segment {
        "" => Cow::Borrowed("%"),
        "." => Cow::Borrowed("%2E"),
        ".." => Cow::Borrowed("%2E%2E"),
        other => urlencoding::encode(other),
    }
}

/// Path of the cache entry for `uri` under `root`, or `None` for an empty URI.
pub fn entry_path(root: &Path, uri: &str) -> Option<PathBuf> {
    if uri.is_empty() {
        return None;
    }
    let segments: Vec<&str> = uri.split(':').collect();
    let (file, dirs) = segments.split_last()?;

    let mut path = root.to_path_buf();
    for dir in dirs {
        path.push(encode_segment(dir).as_ref());
    }
    path.push(format!("{}.{}", encode_segment(file), ENTRY_EXTENSION));
    Some(path)
}
