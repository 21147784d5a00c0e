//! Catalog document types
//!
//! These types match the JSON documents stored in a catalog directory.
//! DO NOT use these types outside the catalog module - convert to domain types.
//!
//! ```text
//! <root>/creator/<id>.json   CreatorDoc
//! <root>/album/<id>.json     AlbumDoc
//! <root>/stream/<id>.json    TrackDoc
//! <root>/transcript/<id>.lrc lyrics, optionally timed
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference to another document in the same catalog
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RefDoc {
    pub id: String,
    /// Display name copied into the stub
    pub name: String,
}

/// Artwork entry
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtworkDoc {
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// File type such as "jpg" or "png"
    #[serde(rename = "type")]
    pub file_type: String,
}

/// Creator document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CreatorDoc {
    pub name: String,
    /// Free text; may contain `{{kind:id|text}}` links
    pub description: String,
    pub genres: Vec<String>,
    pub albums: Vec<RefDoc>,
    pub top_tracks: Vec<RefDoc>,
    pub appearances: Vec<RefDoc>,
    pub singles: Vec<RefDoc>,
    /// Playlists are album documents
    pub playlists: Vec<RefDoc>,
    pub related: Vec<RefDoc>,
    pub artworks: Vec<ArtworkDoc>,
    /// `YYYY-MM-DD` or RFC 3339
    pub debut: Option<String>,
}

/// Album document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AlbumDoc {
    pub name: String,
    pub description: String,
    pub released: String,
    pub label: String,
    pub copyrights: Vec<String>,
    pub artworks: Vec<ArtworkDoc>,
    pub artists: Vec<RefDoc>,
    pub discs: Vec<DiscDoc>,
}

/// Disc inside an album document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscDoc {
    pub number: u32,
    pub name: String,
    pub tracks: Vec<RefDoc>,
}

/// Track document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackDoc {
    pub name: String,
    pub number: u32,
    pub duration_secs: u64,
    pub album: Option<RefDoc>,
    pub artists: Vec<RefDoc>,
    pub explicit: bool,
    /// Video rather than audio
    pub visual: bool,
    pub language: String,
    pub released: String,
    pub artworks: Vec<ArtworkDoc>,
    /// Format ids this track is available in; all catalog formats when absent
    pub formats: Option<Vec<u32>>,
    pub extra: BTreeMap<String, String>,
}
