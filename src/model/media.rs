//! Payload structs carried inside a [`MediaObject`](super::MediaObject).
//!
//! Field names follow the on-disk JSON layout (camelCase). Every struct
//! defaults missing fields so that stubs and partially populated provider
//! responses deserialize cleanly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MediaObject;

/// Merged results of a search across every active provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResults {
    /// The normalized query that produced these results
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub streams: Vec<MediaObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub creators: Vec<MediaObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub albums: Vec<MediaObject>,
}

impl SearchResults {
    /// Create an empty result set for a query.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Empty iff all three result lists are empty.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty() && self.creators.is_empty() && self.albums.is_empty()
    }

    /// Append another provider's results, keeping provider order.
    pub fn extend(&mut self, other: SearchResults) {
        self.creators.extend(other.creators);
        self.albums.extend(other.albums);
        self.streams.extend(other.streams);
    }
}

/// An artist, user, channel or any other entity that publishes streams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Creator {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Biography; provider links are rewritten to uniform URIs
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub albums: Vec<MediaObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub top_streams: Vec<MediaObject>,
    /// Albums this creator appears on
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub appearances: Vec<MediaObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub singles: Vec<MediaObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub playlists: Vec<MediaObject>,
    /// Related creators
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<MediaObject>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artworks: Vec<Artwork>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debut_date: Option<DateTime<Utc>>,
}

impl Creator {
    /// Empty iff every relationship list is empty.
    pub fn is_empty(&self) -> bool {
        self.albums.is_empty()
            && self.top_streams.is_empty()
            && self.appearances.is_empty()
            && self.singles.is_empty()
            && self.playlists.is_empty()
            && self.related.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Album {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub release_date: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discs: Vec<Disc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub copyrights: Vec<String>,
    /// Record label or studio
    #[serde(skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artworks: Vec<Artwork>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub creators: Vec<MediaObject>,
}

impl Album {
    /// Empty unless at least one disc holds at least one stream.
    pub fn is_empty(&self) -> bool {
        self.discs.iter().all(|disc| disc.streams.is_empty())
    }

    /// Total number of streams across every disc.
    pub fn stream_count(&self) -> usize {
        self.discs.iter().map(|disc| disc.streams.len()).sum()
    }
}

/// One disc (or part) of an album.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Disc {
    pub number: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artworks: Vec<Artwork>,
    /// Streams in track order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub streams: Vec<MediaObject>,
}

/// A playable item: a track, a video, an episode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stream {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub track_number: u32,
    pub duration_seconds: u64,
    /// Available formats, best to worst
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub formats: Vec<Format>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub creators: Vec<MediaObject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<Box<MediaObject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,
    pub explicit: bool,
    /// Meant to be watched rather than listened to
    pub visual: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artworks: Vec<Artwork>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub release_date: String,
    /// Provider-specific metadata that has no dedicated field
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_metadata: BTreeMap<String, String>,
}

impl Stream {
    /// Look up a format by its id.
    pub fn format(&self, id: u32) -> Option<&Format> {
        self.formats.iter().find(|f| f.id == id)
    }

    /// Formats to try for a playback request, in order.
    ///
    /// Starts at the format with the requested id and continues with every
    /// format listed after it. An unknown id yields the whole list.
    pub fn format_fallbacks(&self, requested: u32) -> impl Iterator<Item = &Format> {
        let start = self
            .formats
            .iter()
            .position(|f| f.id == requested)
            .unwrap_or(0);
        self.formats.iter().skip(start)
    }

    /// Whether a non-empty transcript is already attached.
    pub fn has_transcript(&self) -> bool {
        self.transcript
            .as_ref()
            .is_some_and(|t| !t.lines.is_empty())
    }

    /// Suggested download file name:
    /// `"<creator> - <album>[ <date>] - <name>.<container>"`.
    ///
    /// Returns `None` when the creator, album or format is not known yet.
    pub fn file_name(&self) -> Option<String> {
        let creator = self.creators.first()?.display_name();
        let album_obj = self.album.as_deref()?;
        let album = album_obj.as_album()?;
        let container = &self.formats.first()?.container_format;

        let mut name = format!("{} - {}", creator, album.name);
        if !album.release_date.is_empty() {
            name.push(' ');
            name.push_str(&album.release_date);
        }
        name.push_str(&format!(" - {}.{}", self.name, container));
        Some(name)
    }
}

/// An encoding of a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Format {
    /// Quality id; lower is better
    pub id: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// e.g. ogg, mp4, flac
    #[serde(skip_serializing_if = "String::is_empty")]
    pub container_format: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub codec: String,
    pub bitrate_bps: u32,
    pub bit_depth: u32,
    pub sample_rate_hz: u32,
    #[serde(rename = "playbackURL", skip_serializing_if = "String::is_empty")]
    pub playback_url: String,
}

impl Format {
    /// Playback URL served by the transport layer for this format of `uri`.
    pub fn playback_url_for(&self, base_url: &str, uri: &str) -> String {
        let sep = if base_url.ends_with('/') { "" } else { "/" };
        format!("{base_url}{sep}v1/stream/{uri}?format={}", self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Artwork {
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// e.g. jpg, mp4
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file_type: String,
}

/// Lyrics, captions or any other timed text for a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transcript {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<TranscriptLine>,
    pub time_synced: bool,
    pub right_to_left: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub provider_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptLine {
    pub start_time_ms: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
}
