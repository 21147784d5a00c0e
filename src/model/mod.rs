//! Core object model.
//!
//! Every resolvable entity travels in a [`MediaObject`] envelope keyed by its
//! URI. Relationship lists inside a payload hold child `MediaObject`s: a fresh
//! provider response carries stubs (URI, kind, provider and perhaps a name),
//! which the expansion engine later replaces in place with resolved objects.
//!
//! # On-disk format
//!
//! ```json
//! {
//!   "uri": "catalog:album:42",
//!   "type": "album",
//!   "provider": "catalog",
//!   "expires": "2026-11-15T10:00:00Z",
//!   "lastMod": "2026-11-15T10:00:00Z",
//!   "object": { "name": "...", "discs": [ ... ] },
//!   "expanded": true
//! }
//! ```

mod media;
mod payload;
mod wire;

pub use media::{
    Album, Artwork, Creator, Disc, Format, SearchResults, Stream, Transcript, TranscriptLine,
};
pub use payload::{ErrorPayload, Payload, RefList, RefPath};

use chrono::{DateTime, Utc};

/// Provider recorded on objects the resolver builds itself (search results, errors).
pub const SYNTHETIC_PROVIDER: &str = "mediaweave";

/// Canonical object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Search,
    Creator,
    Album,
    Stream,
    Error,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Search => "search",
            ObjectKind::Creator => "creator",
            ObjectKind::Album => "album",
            ObjectKind::Stream => "stream",
            ObjectKind::Error => "error",
        }
    }

    /// Map the type segment of a `provider:type:id` URI to its synonym class.
    pub fn from_type_segment(segment: &str) -> Option<Self> {
        match segment {
            "artist" | "creator" | "user" | "channel" | "chan" | "streamer" => {
                Some(ObjectKind::Creator)
            }
            "album" => Some(ObjectKind::Album),
            "track" | "song" | "video" | "audio" | "stream" => Some(ObjectKind::Stream),
            _ => None,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search" => Ok(ObjectKind::Search),
            "error" => Ok(ObjectKind::Error),
            other => {
                ObjectKind::from_type_segment(other).ok_or_else(|| format!("unknown object type: {other}"))
            }
        }
    }
}

/// Expansion progress of an object.
///
/// `Failed` behaves like `Unexpanded` for scheduling purposes: the object is
/// eligible for another attempt on a later request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpansionState {
    #[default]
    Unexpanded,
    Expanding,
    Expanded,
    Failed,
}

impl ExpansionState {
    /// Rebuild the state from the persisted flags.
    ///
    /// `Failed` is persisted as both flags cleared, so it reloads as `Unexpanded`.
    pub fn from_flags(expanding: bool, expanded: bool) -> Self {
        match (expanding, expanded) {
            (_, true) => ExpansionState::Expanded,
            (true, false) => ExpansionState::Expanding,
            (false, false) => ExpansionState::Unexpanded,
        }
    }

    /// `(expanding, expanded)` as persisted. Never both true.
    pub fn flags(&self) -> (bool, bool) {
        match self {
            ExpansionState::Expanding => (true, false),
            ExpansionState::Expanded => (false, true),
            ExpansionState::Unexpanded | ExpansionState::Failed => (false, false),
        }
    }

    /// Whether an expansion should be scheduled for an object in this state.
    pub fn needs_expansion(&self) -> bool {
        matches!(self, ExpansionState::Unexpanded | ExpansionState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpansionState::Unexpanded => "unexpanded",
            ExpansionState::Expanding => "expanding",
            ExpansionState::Expanded => "expanded",
            ExpansionState::Failed => "failed",
        }
    }
}

/// The uniform envelope around every payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaObject {
    /// Globally unique cache key. Empty for error objects.
    pub uri: String,
    /// Scheme prefix of the owning provider, or [`SYNTHETIC_PROVIDER`]
    pub provider: String,
    pub expires: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub payload: Payload,
    pub state: ExpansionState,
}

impl MediaObject {
    pub fn new(uri: impl Into<String>, provider: impl Into<String>, payload: Payload) -> Self {
        Self {
            uri: uri.into(),
            provider: provider.into(),
            expires: None,
            last_modified: None,
            payload,
            state: ExpansionState::Unexpanded,
        }
    }

    /// A placeholder reference carrying only identity and a display name.
    pub fn stub(
        kind: ObjectKind,
        provider: impl Into<String>,
        uri: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let payload = match kind {
            ObjectKind::Search => Payload::Search(SearchResults::new(name)),
            ObjectKind::Creator => Payload::Creator(Creator {
                name,
                ..Default::default()
            }),
            ObjectKind::Album => Payload::Album(Album {
                name,
                ..Default::default()
            }),
            ObjectKind::Stream => Payload::Stream(Stream {
                name,
                ..Default::default()
            }),
            ObjectKind::Error => Payload::Error(ErrorPayload {
                message: name,
                kind: String::new(),
            }),
        };
        Self::new(uri, provider, payload)
    }

    /// A typed error object. Never persisted.
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            String::new(),
            SYNTHETIC_PROVIDER,
            Payload::Error(ErrorPayload {
                message: message.into(),
                kind: kind.into(),
            }),
        )
    }

    pub fn kind(&self) -> ObjectKind {
        self.payload.kind()
    }

    pub fn is_error(&self) -> bool {
        self.kind() == ObjectKind::Error
    }

    /// Whether the payload is semantically empty (see [`Payload::is_empty`]).
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Whether `expires` lies before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| now > expires)
    }

    pub fn display_name(&self) -> &str {
        self.payload.name()
    }

    pub fn as_search(&self) -> Option<&SearchResults> {
        match &self.payload {
            Payload::Search(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_creator(&self) -> Option<&Creator> {
        match &self.payload {
            Payload::Creator(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_album(&self) -> Option<&Album> {
        match &self.payload {
            Payload::Album(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_album_mut(&mut self) -> Option<&mut Album> {
        match &mut self.payload {
            Payload::Album(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match &self.payload {
            Payload::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorPayload> {
        match &self.payload {
            Payload::Error(e) => Some(e),
            _ => None,
        }
    }
}
