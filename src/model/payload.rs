//! The tagged payload union and its reference traversal.
//!
//! The variant is chosen once, from the `type` discriminant, when an object is
//! decoded. Everything afterwards works on typed structs.

use serde::{Deserialize, Serialize};

use super::media::{Album, Creator, SearchResults, Stream};
use super::{MediaObject, ObjectKind};

/// Payload of an error object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorPayload {
    #[serde(rename = "error")]
    pub message: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// Typed content of a [`MediaObject`].
///
/// Serializes as the bare inner struct; the discriminant travels in the
/// envelope's `type` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Search(SearchResults),
    Creator(Creator),
    Album(Album),
    Stream(Stream),
    Error(ErrorPayload),
}

/// A relationship list inside a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefList {
    SearchStreams,
    SearchCreators,
    SearchAlbums,
    TopStreams,
    Albums,
    Appearances,
    Singles,
    Related,
    AlbumCreators,
    /// Streams of the disc at this index
    DiscStreams(usize),
    StreamAlbum,
    StreamCreators,
}

/// Location of one child reference inside a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RefPath {
    pub list: RefList,
    pub index: usize,
}

impl RefPath {
    fn new(list: RefList, index: usize) -> Self {
        Self { list, index }
    }
}

impl Payload {
    /// Decode the payload for a given discriminant.
    ///
    /// A missing (`null`) body decodes to the variant's default value.
    pub fn from_value(kind: ObjectKind, value: serde_json::Value) -> serde_json::Result<Self> {
        if value.is_null() {
            return Ok(Self::empty(kind));
        }
        Ok(match kind {
            ObjectKind::Search => Payload::Search(serde_json::from_value(value)?),
            ObjectKind::Creator => Payload::Creator(serde_json::from_value(value)?),
            ObjectKind::Album => Payload::Album(serde_json::from_value(value)?),
            ObjectKind::Stream => Payload::Stream(serde_json::from_value(value)?),
            ObjectKind::Error => Payload::Error(serde_json::from_value(value)?),
        })
    }

    /// Default payload for a kind.
    pub fn empty(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Search => Payload::Search(SearchResults::default()),
            ObjectKind::Creator => Payload::Creator(Creator::default()),
            ObjectKind::Album => Payload::Album(Album::default()),
            ObjectKind::Stream => Payload::Stream(Stream::default()),
            ObjectKind::Error => Payload::Error(ErrorPayload::default()),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Payload::Search(_) => ObjectKind::Search,
            Payload::Creator(_) => ObjectKind::Creator,
            Payload::Album(_) => ObjectKind::Album,
            Payload::Stream(_) => ObjectKind::Stream,
            Payload::Error(_) => ObjectKind::Error,
        }
    }

    /// Whether the payload carries nothing worth caching.
    ///
    /// Streams are never empty; error payloads always are.
    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Search(s) => s.is_empty(),
            Payload::Creator(c) => c.is_empty(),
            Payload::Album(a) => a.is_empty(),
            Payload::Stream(_) => false,
            Payload::Error(_) => true,
        }
    }

    /// Display name, if the payload has one.
    pub fn name(&self) -> &str {
        match self {
            Payload::Search(s) => &s.query,
            Payload::Creator(c) => &c.name,
            Payload::Album(a) => &a.name,
            Payload::Stream(s) => &s.name,
            Payload::Error(e) => &e.message,
        }
    }

    /// Every child reference with a non-empty URI, in expansion order.
    ///
    /// - search: streams, creators, albums
    /// - creator: top streams, albums, appearances, singles, related
    /// - album: creators, then each disc's streams in disc and track order
    /// - stream: album, then creators
    pub fn references(&self) -> Vec<(RefPath, String)> {
        let mut refs = Vec::new();
        let mut push_list = |list: RefList, objects: &[MediaObject]| {
            for (index, obj) in objects.iter().enumerate() {
                if !obj.uri.is_empty() {
                    refs.push((RefPath::new(list, index), obj.uri.clone()));
                }
            }
        };

        match self {
            Payload::Search(s) => {
                push_list(RefList::SearchStreams, &s.streams);
                push_list(RefList::SearchCreators, &s.creators);
                push_list(RefList::SearchAlbums, &s.albums);
            }
            Payload::Creator(c) => {
                push_list(RefList::TopStreams, &c.top_streams);
                push_list(RefList::Albums, &c.albums);
                push_list(RefList::Appearances, &c.appearances);
                push_list(RefList::Singles, &c.singles);
                push_list(RefList::Related, &c.related);
            }
            Payload::Album(a) => {
                push_list(RefList::AlbumCreators, &a.creators);
                for (disc, d) in a.discs.iter().enumerate() {
                    push_list(RefList::DiscStreams(disc), &d.streams);
                }
            }
            Payload::Stream(s) => {
                if let Some(album) = &s.album {
                    push_list(RefList::StreamAlbum, std::slice::from_ref(album.as_ref()));
                }
                push_list(RefList::StreamCreators, &s.creators);
            }
            Payload::Error(_) => {}
        }
        refs
    }

    /// Borrow the child at `path`.
    pub fn reference(&self, path: RefPath) -> Option<&MediaObject> {
        let list: &[MediaObject] = match (self, path.list) {
            (Payload::Search(s), RefList::SearchStreams) => &s.streams,
            (Payload::Search(s), RefList::SearchCreators) => &s.creators,
            (Payload::Search(s), RefList::SearchAlbums) => &s.albums,
            (Payload::Creator(c), RefList::TopStreams) => &c.top_streams,
            (Payload::Creator(c), RefList::Albums) => &c.albums,
            (Payload::Creator(c), RefList::Appearances) => &c.appearances,
            (Payload::Creator(c), RefList::Singles) => &c.singles,
            (Payload::Creator(c), RefList::Related) => &c.related,
            (Payload::Album(a), RefList::AlbumCreators) => &a.creators,
            (Payload::Album(a), RefList::DiscStreams(disc)) => &a.discs.get(disc)?.streams,
            (Payload::Stream(s), RefList::StreamAlbum) => {
                return s.album.as_deref().filter(|_| path.index == 0);
            }
            (Payload::Stream(s), RefList::StreamCreators) => &s.creators,
            _ => return None,
        };
        list.get(path.index)
    }

    /// Mutably borrow the child at `path`, for in-place replacement.
    pub fn reference_mut(&mut self, path: RefPath) -> Option<&mut MediaObject> {
        let list: &mut Vec<MediaObject> = match (self, path.list) {
            (Payload::Search(s), RefList::SearchStreams) => &mut s.streams,
            (Payload::Search(s), RefList::SearchCreators) => &mut s.creators,
            (Payload::Search(s), RefList::SearchAlbums) => &mut s.albums,
            (Payload::Creator(c), RefList::TopStreams) => &mut c.top_streams,
            (Payload::Creator(c), RefList::Albums) => &mut c.albums,
            (Payload::Creator(c), RefList::Appearances) => &mut c.appearances,
            (Payload::Creator(c), RefList::Singles) => &mut c.singles,
            (Payload::Creator(c), RefList::Related) => &mut c.related,
            (Payload::Album(a), RefList::AlbumCreators) => &mut a.creators,
            (Payload::Album(a), RefList::DiscStreams(disc)) => &mut a.discs.get_mut(disc)?.streams,
            (Payload::Stream(s), RefList::StreamAlbum) => {
                if path.index != 0 {
                    return None;
                }
                return s.album.as_deref_mut();
            }
            (Payload::Stream(s), RefList::StreamCreators) => &mut s.creators,
            _ => return None,
        };
        list.get_mut(path.index)
    }
}
