//! Test utilities and fixtures for mediaweave tests.
//!
//! This module provides object fixtures, a scriptable [`MockHandler`] and an
//! on-disk catalog fixture to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use mediaweave::test_utils::{MockHandler, album_payload, registry_of};
//!
//! let handler = MockHandler::new("p").with_album("1", album_payload("p", &["10", "11"]));
//! let registry = registry_of(vec![Arc::new(handler)]);
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use crate::cache::{ObjectCache, TtlPolicy};
use crate::handler::{Handler, HandlerError, HandlerRegistry};
use crate::model::{
    Album, Creator, Disc, Format, MediaObject, ObjectKind, Payload, SearchResults, Stream,
    Transcript, TranscriptLine,
};

/// A stream object with a name and nothing else.
pub fn stream_stub(provider: &str, id: &str, name: &str) -> MediaObject {
    MediaObject::stub(ObjectKind::Stream, provider, format!("{provider}:stream:{id}"), name)
}

/// Album payload with one disc holding stream stubs for `stream_ids`.
pub fn album_payload(provider: &str, stream_ids: &[&str]) -> Album {
    Album {
        name: "Test Album".to_string(),
        discs: vec![Disc {
            number: 1,
            streams: stream_ids
                .iter()
                .map(|id| stream_stub(provider, id, &format!("Track {id}")))
                .collect(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Album object `provider:album:id` with one disc of stream stubs.
pub fn album_with_streams(provider: &str, id: &str, stream_ids: &[&str]) -> MediaObject {
    MediaObject::new(
        format!("{provider}:album:{id}"),
        provider,
        Payload::Album(album_payload(provider, stream_ids)),
    )
}

/// Stream payload that links back to an album.
pub fn stream_payload(provider: &str, name: &str, album_id: Option<&str>) -> Stream {
    Stream {
        name: name.to_string(),
        track_number: 1,
        duration_seconds: 180,
        album: album_id.map(|id| {
            Box::new(MediaObject::stub(
                ObjectKind::Album,
                provider,
                format!("{provider}:album:{id}"),
                "",
            ))
        }),
        ..Default::default()
    }
}

/// Creator payload whose top streams are stubs for `stream_ids`.
pub fn creator_payload(provider: &str, name: &str, stream_ids: &[&str]) -> Creator {
    Creator {
        name: name.to_string(),
        top_streams: stream_ids
            .iter()
            .map(|id| stream_stub(provider, id, &format!("Track {id}")))
            .collect(),
        ..Default::default()
    }
}

/// Empty cache in a fresh temporary directory.
///
/// Keep the `TempDir` alive for the duration of your test.
pub fn temp_cache() -> (Arc<ObjectCache>, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let cache = ObjectCache::new(dir.path().join("cache"), TtlPolicy::default());
    (Arc::new(cache), dir)
}

/// Registry holding the given mocks, in order.
pub fn registry_of(handlers: Vec<Arc<MockHandler>>) -> Arc<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    for handler in handlers {
        registry.register(handler);
    }
    Arc::new(registry)
}

/// Scriptable in-memory handler.
///
/// Unknown ids are `NotFound`; ids marked with [`failing`](Self::failing)
/// return a network error. Every fetch is counted.
#[derive(Default)]
pub struct MockHandler {
    provider: String,
    creators: HashMap<String, Creator>,
    albums: HashMap<String, Album>,
    streams: HashMap<String, Stream>,
    transcripts: HashMap<String, Transcript>,
    search: Option<SearchResults>,
    search_error: Option<HandlerError>,
    failing: HashSet<String>,
    formats: Vec<Format>,
    delay: Option<Duration>,
    fetches: AtomicUsize,
    transcribes: AtomicUsize,
    fetched: Mutex<Vec<String>>,
}

impl MockHandler {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    pub fn with_creator(mut self, id: &str, creator: Creator) -> Self {
        self.creators.insert(id.to_string(), creator);
        self
    }

    pub fn with_album(mut self, id: &str, album: Album) -> Self {
        self.albums.insert(id.to_string(), album);
        self
    }

    pub fn with_stream(mut self, id: &str, stream: Stream) -> Self {
        self.streams.insert(id.to_string(), stream);
        self
    }

    /// Streams named `Track <id>` for each id.
    pub fn with_streams(mut self, ids: &[&str]) -> Self {
        for id in ids {
            self.streams
                .insert(id.to_string(), stream_payload(&self.provider, &format!("Track {id}"), None));
        }
        self
    }

    pub fn with_transcript(mut self, id: &str, lines: &[&str]) -> Self {
        let transcript = Transcript {
            lines: lines
                .iter()
                .map(|text| TranscriptLine {
                    start_time_ms: 0,
                    text: text.to_string(),
                })
                .collect(),
            provider_id: id.to_string(),
            ..Default::default()
        };
        self.transcripts.insert(id.to_string(), transcript);
        self
    }

    /// Results returned for every query.
    pub fn with_search(mut self, results: SearchResults) -> Self {
        self.search = Some(results);
        self
    }

    pub fn with_search_error(mut self, error: HandlerError) -> Self {
        self.search_error = Some(error);
        self
    }

    pub fn with_formats(mut self, formats: Vec<Format>) -> Self {
        self.formats = formats;
        self
    }

    /// Sleep before answering each fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fetching `id` (of any kind) fails with a network error.
    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }

    /// Number of creator/album/stream fetches so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn transcribe_count(&self) -> usize {
        self.transcribes.load(Ordering::SeqCst)
    }

    /// `kind:id` of every fetch, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }

    async fn fetch<T: Clone>(
        &self,
        kind: &'static str,
        id: &str,
        table: &HashMap<String, T>,
    ) -> Result<T, HandlerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetched.lock().push(format!("{kind}:{id}"));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(id) {
            return Err(HandlerError::Network(format!("{kind} {id} unavailable")));
        }
        table
            .get(id)
            .cloned()
            .ok_or_else(|| HandlerError::not_found(kind, id))
    }
}

#[async_trait]
impl Handler for MockHandler {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn creator(&self, id: &str) -> Result<Creator, HandlerError> {
        self.fetch("creator", id, &self.creators).await
    }

    async fn album(&self, id: &str) -> Result<Album, HandlerError> {
        self.fetch("album", id, &self.albums).await
    }

    async fn stream(&self, id: &str) -> Result<Stream, HandlerError> {
        self.fetch("stream", id, &self.streams).await
    }

    async fn search(&self, query: &str) -> Result<SearchResults, HandlerError> {
        if let Some(error) = &self.search_error {
            return Err(error.clone());
        }
        let mut results = self.search.clone().unwrap_or_default();
        results.query = query.to_string();
        Ok(results)
    }

    async fn transcribe(&self, id: &str, stream: &mut Stream) -> Result<(), HandlerError> {
        self.transcribes.fetch_add(1, Ordering::SeqCst);
        let transcript = self
            .transcripts
            .get(id)
            .cloned()
            .ok_or_else(|| HandlerError::not_found("transcript", id))?;
        stream.transcript = Some(transcript);
        Ok(())
    }

    fn format_list(&self) -> Vec<Format> {
        self.formats.clone()
    }

    fn replace_uri(&self, text: &str) -> String {
        text.replace("<link>", &format!("{}:", self.provider))
    }
}

/// Write a small catalog to `root`:
/// creator `band`, album `debut` with streams `opener` and `closer`, and
/// lyrics for `opener`.
pub fn write_catalog(root: &Path) {
    let files = [
        (
            "creator/band.json",
            r#"{
                "name": "The Band",
                "description": "Known for {{album:debut|Debut}}",
                "albums": [{"id": "debut", "name": "Debut"}],
                "top_tracks": [{"id": "opener", "name": "Opener"}],
                "debut": "1999-01-01"
            }"#,
        ),
        (
            "album/debut.json",
            r#"{
                "name": "Debut",
                "released": "1999",
                "label": "Indie",
                "artists": [{"id": "band", "name": "The Band"}],
                "discs": [{"number": 1, "tracks": [
                    {"id": "opener", "name": "Opener"},
                    {"id": "closer", "name": "Closer"}
                ]}]
            }"#,
        ),
        (
            "stream/opener.json",
            r#"{
                "name": "Opener",
                "number": 1,
                "duration_secs": 200,
                "album": {"id": "debut", "name": "Debut"},
                "artists": [{"id": "band", "name": "The Band"}],
                "formats": [1, 2]
            }"#,
        ),
        (
            "stream/closer.json",
            r#"{
                "name": "Closer",
                "number": 2,
                "duration_secs": 310,
                "album": {"id": "debut", "name": "Debut"},
                "artists": [{"id": "band", "name": "The Band"}]
            }"#,
        ),
        ("transcript/opener.lrc", "[00:01.00]Hello\n[00:05.00]Goodbye\n"),
    ];

    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).expect("Failed to create catalog directory");
        }
        std::fs::write(&path, contents).expect("Failed to write catalog fixture");
    }
}
