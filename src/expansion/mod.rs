//! Recursive expansion engine.
//!
//! Expansion replaces every stub reference inside an object with the resolved
//! object for the same URI, persisting the parent after each child so that an
//! interrupted walk leaves a partially expanded but well-formed entry behind.
//!
//! State transitions happen under a per-URI lock:
//!
//! ```text
//! Unexpanded | Failed --lock--> Expanding --all children resolved--> Expanded
//!                                   \------any child failed-------> Failed
//! ```
//!
//! A second caller for the same URI waits for the lock and then sees the
//! first caller's persisted result. Recursion into children is bounded by a
//! visited set and a maximum depth, and never waits on a child's lock.

mod locks;

pub use locks::{KeyGuard, KeyedLocks};

use std::collections::HashSet;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::model::{ExpansionState, MediaObject};
use crate::resolver::{ResolveError, Resolver};

/// Result of one [`Expander::expand`] call.
#[derive(Debug, Clone)]
pub struct ExpansionReport {
    /// The object in its final state
    pub object: MediaObject,
    /// References resolved during this call, at every depth
    pub resolved: usize,
    /// Direct references of `object` that could not be resolved
    pub failed: Vec<String>,
}

impl ExpansionReport {
    fn unchanged(object: MediaObject) -> Self {
        Self {
            object,
            resolved: 0,
            failed: Vec::new(),
        }
    }

    /// The expanded object, or [`ResolveError::ExpansionFailure`].
    pub fn into_result(self) -> Result<MediaObject, ResolveError> {
        if self.failed.is_empty() {
            Ok(self.object)
        } else {
            Err(ResolveError::ExpansionFailure {
                uri: self.object.uri,
                failed: self.failed,
            })
        }
    }
}

#[derive(Default)]
struct WalkStats {
    resolved: usize,
    failed: Vec<String>,
}

/// Expands objects through a [`Resolver`].
#[derive(Debug)]
pub struct Expander {
    resolver: Arc<Resolver>,
    locks: KeyedLocks,
    max_depth: usize,
}

impl Expander {
    /// `max_depth` counts the object itself: 1 resolves its direct
    /// references only, 2 also expands each of those, and so on.
    pub fn new(resolver: Arc<Resolver>, max_depth: usize) -> Self {
        Self {
            resolver,
            locks: KeyedLocks::new(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn locks(&self) -> &KeyedLocks {
        &self.locks
    }

    /// Expand `obj` and persist the result.
    ///
    /// Objects that are already expanded are returned as they are, without
    /// touching the cache or any handler.
    pub async fn expand(&self, obj: MediaObject) -> ExpansionReport {
        if obj.uri.is_empty() || obj.is_error() || obj.state == ExpansionState::Expanded {
            return ExpansionReport::unchanged(obj);
        }

        let _guard = self.locks.lock(&obj.uri).await;

        // Whoever held the lock before us may have finished the job
        let mut current = match self.resolver.cache().get_async(&obj.uri).await {
            Some(cached) if cached.state == ExpansionState::Expanded => {
                debug!(uri = %obj.uri, "Already expanded by another task");
                return ExpansionReport::unchanged(cached);
            }
            Some(cached) => cached,
            None => obj,
        };

        let mut visited = HashSet::from([current.uri.clone()]);
        let stats = self.walk(&mut current, 0, &mut visited).await;

        if stats.failed.is_empty() {
            info!(uri = %current.uri, resolved = stats.resolved, "Expanded");
        } else {
            warn!(
                uri = %current.uri,
                failed = stats.failed.len(),
                "Expansion incomplete, will retry on a later request"
            );
        }

        ExpansionReport {
            object: current,
            resolved: stats.resolved,
            failed: stats.failed,
        }
    }

    /// Walk one object. The caller holds the object's lock.
    fn walk<'a>(
        &'a self,
        obj: &'a mut MediaObject,
        depth: usize,
        visited: &'a mut HashSet<String>,
    ) -> BoxFuture<'a, WalkStats> {
        async move {
            let mut stats = WalkStats::default();
            obj.state = ExpansionState::Expanding;
            self.resolver.persist(obj).await;
            debug!(uri = %obj.uri, depth, "Expanding");

            for (path, uri) in obj.payload.references() {
                let mut child = match self.resolver.resolve(&uri).await {
                    Ok(child) => child,
                    Err(e) => {
                        warn!(parent = %obj.uri, uri = %uri, error = %e, "Failed to resolve reference");
                        stats.failed.push(uri);
                        continue;
                    }
                };
                stats.resolved += 1;

                let first_visit = visited.insert(child.uri.clone());
                if first_visit && depth + 1 < self.max_depth && child.state != ExpansionState::Expanded {
                    // Never wait here: the holder may be waiting on us
                    if let Some(_child_guard) = self.locks.try_lock(&child.uri) {
                        let nested = self.walk(&mut child, depth + 1, visited).await;
                        stats.resolved += nested.resolved;
                    } else {
                        debug!(uri = %child.uri, "Reference is being expanded elsewhere");
                    }
                }

                match obj.payload.reference_mut(path) {
                    Some(slot) => *slot = child,
                    None => warn!(parent = %obj.uri, uri = %uri, "Reference slot vanished"),
                }
                self.resolver.persist(obj).await;
            }

            obj.state = if stats.failed.is_empty() {
                ExpansionState::Expanded
            } else {
                ExpansionState::Failed
            };
            self.resolver.persist(obj).await;
            debug!(uri = %obj.uri, state = obj.state.as_str(), "Walk finished");
            stats
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Album, Creator, ObjectKind, Payload};
    use crate::test_utils::{
        MockHandler, album_payload, album_with_streams, registry_of, stream_payload, temp_cache,
    };
    use std::time::Duration;

    fn setup(handler: MockHandler, max_depth: usize) -> (Expander, Arc<MockHandler>, tempfile::TempDir) {
        let handler = Arc::new(handler);
        let (cache, dir) = temp_cache();
        let resolver = Resolver::new(registry_of(vec![handler.clone()]), cache, "http://media.test/");
        (Expander::new(Arc::new(resolver), max_depth), handler, dir)
    }

    fn stream_names(obj: &MediaObject) -> Vec<String> {
        obj.as_album().unwrap().discs[0]
            .streams
            .iter()
            .map(|s| s.display_name().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_expand_replaces_stubs_in_place() {
        let mut streams = MockHandler::new("p");
        for id in ["1", "2"] {
            streams = streams.with_stream(id, stream_payload("p", &format!("Full {id}"), None));
        }
        let (expander, handler, _dir) = setup(streams, 2);

        let report = expander.expand(album_with_streams("p", "a", &["1", "2"])).await;
        assert!(report.failed.is_empty());
        assert_eq!(report.resolved, 2);
        assert_eq!(report.object.state, ExpansionState::Expanded);
        assert_eq!(stream_names(&report.object), vec!["Full 1", "Full 2"]);
        assert_eq!(handler.fetched(), vec!["stream:1", "stream:2"]);

        let cached = expander.resolver().cache().get("p:album:a").unwrap();
        assert_eq!(cached, report.object);
    }

    #[tokio::test]
    async fn test_expanding_twice_is_a_no_op() {
        let (expander, handler, _dir) = setup(MockHandler::new("p").with_streams(&["1", "2"]), 2);

        let first = expander.expand(album_with_streams("p", "a", &["1", "2"])).await;
        let path = expander.resolver().cache().path_for("p:album:a").unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let fetches = handler.fetch_count();

        let second = expander.expand(first.object.clone()).await;
        assert_eq!(second.resolved, 0);
        assert_eq!(second.object, first.object);
        assert_eq!(handler.fetch_count(), fetches);
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_parent_is_persisted_after_each_child() {
        let delay = Duration::from_millis(200);
        let mut streams = MockHandler::new("p").with_delay(delay);
        for id in ["1", "2"] {
            streams = streams.with_stream(id, stream_payload("p", &format!("Full {id}"), None));
        }
        let (expander, _, _dir) = setup(streams, 2);

        // Read the entry while the second child is still being fetched
        let mid_walk = async {
            tokio::time::sleep(delay + delay / 2).await;
            expander.resolver().cache().get_async("p:album:a").await
        };
        let (report, partial) =
            tokio::join!(expander.expand(album_with_streams("p", "a", &["1", "2"])), mid_walk);

        let partial = partial.unwrap();
        assert_eq!(partial.state, ExpansionState::Expanding);
        assert_eq!(stream_names(&partial), vec!["Full 1", "Track 2"]);
        let durations: Vec<u64> = partial.as_album().unwrap().discs[0]
            .streams
            .iter()
            .map(|s| s.as_stream().unwrap().duration_seconds)
            .collect();
        assert_eq!(durations, vec![180, 0]);

        assert_eq!(report.object.state, ExpansionState::Expanded);
        assert_eq!(stream_names(&report.object), vec!["Full 1", "Full 2"]);
    }

    #[tokio::test]
    async fn test_concurrent_expansions_walk_once() {
        let handler = MockHandler::new("p")
            .with_streams(&["1", "2", "3"])
            .with_delay(Duration::from_millis(10));
        let (expander, handler, _dir) = setup(handler, 2);
        let album = album_with_streams("p", "a", &["1", "2", "3"]);

        let (a, b) = tokio::join!(expander.expand(album.clone()), expander.expand(album));

        assert_eq!(handler.fetch_count(), 3);
        assert_eq!(a.resolved + b.resolved, 3);
        assert_eq!(a.object, b.object);
        assert_eq!(a.object.state, ExpansionState::Expanded);

        let cached = expander.resolver().cache().get("p:album:a").unwrap();
        assert_eq!(cached.state, ExpansionState::Expanded);
        assert!(expander.locks().is_empty());
    }

    #[tokio::test]
    async fn test_failed_child_keeps_partial_progress() {
        let handler = MockHandler::new("p").with_streams(&["ok1", "ok2"]).failing("bad");
        let (expander, _, _dir) = setup(handler, 2);

        let report = expander.expand(album_with_streams("p", "a", &["ok1", "bad", "ok2"])).await;
        assert_eq!(report.failed, vec!["p:stream:bad"]);
        assert_eq!(report.object.state, ExpansionState::Failed);
        assert_eq!(stream_names(&report.object), vec!["Track ok1", "Track bad", "Track ok2"]);

        // Failed persists as retry-eligible
        let cached = expander.resolver().cache().get("p:album:a").unwrap();
        assert_eq!(cached.state, ExpansionState::Unexpanded);
        assert!(cached.state.needs_expansion());

        let err = report.into_result().unwrap_err();
        assert_eq!(err.kind(), "expansion_failure");
    }

    #[tokio::test]
    async fn test_cycles_terminate() {
        // album a -> stream s -> (album a, creator c) -> (stream s, album a)
        let mut stream = stream_payload("p", "Loop", Some("a"));
        stream.creators = vec![MediaObject::stub(ObjectKind::Creator, "p", "p:creator:c", "C")];
        let creator = Creator {
            name: "C".to_string(),
            top_streams: vec![MediaObject::stub(ObjectKind::Stream, "p", "p:stream:s", "Loop")],
            albums: vec![MediaObject::stub(ObjectKind::Album, "p", "p:album:a", "A")],
            ..Default::default()
        };
        let handler = MockHandler::new("p")
            .with_album("a", album_payload("p", &["s"]))
            .with_stream("s", stream)
            .with_creator("c", creator);
        let (expander, _, _dir) = setup(handler, 16);

        let album = expander.resolver().resolve("p:album:a").await.unwrap();
        let report = expander.expand(album).await;

        assert!(report.failed.is_empty());
        assert_eq!(report.object.state, ExpansionState::Expanded);
        let stream = &report.object.as_album().unwrap().discs[0].streams[0];
        assert_eq!(stream.state, ExpansionState::Expanded);
        assert_eq!(stream.as_stream().unwrap().creators[0].display_name(), "C");
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let handler = MockHandler::new("p")
            .with_album("a", album_payload("p", &["s"]))
            .with_stream("s", stream_payload("p", "S", Some("a")));
        let (expander, handler, _dir) = setup(handler, 1);

        let album = expander.resolver().resolve("p:album:a").await.unwrap();
        let report = expander.expand(album).await;

        let stream = &report.object.as_album().unwrap().discs[0].streams[0];
        assert_eq!(stream.display_name(), "S");
        assert_eq!(stream.state, ExpansionState::Unexpanded);
        assert_eq!(handler.fetched(), vec!["album:a", "stream:s"]);
    }

    #[tokio::test]
    async fn test_locked_child_is_embedded_without_expanding() {
        let handler = MockHandler::new("p")
            .with_album("a", album_payload("p", &["s"]))
            .with_stream("s", stream_payload("p", "S", Some("a")));
        let (expander, _, _dir) = setup(handler, 2);

        let _held = expander.locks().lock("p:stream:s").await;
        let album = expander.resolver().resolve("p:album:a").await.unwrap();
        let report = expander.expand(album).await;

        assert_eq!(report.object.state, ExpansionState::Expanded);
        let stream = &report.object.as_album().unwrap().discs[0].streams[0];
        assert_eq!(stream.display_name(), "S");
        assert_eq!(stream.state, ExpansionState::Unexpanded);
    }

    #[tokio::test]
    async fn test_stale_expanding_flag_is_recovered() {
        let (expander, _, _dir) = setup(MockHandler::new("p").with_streams(&["1"]), 2);

        let mut album = album_with_streams("p", "a", &["1"]);
        album.state = ExpansionState::Expanding;
        expander.resolver().cache().put(&mut album).unwrap();

        let cached = expander.resolver().cache().get("p:album:a").unwrap();
        assert_eq!(cached.state, ExpansionState::Expanding);

        let report = expander.expand(cached).await;
        assert_eq!(report.object.state, ExpansionState::Expanded);
    }

    #[tokio::test]
    async fn test_error_and_empty_uri_objects_are_left_alone() {
        let (expander, handler, _dir) = setup(MockHandler::new("p"), 2);

        let report = expander.expand(MediaObject::error("not_found", "x")).await;
        assert!(report.object.is_error());

        let anonymous = MediaObject::new("", "p", Payload::Album(Album::default()));
        let report = expander.expand(anonymous).await;
        assert_eq!(report.object.state, ExpansionState::Unexpanded);
        assert_eq!(handler.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_expands_album_then_creators() {
        let mut stream = stream_payload("p", "S", Some("a"));
        stream.creators = vec![MediaObject::stub(ObjectKind::Creator, "p", "p:creator:c", "")];
        let handler = MockHandler::new("p")
            .with_stream("s", stream)
            .with_album("a", album_payload("p", &["s"]))
            .with_creator("c", Creator {
                name: "C".to_string(),
                ..Default::default()
            });
        let (expander, handler, _dir) = setup(handler, 1);

        let obj = expander.resolver().resolve("p:stream:s").await.unwrap();
        expander.expand(obj).await;
        assert_eq!(handler.fetched(), vec!["stream:s", "album:a", "creator:c"]);
    }
}
