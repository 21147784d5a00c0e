//! Boundary facade.
//!
//! Wires the cache, handler registry, resolver and expansion engine together
//! and exposes the operations a transport layer calls. Failures surface as
//! `type=error` objects rather than `Err` values.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{ObjectCache, TtlPolicy};
use crate::config::Config;
use crate::error::{Error, Result, ResultExt};
use crate::expansion::{ExpansionReport, Expander};
use crate::handler::HandlerRegistry;
use crate::model::{ExpansionState, Format, MediaObject, ObjectKind, SearchResults};
use crate::resolver::{ResolveError, Resolver};
use crate::uri::normalize_query;

/// How [`MediaService::trigger_expansion`] handled an object.
#[derive(Debug)]
pub enum Dispatch {
    /// Nothing to do: already expanded, an error object, or no URI
    Skipped(MediaObject),
    /// Expanded before returning
    Inline(ExpansionReport),
    /// Expanding on a background task; `object` is the input as it was
    Background {
        object: MediaObject,
        task: JoinHandle<ExpansionReport>,
    },
}

impl Dispatch {
    /// The object to hand back to the caller right now.
    pub fn object(&self) -> &MediaObject {
        match self {
            Dispatch::Skipped(object) | Dispatch::Background { object, .. } => object,
            Dispatch::Inline(report) => &report.object,
        }
    }

    /// Wait for a background expansion, if any, and return the final object.
    pub async fn finish(self) -> MediaObject {
        match self {
            Dispatch::Skipped(object) => object,
            Dispatch::Inline(report) => report.object,
            Dispatch::Background { object, task } => match task.await {
                Ok(report) => report.object,
                Err(e) => {
                    tracing::error!(uri = %object.uri, error = %e, "Background expansion panicked");
                    object
                }
            },
        }
    }
}

/// The metadata service.
#[derive(Debug, Clone)]
pub struct MediaService {
    resolver: Arc<Resolver>,
    expander: Arc<Expander>,
}

impl MediaService {
    pub fn new(
        registry: HandlerRegistry,
        cache: ObjectCache,
        base_url: impl Into<String>,
        max_depth: usize,
    ) -> Self {
        let resolver = Arc::new(Resolver::new(Arc::new(registry), Arc::new(cache), base_url));
        let expander = Arc::new(Expander::new(resolver.clone(), max_depth));
        Self { resolver, expander }
    }

    /// Build the service from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().map_err(Error::from)?;
        std::fs::create_dir_all(&config.cache.dir)
            .with_context(format!("creating cache directory {}", config.cache.dir.display()))?;

        let cache = ObjectCache::new(&config.cache.dir, TtlPolicy::from_config(&config.cache));
        let registry = HandlerRegistry::from_config(&config.providers);
        Ok(Self::new(
            registry,
            cache,
            &config.service.base_url,
            config.expansion.max_depth,
        ))
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    pub fn cache(&self) -> &Arc<ObjectCache> {
        self.resolver.cache()
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        self.resolver.registry()
    }

    /// Cached copy of `uri`, if any.
    pub async fn resolve_cached(&self, uri: &str) -> Option<MediaObject> {
        self.resolver.resolve_cached(uri).await
    }

    /// Drop the cached copy of `uri`.
    pub fn evict(&self, uri: &str) -> std::result::Result<bool, ResolveError> {
        self.resolver.evict(uri)
    }

    /// Live fetch bypassing the cache.
    pub async fn resolve_live(&self, uri: &str) -> MediaObject {
        self.resolver
            .resolve_live(uri)
            .await
            .unwrap_or_else(|e| error_object(uri, e))
    }

    /// Cache-first resolution with live fallback.
    pub async fn resolve(&self, uri: &str) -> MediaObject {
        self.resolver
            .resolve(uri)
            .await
            .unwrap_or_else(|e| error_object(uri, e))
    }

    /// Schedule expansion of `obj`.
    ///
    /// Albums are expanded before returning, since their discs and streams
    /// are needed right away. Everything else expands on a background task,
    /// unless another task is already expanding it.
    pub async fn trigger_expansion(&self, obj: MediaObject) -> Dispatch {
        if obj.uri.is_empty() || obj.is_error() || obj.state == ExpansionState::Expanded {
            return Dispatch::Skipped(obj);
        }

        if obj.kind() == ObjectKind::Album {
            return Dispatch::Inline(self.expander.expand(obj).await);
        }

        if self.expander.locks().is_locked(&obj.uri) {
            debug!(uri = %obj.uri, "Expansion already in progress");
            return Dispatch::Skipped(obj);
        }

        debug!(uri = %obj.uri, "Expanding in the background");
        let expander = self.expander.clone();
        let background = obj.clone();
        let task = tokio::spawn(async move { expander.expand(background).await });
        Dispatch::Background { object: obj, task }
    }

    /// Resolve `uri` and expand it to completion.
    pub async fn expand(&self, uri: &str) -> std::result::Result<ExpansionReport, ResolveError> {
        let obj = self.resolver.resolve(uri).await?;
        Ok(self.expander.expand(obj).await)
    }

    /// Formats to try when playing the stream at `uri`, best first.
    ///
    /// Starts at `requested` when the stream offers it, otherwise every
    /// format is returned.
    pub async fn playback_formats(
        &self,
        uri: &str,
        requested: Option<u32>,
    ) -> std::result::Result<Vec<Format>, ResolveError> {
        let obj = self.resolver.resolve(uri).await?;
        let Some(stream) = obj.as_stream() else {
            return Err(ResolveError::NotFound(format!(
                "{uri} is a {} object, not a stream",
                obj.kind()
            )));
        };

        let start = match requested {
            Some(id) if stream.format(id).is_some() => id,
            Some(id) => {
                warn!(uri, format = id, "Stream does not offer the requested format");
                id
            }
            None => stream.formats.first().map_or(0, |f| f.id),
        };
        Ok(stream.format_fallbacks(start).cloned().collect())
    }

    /// Search every active provider.
    pub async fn aggregate_search(&self, query: &str) -> SearchResults {
        self.resolver.search().aggregate(&normalize_query(query)).await
    }
}

fn error_object(uri: &str, e: ResolveError) -> MediaObject {
    debug!(uri, kind = e.kind(), error = %e, "Resolution failed");
    e.into_object()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::test_utils::{MockHandler, album_payload, creator_payload, write_catalog};
    use tempfile::TempDir;

    fn service(handler: MockHandler, dir: &TempDir) -> MediaService {
        let registry = HandlerRegistry::new().with(Arc::new(handler));
        let cache = ObjectCache::new(dir.path().join("cache"), TtlPolicy::default());
        MediaService::new(registry, cache, "http://media.test/", 2)
    }

    #[tokio::test]
    async fn test_albums_expand_inline() {
        let dir = TempDir::new().unwrap();
        let handler = MockHandler::new("p")
            .with_album("a", album_payload("p", &["1"]))
            .with_streams(&["1"]);
        let service = service(handler, &dir);

        let album = service.resolve("p:album:a").await;
        let dispatch = service.trigger_expansion(album).await;
        assert!(matches!(dispatch, Dispatch::Inline(_)));
        assert_eq!(dispatch.object().state, ExpansionState::Expanded);
    }

    #[tokio::test]
    async fn test_other_kinds_expand_in_background() {
        let dir = TempDir::new().unwrap();
        let handler = MockHandler::new("p")
            .with_creator("c", creator_payload("p", "C", &["1"]))
            .with_streams(&["1"]);
        let service = service(handler, &dir);

        let creator = service.resolve("p:creator:c").await;
        let dispatch = service.trigger_expansion(creator).await;
        assert!(matches!(dispatch, Dispatch::Background { .. }));
        assert_eq!(dispatch.object().state, ExpansionState::Unexpanded);

        let done = dispatch.finish().await;
        assert_eq!(done.state, ExpansionState::Expanded);
        let cached = service.resolve_cached("p:creator:c").await.unwrap();
        assert_eq!(cached.state, ExpansionState::Expanded);

        // Already expanded objects are not scheduled again
        assert!(matches!(service.trigger_expansion(cached).await, Dispatch::Skipped(_)));
    }

    #[tokio::test]
    async fn test_locked_objects_are_not_scheduled_twice() {
        let dir = TempDir::new().unwrap();
        let handler = MockHandler::new("p")
            .with_creator("c", creator_payload("p", "C", &["1"]))
            .with_streams(&["1"]);
        let service = service(handler, &dir);

        let creator = service.resolve("p:creator:c").await;
        let held = service.expander.locks().lock("p:creator:c").await;
        let dispatch = service.trigger_expansion(creator.clone()).await;
        assert!(matches!(dispatch, Dispatch::Skipped(_)));
        assert_eq!(dispatch.object().state, ExpansionState::Unexpanded);

        drop(held);
        let dispatch = service.trigger_expansion(creator).await;
        assert!(matches!(dispatch, Dispatch::Background { .. }));
        assert_eq!(dispatch.finish().await.state, ExpansionState::Expanded);
    }

    #[tokio::test]
    async fn test_evict() {
        let dir = TempDir::new().unwrap();
        let handler = MockHandler::new("p").with_album("a", album_payload("p", &["1"]));
        let service = service(handler, &dir);

        service.resolve("p:album:a").await;
        assert!(service.evict("p:album:a").unwrap());
        assert!(service.resolve_cached("p:album:a").await.is_none());
        assert!(!service.evict("p:album:a").unwrap());
        assert!(!service.evict("bestmatch:anything").unwrap());
        assert_eq!(service.evict("nope").unwrap_err().kind(), "not_found");

        // A directory where the entry file should be cannot be unlinked
        let path = service.cache().path_for("p:album:b").unwrap();
        std::fs::create_dir_all(&path).unwrap();
        let err = service.evict("p:album:b").unwrap_err();
        assert!(matches!(err, ResolveError::Cache(_)));
        assert_eq!(err.kind(), "cache_error");
    }

    #[tokio::test]
    async fn test_failures_become_error_objects() {
        let dir = TempDir::new().unwrap();
        let service = service(MockHandler::new("p").failing("x"), &dir);

        let obj = service.resolve("p:album:x").await;
        assert!(obj.is_error());
        assert_eq!(obj.as_error().unwrap().kind, "upstream_error");

        let obj = service.resolve_live("nope").await;
        assert_eq!(obj.as_error().unwrap().kind, "not_found");

        assert!(matches!(service.trigger_expansion(obj).await, Dispatch::Skipped(_)));
    }

    #[tokio::test]
    async fn test_aggregate_search_normalizes_query() {
        let dir = TempDir::new().unwrap();
        let service = service(MockHandler::new("p"), &dir);
        assert_eq!(service.aggregate_search("Big+Band").await.query, "big band");
    }

    #[tokio::test]
    async fn test_from_config_with_catalog() {
        let dir = TempDir::new().unwrap();
        write_catalog(&dir.path().join("catalog"));

        let mut config = Config::default();
        config.cache.dir = dir.path().join("cache");
        config.providers.push(ProviderConfig {
            name: "cat".to_string(),
            path: dir.path().join("catalog"),
            ..Default::default()
        });
        let service = MediaService::from_config(&config).unwrap();

        let report = service.expand("cat:album:debut").await.unwrap();
        assert!(report.failed.is_empty());
        let album = report.object.as_album().unwrap();
        let opener = album.discs[0].streams[0].as_stream().unwrap();
        assert!(opener.has_transcript());
        assert_eq!(
            opener.formats[0].playback_url,
            "http://localhost:8080/v1/stream/cat:stream:opener?format=1"
        );

        let ids = |formats: Vec<Format>| formats.iter().map(|f| f.id).collect::<Vec<_>>();
        let playback = service.playback_formats("cat:stream:opener", Some(2)).await;
        assert_eq!(ids(playback.unwrap()), vec![2]);
        let playback = service.playback_formats("cat:stream:opener", None).await;
        assert_eq!(ids(playback.unwrap()), vec![1, 2]);
        // Unknown ids fall back to every format
        let playback = service.playback_formats("cat:stream:opener", Some(9)).await;
        assert_eq!(ids(playback.unwrap()), vec![1, 2]);
        let err = service.playback_formats("cat:album:debut", None).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");

        // Expanding the stream pulls in the expanded album for the file name
        let stream = service.expand("cat:stream:opener").await.unwrap().object;
        assert_eq!(
            stream.as_stream().unwrap().file_name().as_deref(),
            Some("The Band - Debut 1999 - Opener.flac")
        );
    }
}
