//! URI resolution.
//!
//! [`Resolver::resolve`] is the single entry point used both by callers and by
//! the expansion engine: cache first, live fetch on a miss, persist the live
//! result. `search:` URIs fan out through the [`SearchAggregator`];
//! `bestmatch:` URIs collapse a search into its most relevant entry.

mod search;

pub use search::SearchAggregator;

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, trace, warn};

use crate::cache::{CacheError, ObjectCache};
use crate::handler::{Handler, HandlerError, HandlerRegistry};
use crate::model::{MediaObject, ObjectKind, Payload, SYNTHETIC_PROVIDER};
use crate::uri::{MediaUri, UriError};

/// Why a URI could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Unparseable URI, unknown provider, or the provider has no such id
    #[error("{0}")]
    NotFound(String),

    #[error("{provider} {operation} failed: {source}")]
    Upstream {
        provider: String,
        operation: &'static str,
        #[source]
        source: HandlerError,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A valid query with nothing to return
    #[error("{0}")]
    EmptyResult(String),

    #[error("expansion of {uri} left {} reference(s) unresolved", failed.len())]
    ExpansionFailure { uri: String, failed: Vec<String> },

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ResolveError {
    /// Snake-case kind recorded in error objects.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::NotFound(_) => "not_found",
            ResolveError::Upstream { .. } => "upstream_error",
            ResolveError::Serialization(_) => "serialization_error",
            ResolveError::EmptyResult(_) => "empty_result",
            ResolveError::ExpansionFailure { .. } => "expansion_failure",
            ResolveError::Cache(_) => "cache_error",
        }
    }

    /// The typed error object handed to callers in place of a result.
    pub fn into_object(self) -> MediaObject {
        MediaObject::error(self.kind(), self.to_string())
    }

    fn upstream(provider: &str, operation: &'static str, source: HandlerError) -> Self {
        if let HandlerError::NotFound { kind, id } = &source {
            return ResolveError::NotFound(format!("{provider}: no such {kind} {id}"));
        }
        ResolveError::Upstream {
            provider: provider.to_string(),
            operation,
            source,
        }
    }
}

impl From<UriError> for ResolveError {
    fn from(e: UriError) -> Self {
        ResolveError::NotFound(e.to_string())
    }
}

/// Dispatches URIs to the cache, the handlers or the search aggregator.
#[derive(Debug)]
pub struct Resolver {
    registry: Arc<HandlerRegistry>,
    cache: Arc<ObjectCache>,
    search: SearchAggregator,
    base_url: String,
}

impl Resolver {
    /// `base_url` prefixes the playback URLs stamped onto stream formats.
    pub fn new(registry: Arc<HandlerRegistry>, cache: Arc<ObjectCache>, base_url: impl Into<String>) -> Self {
        Self {
            search: SearchAggregator::new(registry.clone()),
            registry,
            cache,
            base_url: base_url.into(),
        }
    }

    pub fn cache(&self) -> &Arc<ObjectCache> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn search(&self) -> &SearchAggregator {
        &self.search
    }

    /// Cache lookup only. `bestmatch:` URIs are never cached.
    pub async fn resolve_cached(&self, uri: &str) -> Option<MediaObject> {
        let parsed = MediaUri::parse(uri).ok()?;
        if !parsed.is_cacheable() {
            return None;
        }
        self.cache.get_async(&parsed.canonical()).await
    }

    /// Drop the cached copy of `uri`. Returns whether an entry was removed.
    pub fn evict(&self, uri: &str) -> Result<bool, ResolveError> {
        let parsed = MediaUri::parse(uri)?;
        if !parsed.is_cacheable() {
            return Ok(false);
        }
        let removed = self.cache.remove(&parsed.canonical())?;
        debug!(uri = %parsed, removed, "Evicted");
        Ok(removed)
    }

    /// Fetch without consulting or updating the cache.
    pub async fn resolve_live(&self, uri: &str) -> Result<MediaObject, ResolveError> {
        let parsed = MediaUri::parse(uri)?;
        if let MediaUri::BestMatch { query } = &parsed {
            return self.best_match(query).await;
        }
        self.fetch(&parsed).await
    }

    /// Cache first, live fetch on a miss; live results are persisted.
    pub async fn resolve(&self, uri: &str) -> Result<MediaObject, ResolveError> {
        let parsed = MediaUri::parse(uri)?;
        self.resolve_parsed(&parsed).await
    }

    fn resolve_parsed<'a>(&'a self, uri: &'a MediaUri) -> BoxFuture<'a, Result<MediaObject, ResolveError>> {
        async move {
            if let MediaUri::BestMatch { query } = uri {
                return self.best_match(query).await;
            }

            let key = uri.canonical();
            if let Some(hit) = self.cache.get_async(&key).await {
                trace!(uri = %key, "Resolved from cache");
                return Ok(hit);
            }

            let mut obj = self.fetch(uri).await?;
            self.persist(&mut obj).await;
            Ok(obj)
        }
        .boxed()
    }

    /// Persist a live result. Empty payloads are skipped and write failures
    /// are logged: the caller still gets the object.
    pub async fn persist(&self, obj: &mut MediaObject) {
        match self.cache.put_async(obj).await {
            Ok(_) => {}
            Err(CacheError::Empty { .. }) => {
                debug!(uri = %obj.uri, kind = %obj.kind(), "Not caching empty result");
            }
            Err(e) => warn!(uri = %obj.uri, error = %e, "Failed to cache object"),
        }
    }

    /// Resolve `search:<query>` and return its first stream, else first
    /// creator, else first album, itself fully resolved.
    async fn best_match(&self, query: &str) -> Result<MediaObject, ResolveError> {
        let search = MediaUri::Search {
            query: query.to_string(),
        };
        let results = self.resolve_parsed(&search).await?;
        let Some(results) = results.as_search() else {
            return Err(ResolveError::Serialization(format!(
                "search:{query} resolved to a {} object",
                results.kind()
            )));
        };

        let best = results
            .streams
            .first()
            .or_else(|| results.creators.first())
            .or_else(|| results.albums.first());
        let Some(best) = best else {
            return Err(ResolveError::EmptyResult(format!(
                "bestmatch: no match for {query}, try a better query"
            )));
        };

        debug!(query, uri = %best.uri, "Best match");
        let target = MediaUri::parse(&best.uri)?;
        self.resolve_parsed(&target).await
    }

    async fn fetch(&self, uri: &MediaUri) -> Result<MediaObject, ResolveError> {
        debug!(uri = %uri, "Fetching live");
        match uri {
            MediaUri::Search { query } => {
                let results = self.search.aggregate(query).await;
                Ok(MediaObject::new(
                    uri.canonical(),
                    SYNTHETIC_PROVIDER,
                    Payload::Search(results),
                ))
            }
            MediaUri::BestMatch { query } => self.best_match(query).await,
            MediaUri::Entity { provider, kind, id } => {
                let handler = self
                    .registry
                    .get(provider)
                    .ok_or_else(|| ResolveError::NotFound(format!("unknown provider {provider}")))?;
                let payload = self.fetch_entity(handler.as_ref(), *kind, id, &uri.canonical()).await?;
                Ok(MediaObject::new(uri.canonical(), provider.as_str(), payload))
            }
        }
    }

    async fn fetch_entity(
        &self,
        handler: &dyn Handler,
        kind: ObjectKind,
        id: &str,
        uri: &str,
    ) -> Result<Payload, ResolveError> {
        let provider = handler.provider();
        match kind {
            ObjectKind::Creator => {
                let mut creator = handler
                    .creator(id)
                    .await
                    .map_err(|e| ResolveError::upstream(provider, "creator", e))?;
                creator.description = handler.replace_uri(&creator.description);
                Ok(Payload::Creator(creator))
            }
            ObjectKind::Album => {
                let mut album = handler
                    .album(id)
                    .await
                    .map_err(|e| ResolveError::upstream(provider, "album", e))?;
                album.description = handler.replace_uri(&album.description);
                Ok(Payload::Album(album))
            }
            ObjectKind::Stream => {
                let mut stream = handler
                    .stream(id)
                    .await
                    .map_err(|e| ResolveError::upstream(provider, "stream", e))?;

                if !stream.has_transcript() {
                    if let Err(e) = handler.transcribe(id, &mut stream).await {
                        debug!(uri, error = %e, "No transcript available");
                    }
                }

                if stream.formats.is_empty() {
                    stream.formats = handler.format_list();
                }
                for format in &mut stream.formats {
                    if format.playback_url.is_empty() {
                        format.playback_url = format.playback_url_for(&self.base_url, uri);
                    }
                }
                Ok(Payload::Stream(stream))
            }
            ObjectKind::Search | ObjectKind::Error => {
                Err(ResolveError::NotFound(format!("{uri} is not a provider object")))
            }
        }
    }
}
