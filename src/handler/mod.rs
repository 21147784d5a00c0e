//! Provider handlers.
//!
//! A handler serves one URI scheme (`catalog:album:42` is served by the handler
//! whose [`Handler::provider`] is `catalog`). Handlers return domain structs;
//! wrapping them into [`MediaObject`](crate::model::MediaObject) envelopes,
//! caching and expansion are the resolver's job.
//!
//! Handlers are held by a [`HandlerRegistry`] built once at start-up.

pub mod catalog;
mod registry;

pub use registry::HandlerRegistry;

use async_trait::async_trait;

use crate::model::{Album, Creator, Format, SearchResults, Stream};

/// Errors a handler can report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    #[error("no such {kind}: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("provider API error: {0}")]
    Api(String),

    #[error("failed to parse provider response: {0}")]
    Parse(String),

    #[error("{0} is not supported by this provider")]
    Unsupported(&'static str),
}

impl HandlerError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Capability interface of a provider.
///
/// Implement this trait to add a provider, or to mock one in tests.
#[async_trait]
pub trait Handler: Send + Sync {
    /// URI scheme this handler serves.
    fn provider(&self) -> &str;

    async fn creator(&self, id: &str) -> Result<Creator, HandlerError>;

    async fn album(&self, id: &str) -> Result<Album, HandlerError>;

    async fn stream(&self, id: &str) -> Result<Stream, HandlerError>;

    async fn search(&self, query: &str) -> Result<SearchResults, HandlerError>;

    /// Fill in `stream.transcript` for the stream with the given id.
    ///
    /// Callers treat any error as "no transcript available".
    async fn transcribe(&self, _id: &str, _stream: &mut Stream) -> Result<(), HandlerError> {
        Err(HandlerError::Unsupported("transcribe"))
    }

    /// Every format this provider can serve, best to worst.
    fn format_list(&self) -> Vec<Format> {
        Vec::new()
    }

    /// Rewrite provider-specific links embedded in `text` to uniform URIs.
    fn replace_uri(&self, text: &str) -> String {
        text.to_string()
    }
}
