//! Filesystem catalog provider
//!
//! Serves creators, albums and streams from a directory of JSON documents
//! (see [`dto`] for the layout). Useful for self-hosted libraries and as a
//! deterministic provider in tests.

pub mod dto;
mod adapter;
mod client;

pub use adapter::{catalog_formats, parse_lrc, replace_links};
pub use client::CatalogClient;

use std::path::Path;

use async_trait::async_trait;

use super::{Handler, HandlerError};
use crate::model::{Album, Creator, Format, ObjectKind, SearchResults, Stream};

/// Handler backed by a [`CatalogClient`].
#[derive(Debug, Clone)]
pub struct CatalogHandler {
    provider: String,
    client: CatalogClient,
    formats: Vec<Format>,
}

impl CatalogHandler {
    pub fn new(provider: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            provider: provider.into(),
            client: CatalogClient::new(root.as_ref()),
            formats: catalog_formats(),
        }
    }

    fn matches(name: &str, query: &str) -> bool {
        !query.is_empty() && name.to_lowercase().contains(query)
    }
}

#[async_trait]
impl Handler for CatalogHandler {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn creator(&self, id: &str) -> Result<Creator, HandlerError> {
        let doc: dto::CreatorDoc = self.client.document("creator", id).await?;
        Ok(adapter::to_creator(&self.provider, doc))
    }

    async fn album(&self, id: &str) -> Result<Album, HandlerError> {
        let doc: dto::AlbumDoc = self.client.document("album", id).await?;
        Ok(adapter::to_album(&self.provider, doc))
    }

    async fn stream(&self, id: &str) -> Result<Stream, HandlerError> {
        let doc: dto::TrackDoc = self.client.document("stream", id).await?;
        Ok(adapter::to_stream(&self.provider, doc, &self.formats))
    }

    async fn search(&self, query: &str) -> Result<SearchResults, HandlerError> {
        let query = query.trim().to_lowercase();
        let mut results = SearchResults::new(query.clone());

        let stub = |kind: ObjectKind, id: String, name: String| {
            adapter::to_stub(&self.provider, kind, &dto::RefDoc { id, name })
        };

        for (id, doc) in self.client.documents::<dto::TrackDoc>("stream").await? {
            if Self::matches(&doc.name, &query) {
                results.streams.push(stub(ObjectKind::Stream, id, doc.name));
            }
        }
        for (id, doc) in self.client.documents::<dto::CreatorDoc>("creator").await? {
            if Self::matches(&doc.name, &query) {
                results.creators.push(stub(ObjectKind::Creator, id, doc.name));
            }
        }
        for (id, doc) in self.client.documents::<dto::AlbumDoc>("album").await? {
            if Self::matches(&doc.name, &query) {
                results.albums.push(stub(ObjectKind::Album, id, doc.name));
            }
        }

        tracing::debug!(
            provider = %self.provider,
            query = %query,
            streams = results.streams.len(),
            creators = results.creators.len(),
            albums = results.albums.len(),
            "Catalog search"
        );
        Ok(results)
    }

    async fn transcribe(&self, id: &str, stream: &mut Stream) -> Result<(), HandlerError> {
        let text = self.client.transcript(id).await?;
        let transcript = parse_lrc(id, &text);
        if transcript.lines.is_empty() {
            return Err(HandlerError::not_found("transcript", id));
        }
        stream.transcript = Some(transcript);
        Ok(())
    }

    fn format_list(&self) -> Vec<Format> {
        self.formats.clone()
    }

    fn replace_uri(&self, text: &str) -> String {
        replace_links(&self.provider, text)
    }
}
