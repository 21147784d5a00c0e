//! Search fan-out across every active provider.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error};

use crate::handler::HandlerRegistry;
use crate::model::SearchResults;

/// Runs one query against every registered provider and merges the results.
#[derive(Debug, Clone)]
pub struct SearchAggregator {
    registry: Arc<HandlerRegistry>,
}

impl SearchAggregator {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Search every provider and concatenate their results in provider order.
    ///
    /// A failing provider is logged and skipped; the aggregate never fails.
    /// Providers are queried concurrently but merged in registry order, with
    /// no re-ranking or de-duplication.
    pub async fn aggregate(&self, query: &str) -> SearchResults {
        let searches = self.registry.iter().map(|handler| async move {
            let result = handler.search(query).await;
            (handler.provider(), result)
        });

        let mut results = SearchResults::new(query);
        for (provider, result) in join_all(searches).await {
            match result {
                Ok(partial) => {
                    debug!(
                        provider,
                        query,
                        streams = partial.streams.len(),
                        creators = partial.creators.len(),
                        albums = partial.albums.len(),
                        "Provider search finished"
                    );
                    results.extend(partial);
                }
                Err(e) => error!(provider, query, error = %e, "Search failed, skipping provider"),
            }
        }
        results
    }
}
