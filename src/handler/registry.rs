//! Ordered set of active handlers.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::Handler;
use super::catalog::CatalogHandler;
use crate::config::{ProviderConfig, ProviderKind};

/// Active handlers, indexed by provider name, in configured search order.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the configured provider table.
    ///
    /// Inactive providers are skipped entirely: their URIs resolve to
    /// "unknown provider" and they take no part in search.
    pub fn from_config(providers: &[ProviderConfig]) -> Self {
        let mut registry = Self::new();
        for provider in providers {
            if !provider.active {
                debug!(provider = %provider.name, "Skipping inactive provider");
                continue;
            }
            let handler: Arc<dyn Handler> = match provider.kind {
                ProviderKind::Catalog => Arc::new(CatalogHandler::new(&provider.name, &provider.path)),
            };
            if !registry.register(handler) {
                warn!(provider = %provider.name, "Provider registered twice, keeping the first");
            }
        }
        info!(providers = ?registry.providers().collect::<Vec<_>>(), "Handler registry ready");
        registry
    }

    /// Append a handler. Returns `false` if its provider name is already taken.
    pub fn register(&mut self, handler: Arc<dyn Handler>) -> bool {
        if self.get(handler.provider()).is_some() {
            return false;
        }
        self.handlers.push(handler);
        true
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, handler: Arc<dyn Handler>) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, provider: &str) -> Option<Arc<dyn Handler>> {
        self.handlers
            .iter()
            .find(|h| h.provider() == provider)
            .cloned()
    }

    /// Handlers in search order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Handler>> {
        self.handlers.iter()
    }

    /// Provider names in search order.
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|h| h.provider())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.providers()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockHandler;
    use std::path::PathBuf;

    #[test]
    fn test_registration_order_is_kept() {
        let registry = HandlerRegistry::new()
            .with(Arc::new(MockHandler::new("b")))
            .with(Arc::new(MockHandler::new("a")))
            .with(Arc::new(MockHandler::new("c")));

        assert_eq!(registry.providers().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("zzz").is_none());
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register(Arc::new(MockHandler::new("p"))));
        assert!(!registry.register(Arc::new(MockHandler::new("p"))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_from_config_skips_inactive() {
        let providers = vec![
            ProviderConfig {
                name: "main".to_string(),
                path: PathBuf::from("/nonexistent/main"),
                ..Default::default()
            },
            ProviderConfig {
                name: "old".to_string(),
                active: false,
                path: PathBuf::from("/nonexistent/old"),
                ..Default::default()
            },
        ];
        let registry = HandlerRegistry::from_config(&providers);

        assert_eq!(registry.providers().collect::<Vec<_>>(), vec!["main"]);
        assert!(registry.get("old").is_none());
    }
}
