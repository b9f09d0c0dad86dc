//! Retrieval source registry - manages source instances by name

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::retrieval::RetrievalSource;
use crate::domain::DomainError;

/// Registry of retrieval sources keyed by source name
///
/// Adding a backend is a registration, not a new dispatch branch. The
/// registry remembers registration order; by convention the cheapest
/// source (a local index) is registered first and networked sources
/// after it.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, Arc<dyn RetrievalSource>>>,
    order: RwLock<Vec<String>>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under its own name
    pub async fn register(&self, source: Arc<dyn RetrievalSource>) {
        let name = source.source_name().to_string();
        let mut sources = self.sources.write().await;

        if sources.insert(name.clone(), source).is_none() {
            self.order.write().await.push(name);
        }
    }

    /// Get a source by name
    pub async fn get(&self, name: &str) -> Option<Arc<dyn RetrievalSource>> {
        self.sources.read().await.get(name).cloned()
    }

    /// Get a source by name, returning an error if not registered
    pub async fn get_required(&self, name: &str) -> Result<Arc<dyn RetrievalSource>, DomainError> {
        self.get(name).await.ok_or_else(|| {
            DomainError::not_found(format!("No retrieval source registered as '{}'", name))
        })
    }

    /// Check whether a source is registered
    pub async fn has_source(&self, name: &str) -> bool {
        self.sources.read().await.contains_key(name)
    }

    /// Remove a source from the registry
    pub async fn unregister(&self, name: &str) -> Option<Arc<dyn RetrievalSource>> {
        let removed = self.sources.write().await.remove(name);

        if removed.is_some() {
            self.order.write().await.retain(|n| n != name);
        }

        removed
    }

    /// List registered source names in registration order
    pub async fn source_names(&self) -> Vec<String> {
        self.order.read().await.clone()
    }

    /// The first-registered source, conventionally the lowest-cost one
    pub async fn default_source_name(&self) -> Option<String> {
        self.order.read().await.first().cloned()
    }

    pub async fn count(&self) -> usize {
        self.sources.read().await.len()
    }
}
