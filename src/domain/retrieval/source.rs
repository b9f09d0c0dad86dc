//! Retrieval source trait

use std::fmt::Debug;

use async_trait::async_trait;

use crate::domain::evidence::EvidenceItem;
use crate::domain::DomainError;

/// Uniform capability exposed by every retrieval backend
///
/// Implementations (a semantic index, a keyword index, a web search
/// client) are treated polymorphically by the orchestrator; only this
/// contract matters.
///
/// Contract:
/// - results are ordered by the source's own relevance, best first, with
///   `source_rank` set to the 1-based position in the returned list;
/// - "no results" is an empty list, never an error;
/// - errors are reserved for transport or auth failure.
#[async_trait]
pub trait RetrievalSource: Send + Sync + Debug {
    /// Name this source is registered and addressed under
    fn source_name(&self) -> &str;

    /// Search for evidence matching the query
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>, DomainError>;
}
