//! In-memory keyword source for development and testing

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::evidence::EvidenceItem;
use crate::domain::retrieval::RetrievalSource;
use crate::domain::DomainError;

/// Keyword source over an in-process document set
///
/// Scores documents by query term overlap, which is crude but ordered,
/// and serves as the conventional lowest-cost local source in front of
/// any networked backend.
#[derive(Debug)]
pub struct InMemoryEvidenceSource {
    name: String,
    documents: Arc<RwLock<Vec<String>>>,
}

impl InMemoryEvidenceSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_documents(self, documents: Vec<String>) -> Self {
        Self {
            name: self.name,
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    pub async fn add_document(&self, document: impl Into<String>) {
        self.documents.write().await.push(document.into());
    }

    pub async fn add_documents(&self, documents: Vec<String>) {
        self.documents.write().await.extend(documents);
    }

    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }
}

/// Lowercased alphanumeric terms of a text
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(|term| term.to_lowercase())
        .collect()
}

/// Fraction of query terms present in the document
fn overlap_score(query_terms: &HashSet<String>, document: &str) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }

    let document_terms = terms(document);
    let matched = query_terms
        .iter()
        .filter(|term| document_terms.contains(*term))
        .count();

    matched as f64 / query_terms.len() as f64
}

#[async_trait]
impl RetrievalSource for InMemoryEvidenceSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>, DomainError> {
        let query_terms = terms(query);
        let documents = self.documents.read().await;

        let mut scored: Vec<(f64, &String)> = documents
            .iter()
            .map(|document| (overlap_score(&query_terms, document), document))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let results = scored
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(index, (score, document))| {
                EvidenceItem::new(document.clone(), &self.name, index + 1, score)
            })
            .collect();

        Ok(results)
    }
}
