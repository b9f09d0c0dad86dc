//! Evidence items and the per-run evidence pool

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stable identifier for a piece of evidence, derived from its content
///
/// Retrieving the same text twice, from any source in any iteration,
/// yields the same id, which is what makes cross-iteration deduplication
/// work.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceId(String);

/// Hex characters of the content hash kept in the id
const ID_LENGTH: usize = 16;

impl EvidenceId {
    /// Derive an id from evidence text
    pub fn from_content(text: &str) -> Self {
        let digest = Sha256::digest(text.as_bytes());
        let mut id = hex::encode(digest);
        id.truncate(ID_LENGTH);
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EvidenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate piece of evidence returned by a retrieval source
///
/// Immutable after creation. `source_rank` is the 1-based position within
/// the originating source's result list; `source_score` is the backend's
/// native relevance value, whose scale varies by source and is never
/// compared across sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: EvidenceId,
    pub text: String,
    pub source_name: String,
    pub source_rank: usize,
    pub source_score: f64,
}

impl EvidenceItem {
    /// Create a new evidence item; the id is derived from the text
    pub fn new(
        text: impl Into<String>,
        source_name: impl Into<String>,
        source_rank: usize,
        source_score: f64,
    ) -> Self {
        let text = text.into();

        Self {
            id: EvidenceId::from_content(&text),
            text,
            source_name: source_name.into(),
            source_rank,
            source_score,
        }
    }
}

/// An evidence item with its fused ranking score
///
/// Derived by rank fusion; recomputed on every fusion call and never
/// persisted across iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedEvidence {
    pub item: EvidenceItem,
    pub fused_score: f64,
}

/// Accumulated evidence for one orchestration run, deduplicated by id
///
/// Insertion-ordered: items keep the order in which they were first seen,
/// so evidence from earlier iterations stays ahead of later arrivals.
#[derive(Debug, Default)]
pub struct EvidencePool {
    items: Vec<EvidenceItem>,
    seen: HashSet<EvidenceId>,
}

impl EvidencePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, returning true if it was not already present
    pub fn insert(&mut self, item: EvidenceItem) -> bool {
        if self.seen.contains(&item.id) {
            return false;
        }

        self.seen.insert(item.id.clone());
        self.items.push(item);
        true
    }

    /// Insert many items, returning how many were new
    pub fn extend(&mut self, items: impl IntoIterator<Item = EvidenceItem>) -> usize {
        items
            .into_iter()
            .map(|item| self.insert(item))
            .filter(|added| *added)
            .count()
    }

    pub fn contains(&self, id: &EvidenceId) -> bool {
        self.seen.contains(id)
    }

    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    pub fn ids(&self) -> Vec<EvidenceId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the pool, yielding items in first-seen order
    pub fn into_items(self) -> Vec<EvidenceItem> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_id_stable_across_retrievals() {
        let a = EvidenceId::from_content("Paris is the capital of France.");
        let b = EvidenceId::from_content("Paris is the capital of France.");
        let c = EvidenceId::from_content("Berlin is the capital of Germany.");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn test_evidence_item_id_derived_from_text() {
        let item = EvidenceItem::new("Some content", "local", 1, 0.9);
        assert_eq!(item.id, EvidenceId::from_content("Some content"));
        assert_eq!(item.source_name, "local");
        assert_eq!(item.source_rank, 1);
    }

    #[test]
    fn test_pool_deduplicates_by_id() {
        let mut pool = EvidencePool::new();

        // Same text from two different sources yields one entry
        assert!(pool.insert(EvidenceItem::new("Shared text", "local", 1, 0.9)));
        assert!(!pool.insert(EvidenceItem::new("Shared text", "web", 3, 12.5)));
        assert!(pool.insert(EvidenceItem::new("Other text", "web", 1, 20.0)));

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.items()[0].source_name, "local");
    }

    #[test]
    fn test_pool_preserves_first_seen_order() {
        let mut pool = EvidencePool::new();
        pool.insert(EvidenceItem::new("first", "local", 1, 0.9));
        pool.insert(EvidenceItem::new("second", "local", 2, 0.8));
        pool.insert(EvidenceItem::new("third", "web", 1, 5.0));

        let texts: Vec<&str> = pool.items().iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_pool_extend_counts_new_items() {
        let mut pool = EvidencePool::new();
        pool.insert(EvidenceItem::new("a", "local", 1, 0.9));

        let added = pool.extend(vec![
            EvidenceItem::new("a", "web", 1, 5.0),
            EvidenceItem::new("b", "web", 2, 4.0),
        ]);

        assert_eq!(added, 1);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_empty_pool() {
        let pool = EvidencePool::new();
        assert!(pool.is_empty());
        assert!(pool.ids().is_empty());
    }
}
