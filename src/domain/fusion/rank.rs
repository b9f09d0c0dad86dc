//! Weighted reciprocal rank fusion

use std::collections::HashMap;

use super::FusionConfig;
use crate::domain::evidence::{EvidenceId, EvidenceItem, FusedEvidence};
use crate::domain::DomainError;

/// Merge ranked result lists from multiple sources into one ranked list
///
/// Each item appearing in list `i` at 1-based position `r` contributes
/// `weights[i] / (k + r)` to its fused score; contributions are summed
/// per distinct evidence id. Rank position is the only signal used -
/// backend-native scores are not comparable across sources (cosine
/// similarity vs BM25 vs web relevance), so they are ignored here.
///
/// Ordering is total: descending fused score, then the best (smallest)
/// position the item achieved in any contributing list, then lexical id.
/// A single-list input degenerates to a rerank by `1 / (k + r)`, which
/// preserves the input order exactly.
///
/// `result_lists` and `weights` are parallel and must have equal length.
pub fn fuse(
    result_lists: &[Vec<EvidenceItem>],
    weights: &[f64],
    config: &FusionConfig,
) -> Result<Vec<FusedEvidence>, DomainError> {
    if result_lists.len() != weights.len() {
        return Err(DomainError::validation(format!(
            "Fusion requires one weight per result list, got {} lists and {} weights",
            result_lists.len(),
            weights.len()
        )));
    }

    if let Some(weight) = weights.iter().find(|w| !w.is_finite()) {
        return Err(DomainError::validation(format!(
            "Fusion weights must be finite, got {}",
            weight
        )));
    }

    let k = f64::from(config.rrf_k);
    let mut accumulated: HashMap<EvidenceId, Accumulated> = HashMap::new();

    for (list, weight) in result_lists.iter().zip(weights) {
        for (index, item) in list.iter().enumerate() {
            let rank = index + 1;
            let contribution = weight / (k + rank as f64);

            accumulated
                .entry(item.id.clone())
                .and_modify(|entry| {
                    entry.fused_score += contribution;
                    entry.best_rank = entry.best_rank.min(rank);
                })
                .or_insert_with(|| Accumulated {
                    item: item.clone(),
                    fused_score: contribution,
                    best_rank: rank,
                });
        }
    }

    let mut fused: Vec<Accumulated> = accumulated.into_values().collect();

    fused.sort_by(|a, b| {
        b.fused_score
            .total_cmp(&a.fused_score)
            .then_with(|| a.best_rank.cmp(&b.best_rank))
            .then_with(|| a.item.id.cmp(&b.item.id))
    });

    Ok(fused
        .into_iter()
        .map(|entry| FusedEvidence {
            item: entry.item,
            fused_score: entry.fused_score,
        })
        .collect())
}

struct Accumulated {
    item: EvidenceItem,
    fused_score: f64,
    best_rank: usize,
}
