//! Iteration trace and run result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::evaluator::Evaluation;
use crate::domain::evidence::{EvidenceId, EvidenceItem};
use crate::domain::planner::PlannedAction;

/// Fixed reply when a run ends without ever retrieving evidence
pub const INSUFFICIENT_INFORMATION_MESSAGE: &str =
    "I could not find enough information to answer this question.";

/// Prefix marking an answer produced below the sufficiency threshold
pub const BEST_EFFORT_PREFIX: &str =
    "Note: the available evidence may be incomplete. Based on what was found: ";

/// Fixed reply when answer generation itself fails
pub const GENERATION_FAILED_MESSAGE: &str =
    "Evidence was retrieved but an answer could not be generated from it.";

/// Fixed reply for a run stopped by the caller's deadline or signal
pub const CANCELLED_MESSAGE: &str =
    "The run was cancelled before an answer could be produced.";

/// A retrieval failure recorded inside an iteration
///
/// Failures never abort the run; they are surfaced to the caller only
/// here, inside the trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: String,
    pub message: String,
}

impl SourceFailure {
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

/// One iteration of the plan-retrieve-evaluate loop
///
/// Records are append-only; the ordered sequence forms the reasoning
/// trace returned to the caller. Persisting it is the caller's concern,
/// hence the serde derives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Zero-based iteration index
    pub index: usize,
    /// The action the planner chose for this iteration
    pub action: PlannedAction,
    /// Ids of evidence retrieved this iteration, in fused order
    pub evidence_ids: Vec<EvidenceId>,
    /// Per-source retrieval failures, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SourceFailure>,
    /// The sufficiency judgment over the accumulated evidence
    pub evaluation: Evaluation,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl IterationRecord {
    pub fn had_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn retrieved_any_evidence(&self) -> bool {
        !self.evidence_ids.is_empty()
    }
}

/// Why an orchestration run terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// The sufficiency threshold was reached and an answer generated
    Answered,
    /// The iteration budget ran out with some evidence in hand
    MaxIterationsReached,
    /// The iteration budget ran out without any evidence at all
    NoEvidenceFound,
    /// The caller's deadline or cancellation signal fired
    Cancelled,
}

/// Final outcome of one orchestration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub run_id: Uuid,
    pub final_answer: String,
    /// True when the answer was produced without reaching the threshold
    pub best_effort: bool,
    pub iterations: Vec<IterationRecord>,
    /// Union of all evidence retrieved across iterations, deduplicated
    pub all_evidence_used: Vec<EvidenceItem>,
    pub termination_reason: TerminationReason,
}

impl OrchestrationResult {
    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }
}
