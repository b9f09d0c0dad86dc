//! Run phase state machine

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Phase of an orchestration run
///
/// `Answering`, `MaxIterations`, and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Planning,
    Retrieving,
    Evaluating,
    Answering,
    MaxIterations,
    Cancelled,
}

/// Events driving phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// A retrieval action has been planned
    PlanReady,
    /// Retrieval and fusion finished for this iteration
    EvidenceReady,
    /// The evaluator judged the evidence insufficient, budget remains
    NeedsMoreEvidence,
    /// The evaluator's score reached the sufficiency threshold
    ThresholdMet,
    /// The iteration budget is exhausted
    BudgetExhausted,
    /// The caller's deadline or cancellation signal fired
    CancelRequested,
}

impl RunPhase {
    /// Apply an event, returning the next phase
    ///
    /// Invalid combinations are internal errors: the orchestrator never
    /// produces them, and a caller-visible failure here would indicate a
    /// bug in the loop itself.
    pub fn transition(self, event: PhaseEvent) -> Result<RunPhase, DomainError> {
        use PhaseEvent::*;
        use RunPhase::*;

        let next = match (self, event) {
            (Planning, PlanReady) => Retrieving,
            (Retrieving, EvidenceReady) => Evaluating,
            (Evaluating, NeedsMoreEvidence) => Planning,
            (Evaluating, ThresholdMet) => Answering,
            (Evaluating, BudgetExhausted) => MaxIterations,
            // Cancellation is only honored at safe checkpoints, between
            // iterations, so it can only fire from the planning phase.
            (Planning, CancelRequested) => Cancelled,
            (phase, event) => {
                return Err(DomainError::internal(format!(
                    "Invalid phase transition: {:?} on {:?}",
                    phase, event
                )));
            }
        };

        Ok(next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Answering | Self::MaxIterations | Self::Cancelled)
    }
}
