//! Per-run orchestration state

use uuid::Uuid;

use super::record::{IterationRecord, OrchestrationResult, TerminationReason};
use super::state::{PhaseEvent, RunPhase};
use crate::domain::evidence::EvidencePool;
use crate::domain::question::Question;

/// State owned by exactly one `run()` invocation
///
/// Carries the question, the append-only iteration trace, the
/// accumulated evidence pool, and the current phase. Nothing here is
/// shared between concurrent runs.
#[derive(Debug)]
pub struct OrchestrationContext {
    run_id: Uuid,
    question: Question,
    phase: RunPhase,
    records: Vec<IterationRecord>,
    pool: EvidencePool,
}

impl OrchestrationContext {
    pub fn new(question: Question) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            question,
            phase: RunPhase::Planning,
            records: Vec::new(),
            pool: EvidencePool::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Apply a phase event
    ///
    /// The orchestration loop only produces valid event sequences; an
    /// invalid one is a bug in the loop, logged and otherwise ignored so
    /// a run still resolves to a result.
    pub fn advance(&mut self, event: PhaseEvent) {
        match self.phase.transition(event) {
            Ok(next) => self.phase = next,
            Err(error) => {
                tracing::error!(%error, "Orchestration state machine violation");
            }
        }
    }

    pub fn push_record(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn pool(&self) -> &EvidencePool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut EvidencePool {
        &mut self.pool
    }

    /// Consume the context into the run's final result
    pub fn into_result(
        self,
        final_answer: String,
        best_effort: bool,
        termination_reason: TerminationReason,
    ) -> OrchestrationResult {
        OrchestrationResult {
            run_id: self.run_id,
            final_answer,
            best_effort,
            iterations: self.records,
            all_evidence_used: self.pool.into_items(),
            termination_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::evidence::EvidenceItem;

    #[test]
    fn test_context_starts_planning() {
        let ctx = OrchestrationContext::new(Question::new("q").unwrap());
        assert_eq!(ctx.phase(), RunPhase::Planning);
        assert!(ctx.records().is_empty());
        assert!(ctx.pool().is_empty());
    }

    #[test]
    fn test_advance_applies_valid_events() {
        let mut ctx = OrchestrationContext::new(Question::new("q").unwrap());
        ctx.advance(PhaseEvent::PlanReady);
        assert_eq!(ctx.phase(), RunPhase::Retrieving);
    }

    #[test]
    fn test_invalid_event_keeps_phase() {
        let mut ctx = OrchestrationContext::new(Question::new("q").unwrap());
        ctx.advance(PhaseEvent::ThresholdMet);
        assert_eq!(ctx.phase(), RunPhase::Planning);
    }

    #[test]
    fn test_into_result_carries_pool_and_trace() {
        let mut ctx = OrchestrationContext::new(Question::new("q").unwrap());
        ctx.pool_mut()
            .insert(EvidenceItem::new("some evidence", "local", 1, 0.9));

        let result = ctx.into_result("answer".to_string(), false, TerminationReason::Answered);

        assert_eq!(result.final_answer, "answer");
        assert_eq!(result.all_evidence_used.len(), 1);
        assert_eq!(result.termination_reason, TerminationReason::Answered);
    }
}
