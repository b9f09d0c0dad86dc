//! PMP RAG Orchestrator
//!
//! An iterative, self-evaluating retrieval orchestrator:
//! - plans a retrieval action, executes it against registered sources,
//!   judges the accumulated evidence, and decides to answer, retry, or
//!   replan, within a strict iteration budget
//! - merges ranked lists from heterogeneous sources (semantic, keyword,
//!   web) with weighted reciprocal rank fusion
//! - absorbs every collaborator failure into the run's trace; a run
//!   always resolves to a well-formed result
//!
//! Document ingestion, concrete search indexes, and any UI are external
//! collaborators; only their trait contracts live here.

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{
    AnswerGenerator, DomainError, Evaluation, Evaluator, EvidenceId, EvidenceItem,
    OrchestrationResult, Orchestrator, PlannedAction, Planner, Question, RetrievalSource,
    RunOptions, SourceRegistry, TerminationReason,
};

use std::sync::Arc;

use domain::{
    AnswerGeneratorConfig, EvaluatorConfig, LlmAnswerGenerator, LlmEvaluator, LlmPlanner,
    LlmProvider, PlannerConfig,
};
use tracing::info;

/// Assemble an LLM-backed orchestrator from configuration
///
/// Wires the configured judgment model into the planner and evaluator,
/// the answer model into the generator, and the orchestrator defaults
/// into the run options. Sources are registered by the caller; register
/// the cheapest one first, since it doubles as the planner's default.
pub fn build_orchestrator(
    provider: Arc<dyn LlmProvider>,
    registry: Arc<SourceRegistry>,
    config: &AppConfig,
) -> Orchestrator {
    info!(
        judgment_model = %config.llm.judgment_model,
        answer_model = %config.llm.answer_model,
        "Building LLM-backed orchestrator"
    );

    let planner = LlmPlanner::new(
        Arc::clone(&provider),
        Arc::clone(&registry),
        PlannerConfig::new(&config.llm.judgment_model),
    );
    let evaluator = LlmEvaluator::new(
        Arc::clone(&provider),
        EvaluatorConfig::new(&config.llm.judgment_model),
    );
    let generator = LlmAnswerGenerator::new(
        provider,
        AnswerGeneratorConfig::new(&config.llm.answer_model),
    );

    Orchestrator::new(
        registry,
        Arc::new(planner),
        Arc::new(evaluator),
        Arc::new(generator),
    )
    .with_options(config.orchestrator.run_options())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::retrieval::MockRetrievalSource;

    #[tokio::test]
    async fn test_build_orchestrator_applies_config() {
        let provider: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider::new("mock"));
        let registry = Arc::new(SourceRegistry::new());
        registry
            .register(Arc::new(MockRetrievalSource::new("local")))
            .await;

        let mut config = AppConfig::default();
        config.orchestrator.max_iterations = 5;
        config.orchestrator.sufficiency_threshold = 8;

        let orchestrator = build_orchestrator(provider, registry, &config);

        assert_eq!(orchestrator.options().max_iterations, 5);
        assert_eq!(orchestrator.options().sufficiency_threshold, 8);
    }
}
