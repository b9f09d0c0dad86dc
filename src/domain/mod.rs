//! Domain layer - core orchestration logic and trait contracts

pub mod answer;
pub mod error;
pub mod evaluator;
pub mod evidence;
pub mod fusion;
pub mod judgment;
pub mod llm;
pub mod orchestrator;
pub mod planner;
pub mod question;
pub mod retrieval;

pub use answer::{AnswerGenerator, AnswerGeneratorConfig, LlmAnswerGenerator};
pub use error::DomainError;
pub use evaluator::{Evaluation, Evaluator, EvaluatorConfig, LlmEvaluator, Verdict};
pub use evidence::{EvidenceId, EvidenceItem, EvidencePool, FusedEvidence};
pub use fusion::{fuse, FusionConfig};
pub use llm::{
    FinishReason, LlmProvider, LlmRequest, LlmRequestBuilder, LlmResponse, Message, MessageRole,
    Usage,
};
pub use orchestrator::{
    IterationRecord, OrchestrationContext, OrchestrationResult, Orchestrator, PhaseEvent,
    RunOptions, RunPhase, SourceFailure, TerminationReason,
};
pub use planner::{LlmPlanner, PlannedAction, Planner, PlannerConfig};
pub use question::{ConversationTurn, Question, TurnRole};
pub use retrieval::{RetrievalSource, SourceRegistry};
