//! The orchestration loop and its per-run state

pub mod config;
pub mod context;
pub mod engine;
pub mod record;
pub mod state;

pub use config::RunOptions;
pub use context::OrchestrationContext;
pub use engine::Orchestrator;
pub use record::{
    IterationRecord, OrchestrationResult, SourceFailure, TerminationReason, BEST_EFFORT_PREFIX,
    CANCELLED_MESSAGE, GENERATION_FAILED_MESSAGE, INSUFFICIENT_INFORMATION_MESSAGE,
};
pub use state::{PhaseEvent, RunPhase};
