//! The plan-retrieve-fuse-evaluate-decide loop

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::config::RunOptions;
use super::context::OrchestrationContext;
use super::record::{
    IterationRecord, OrchestrationResult, SourceFailure, TerminationReason, BEST_EFFORT_PREFIX,
    CANCELLED_MESSAGE, GENERATION_FAILED_MESSAGE, INSUFFICIENT_INFORMATION_MESSAGE,
};
use super::state::PhaseEvent;
use crate::domain::answer::AnswerGenerator;
use crate::domain::evaluator::{Evaluation, Evaluator};
use crate::domain::evidence::{EvidenceId, EvidenceItem};
use crate::domain::fusion::fuse;
use crate::domain::planner::{PlannedAction, Planner};
use crate::domain::question::Question;
use crate::domain::retrieval::SourceRegistry;
use crate::domain::DomainError;

/// Iterative self-evaluating retrieval orchestrator
///
/// Drives the plan -> retrieve -> fuse -> evaluate -> decide loop,
/// strictly bounded by the configured iteration cap. Every run owns its
/// own context; the orchestrator itself is stateless between runs and
/// safe to share across concurrent invocations.
///
/// No failure of any collaborator is fatal: source errors become empty
/// iterations, judgment failures become conservative defaults, and every
/// run resolves to a well-formed [`OrchestrationResult`].
#[derive(Debug)]
pub struct Orchestrator {
    registry: Arc<SourceRegistry>,
    planner: Arc<dyn Planner>,
    evaluator: Arc<dyn Evaluator>,
    answer_generator: Arc<dyn AnswerGenerator>,
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<SourceRegistry>,
        planner: Arc<dyn Planner>,
        evaluator: Arc<dyn Evaluator>,
        answer_generator: Arc<dyn AnswerGenerator>,
    ) -> Self {
        Self {
            registry,
            planner,
            evaluator,
            answer_generator,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Run the loop to completion for one question
    pub async fn run(&self, question: Question) -> OrchestrationResult {
        self.run_with_cancellation(question, CancellationToken::new())
            .await
    }

    /// Run the loop, honoring a caller-supplied cancellation signal
    ///
    /// Cancellation (and the overall run timeout, when configured) is
    /// observed at the between-iteration checkpoint, never mid-phase;
    /// the partial trace gathered so far is returned marked cancelled.
    pub async fn run_with_cancellation(
        &self,
        question: Question,
        cancel: CancellationToken,
    ) -> OrchestrationResult {
        let mut ctx = OrchestrationContext::new(question);
        let span = tracing::info_span!("orchestration_run", run_id = %ctx.run_id());

        async move {
            let deadline = self.options.run_timeout.map(|timeout| Instant::now() + timeout);
            let max_iterations = self.options.max_iterations.max(1);

            for iteration in 0..max_iterations {
                let deadline_passed = deadline.is_some_and(|d| Instant::now() >= d);
                if cancel.is_cancelled() || deadline_passed {
                    tracing::info!(iteration, deadline_passed, "Run cancelled at checkpoint");
                    ctx.advance(PhaseEvent::CancelRequested);
                    return ctx.into_result(
                        CANCELLED_MESSAGE.to_string(),
                        false,
                        TerminationReason::Cancelled,
                    );
                }

                let started_at = Utc::now();
                let timer = Instant::now();

                let action = self.plan_iteration(&ctx).await;
                ctx.advance(PhaseEvent::PlanReady);
                tracing::info!(
                    iteration,
                    sources = ?action.source_names,
                    query = %action.query,
                    "Executing retrieval action"
                );

                let (lists, failures) = self.retrieve(&action).await;
                ctx.advance(PhaseEvent::EvidenceReady);

                let evidence_ids = self.fuse_into_pool(&mut ctx, &action, lists);

                let evaluation = self.evaluate_pool(&ctx).await;
                let sufficient = evaluation.verdict.is_sufficient();
                tracing::info!(
                    iteration,
                    score = evaluation.score,
                    sufficient,
                    evidence_total = ctx.pool().len(),
                    "Accumulated evidence evaluated"
                );

                ctx.push_record(IterationRecord {
                    index: iteration,
                    action,
                    evidence_ids,
                    failures,
                    evaluation,
                    started_at,
                    duration_ms: timer.elapsed().as_millis() as u64,
                });

                if sufficient {
                    ctx.advance(PhaseEvent::ThresholdMet);
                    return self.finish_answered(ctx).await;
                }

                if iteration + 1 == max_iterations {
                    ctx.advance(PhaseEvent::BudgetExhausted);
                } else {
                    ctx.advance(PhaseEvent::NeedsMoreEvidence);
                }
            }

            self.finish_exhausted(ctx).await
        }
        .instrument(span)
        .await
    }

    /// Ask the planner for the next action, absorbing planner failures
    async fn plan_iteration(&self, ctx: &OrchestrationContext) -> PlannedAction {
        match self.planner.plan(ctx.question(), ctx.records()).await {
            Ok(action) if !action.source_names.is_empty() => action,
            Ok(_) => {
                tracing::warn!("Planner produced no sources, using fallback action");
                self.fallback_action(ctx.question()).await
            }
            Err(error) => {
                tracing::warn!(%error, "Planner failed, using fallback action");
                self.fallback_action(ctx.question()).await
            }
        }
    }

    async fn fallback_action(&self, question: &Question) -> PlannedAction {
        match self.registry.default_source_name().await {
            Some(source) => PlannedAction::fallback(question, source),
            // With nothing registered the iteration proceeds empty-handed
            None => PlannedAction::new(Vec::new(), question.text(), "No sources registered"),
        }
    }

    /// Fan out the planned source calls concurrently and fan back in
    ///
    /// Each call carries its own timeout; a failed or timed-out source
    /// contributes an empty list and a recorded failure instead of
    /// stalling the loop. Failures are not retried within the iteration.
    async fn retrieve(
        &self,
        action: &PlannedAction,
    ) -> (Vec<Vec<EvidenceItem>>, Vec<SourceFailure>) {
        let limit = self.options.source_limit;
        let timeout = self.options.source_timeout;

        let calls = action.source_names.iter().map(|name| {
            let name = name.clone();
            let query = action.query.clone();
            let registry = Arc::clone(&self.registry);

            async move {
                let source = match registry.get(&name).await {
                    Some(source) => source,
                    None => {
                        let error = DomainError::not_found(format!(
                            "No retrieval source registered as '{}'",
                            name
                        ));
                        return (name, Err(error));
                    }
                };

                match tokio::time::timeout(timeout, source.search(&query, limit)).await {
                    Ok(Ok(items)) => (name, Ok(items)),
                    Ok(Err(error)) => (name, Err(error)),
                    Err(_) => {
                        let error =
                            DomainError::source_timeout(&name, timeout.as_millis() as u64);
                        (name, Err(error))
                    }
                }
            }
        });

        let mut lists = Vec::with_capacity(action.source_names.len());
        let mut failures = Vec::new();

        for (name, outcome) in join_all(calls).await {
            match outcome {
                Ok(items) => lists.push(items),
                Err(error) => {
                    tracing::warn!(source = %name, %error, "Retrieval failed, contributing no evidence");
                    failures.push(SourceFailure::new(name, error.to_string()));
                    lists.push(Vec::new());
                }
            }
        }

        (lists, failures)
    }

    /// Fuse this iteration's lists and merge them into the run's pool
    ///
    /// Returns the ids retrieved this iteration in fused order.
    fn fuse_into_pool(
        &self,
        ctx: &mut OrchestrationContext,
        action: &PlannedAction,
        lists: Vec<Vec<EvidenceItem>>,
    ) -> Vec<EvidenceId> {
        let weights: Vec<f64> = action
            .source_names
            .iter()
            .map(|name| self.options.weight_for(name))
            .collect();

        let fused = match fuse(&lists, &weights, &self.options.fusion) {
            Ok(fused) => fused,
            Err(error) => {
                tracing::error!(%error, "Fusion failed, treating iteration as empty");
                Vec::new()
            }
        };

        let evidence_ids: Vec<EvidenceId> =
            fused.iter().map(|entry| entry.item.id.clone()).collect();
        let added = ctx
            .pool_mut()
            .extend(fused.into_iter().map(|entry| entry.item));

        tracing::debug!(
            retrieved = evidence_ids.len(),
            new = added,
            total = ctx.pool().len(),
            "Evidence fused into pool"
        );

        evidence_ids
    }

    /// Judge the accumulated pool, absorbing evaluator failures
    async fn evaluate_pool(&self, ctx: &OrchestrationContext) -> Evaluation {
        let outcome = self
            .evaluator
            .evaluate(
                ctx.question(),
                ctx.pool().items(),
                self.options.sufficiency_threshold,
            )
            .await;

        match outcome {
            Ok(evaluation) => evaluation,
            Err(error) => {
                tracing::warn!(%error, "Evaluator failed, treating iteration as insufficient");
                Evaluation::judgment_failed("Sufficiency judgment unavailable")
            }
        }
    }

    async fn finish_answered(&self, ctx: OrchestrationContext) -> OrchestrationResult {
        let answer = match self
            .answer_generator
            .generate(ctx.question(), ctx.pool().items())
            .await
        {
            Ok(answer) => answer,
            Err(error) => {
                tracing::error!(%error, "Answer generation failed");
                GENERATION_FAILED_MESSAGE.to_string()
            }
        };

        ctx.into_result(answer, false, TerminationReason::Answered)
    }

    /// Budget exhausted: best-effort answer if any evidence exists
    async fn finish_exhausted(&self, ctx: OrchestrationContext) -> OrchestrationResult {
        if ctx.pool().is_empty() {
            tracing::info!("Budget exhausted with no evidence retrieved");
            return ctx.into_result(
                INSUFFICIENT_INFORMATION_MESSAGE.to_string(),
                false,
                TerminationReason::NoEvidenceFound,
            );
        }

        tracing::info!(
            evidence_total = ctx.pool().len(),
            "Budget exhausted, producing best-effort answer"
        );

        let answer = match self
            .answer_generator
            .generate(ctx.question(), ctx.pool().items())
            .await
        {
            Ok(answer) => format!("{}{}", BEST_EFFORT_PREFIX, answer),
            Err(error) => {
                tracing::error!(%error, "Best-effort answer generation failed");
                GENERATION_FAILED_MESSAGE.to_string()
            }
        };

        ctx.into_result(answer, true, TerminationReason::MaxIterationsReached)
    }
}
