//! Retrieval action planning

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::judgment::parse_judgment;
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::orchestrator::record::IterationRecord;
use crate::domain::question::Question;
use crate::domain::retrieval::SourceRegistry;
use crate::domain::DomainError;

/// The next retrieval action: which sources to query, and with what
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedAction {
    pub source_names: Vec<String>,
    pub query: String,
    pub rationale: String,
}

impl PlannedAction {
    pub fn new(
        source_names: Vec<String>,
        query: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            source_names,
            query: query.into(),
            rationale: rationale.into(),
        }
    }

    /// The first-iteration action: the question verbatim against one source
    pub fn initial(question: &Question, source: impl Into<String>) -> Self {
        Self::new(
            vec![source.into()],
            question.text(),
            "Initial retrieval against the default source",
        )
    }

    /// Conservative action used when planning itself fails
    pub fn fallback(question: &Question, source: impl Into<String>) -> Self {
        Self::new(
            vec![source.into()],
            question.text(),
            "Fallback: retrying the default source with the original question",
        )
    }

    /// Key identifying the (sources, query) pair for repeat detection
    fn repeat_key(&self) -> (Vec<String>, String) {
        let mut sources = self.source_names.clone();
        sources.sort();
        (sources, self.query.clone())
    }
}

/// Trait for deciding the next retrieval action
///
/// The full iteration history arrives on every call so implementations
/// can avoid repeating a strategy that already came back insufficient.
#[async_trait]
pub trait Planner: Send + Sync + Debug {
    async fn plan(
        &self,
        question: &Question,
        history: &[IterationRecord],
    ) -> Result<PlannedAction, DomainError>;
}

/// Configuration for the LLM-backed planner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Model to use for the planning call
    pub model: String,
    /// Temperature for the planning call
    #[serde(default)]
    pub temperature: f32,
    /// Custom planning prompt template
    /// Available variables: ${question}, ${sources}, ${history}
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl PlannerConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            prompt: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Get the default planning prompt
    pub fn default_prompt() -> &'static str {
        r#"You are planning the next retrieval attempt for a question-answering system.

Question: ${question}

Available retrieval sources: ${sources}

Previous attempts:
${history}

The evidence gathered so far was judged insufficient. Choose which source(s) to
query next and with what query. Do not repeat a source and query combination
that was already tried; rewrite the query with more specific terms, or switch
to a source that has not been tried yet.

Respond with ONLY a JSON object in this exact format:
{"sources": ["<source name>"], "query": "<search query>", "rationale": "<why this action>"}"#
    }

    /// Get the planning prompt to use
    pub fn get_prompt(&self) -> &str {
        match &self.prompt {
            Some(prompt) => prompt.as_str(),
            None => Self::default_prompt(),
        }
    }
}

/// Expected shape of the planner's judgment reply
#[derive(Debug, Deserialize)]
struct PlanJudgment {
    sources: Vec<String>,
    query: String,
    #[serde(default)]
    rationale: String,
}

/// LLM-backed planner
///
/// The first call never consults the model: the original question text
/// goes verbatim against the first-registered (lowest-cost) source.
/// Later calls prompt the model with the full attempt history and
/// locally enforce the no-repeat rule on whatever comes back.
#[derive(Debug)]
pub struct LlmPlanner {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<SourceRegistry>,
    config: PlannerConfig,
}

impl LlmPlanner {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        registry: Arc<SourceRegistry>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            provider,
            registry,
            config,
        }
    }

    async fn default_source(&self) -> Result<String, DomainError> {
        self.registry
            .default_source_name()
            .await
            .ok_or_else(|| DomainError::configuration("No retrieval sources registered"))
    }

    fn build_prompt(
        &self,
        question: &Question,
        sources: &[String],
        history: &[IterationRecord],
    ) -> String {
        let attempts = history
            .iter()
            .map(|record| {
                let missing = record
                    .evaluation
                    .missing_info
                    .as_deref()
                    .unwrap_or("not stated");
                format!(
                    "{}. sources={:?} query={:?} -> score {}/10, missing: {}",
                    record.index + 1,
                    record.action.source_names,
                    record.action.query,
                    record.evaluation.score,
                    missing,
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        self.config
            .get_prompt()
            .replace("${question}", question.text())
            .replace("${sources}", &sources.join(", "))
            .replace("${history}", &attempts)
    }

    /// Drop unknown sources, defaulting to the cheapest one if none remain
    fn sanitize_sources(
        &self,
        proposed: Vec<String>,
        registered: &[String],
        default: &str,
    ) -> Vec<String> {
        let known: HashSet<&String> = registered.iter().collect();
        let mut seen = HashSet::new();
        let mut sources: Vec<String> = proposed
            .into_iter()
            .filter(|name| known.contains(name) && seen.insert(name.clone()))
            .collect();

        if sources.is_empty() {
            sources.push(default.to_string());
        }

        sources
    }

    /// Enforce the no-repeat rule against already-failed attempts
    fn avoid_repeat(
        &self,
        mut action: PlannedAction,
        history: &[IterationRecord],
        registered: &[String],
    ) -> PlannedAction {
        let failed_keys: HashSet<(Vec<String>, String)> = history
            .iter()
            .filter(|record| !record.evaluation.verdict.is_sufficient())
            .map(|record| record.action.repeat_key())
            .collect();

        if !failed_keys.contains(&action.repeat_key()) {
            return action;
        }

        let tried: HashSet<&String> = action.source_names.iter().collect();
        if let Some(unused) = registered.iter().find(|name| !tried.contains(name)) {
            tracing::debug!(source = %unused, "Plan repeated a failed attempt, switching source");
            action.source_names = vec![unused.clone()];
            action.rationale = format!(
                "{} (switched to untried source '{}')",
                action.rationale, unused
            );
        }

        action
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(
        &self,
        question: &Question,
        history: &[IterationRecord],
    ) -> Result<PlannedAction, DomainError> {
        let default = self.default_source().await?;

        if history.is_empty() {
            return Ok(PlannedAction::initial(question, default));
        }

        let registered = self.registry.source_names().await;
        let prompt = self.build_prompt(question, &registered, history);
        let request = LlmRequest::builder()
            .user(prompt)
            .temperature(self.config.temperature)
            .build();

        let response = self.provider.chat(&self.config.model, request).await?;

        let judgment = match parse_judgment::<PlanJudgment>(response.content()) {
            Ok(judgment) => judgment,
            Err(error) => {
                tracing::warn!(%error, "Planner judgment was unparseable, using fallback action");
                return Ok(PlannedAction::fallback(question, default));
            }
        };

        let sources = self.sanitize_sources(judgment.sources, &registered, &default);
        let query = if judgment.query.trim().is_empty() {
            question.text().to_string()
        } else {
            judgment.query.trim().to_string()
        };

        let action = PlannedAction::new(sources, query, judgment.rationale);

        Ok(self.avoid_repeat(action, history, &registered))
    }
}


#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::evaluator::Evaluation;
    use crate::domain::llm::MockLlmProvider;
    use crate::domain::retrieval::MockRetrievalSource;

    fn question() -> Question {
        Question::new("What is the capital of France?").unwrap()
    }

    async fn registry_with(names: &[&str]) -> Arc<SourceRegistry> {
        let registry = Arc::new(SourceRegistry::new());
        for name in names {
            registry
                .register(Arc::new(MockRetrievalSource::new(*name)))
                .await;
        }
        registry
    }

    fn insufficient_record(index: usize, sources: &[&str], query: &str) -> IterationRecord {
        IterationRecord {
            index,
            action: PlannedAction::new(
                sources.iter().map(|s| s.to_string()).collect(),
                query,
                "test",
            ),
            evidence_ids: Vec::new(),
            failures: Vec::new(),
            evaluation: Evaluation::from_score(3, 7, "weak", Some("population data".to_string())),
            started_at: Utc::now(),
            duration_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_first_call_skips_the_model() {
        // Provider configured to fail: proves the first plan is local
        let provider = Arc::new(MockLlmProvider::new("mock").with_error("must not be called"));
        let registry = registry_with(&["local", "web"]).await;
        let planner = LlmPlanner::new(provider, registry, PlannerConfig::new("test-model"));

        let action = planner.plan(&question(), &[]).await.unwrap();

        assert_eq!(action.source_names, vec!["local"]);
        assert_eq!(action.query, "What is the capital of France?");
    }

    #[tokio::test]
    async fn test_no_sources_registered_is_an_error() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply("{}"));
        let registry = Arc::new(SourceRegistry::new());
        let planner = LlmPlanner::new(provider, registry, PlannerConfig::new("test-model"));

        let result = planner.plan(&question(), &[]).await;
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_replanning_follows_the_model() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply(
            r#"{"sources": ["web"], "query": "France capital city name", "rationale": "local index lacked coverage"}"#,
        ));
        let registry = registry_with(&["local", "web"]).await;
        let planner = LlmPlanner::new(provider, registry, PlannerConfig::new("test-model"));

        let history = vec![insufficient_record(0, &["local"], "What is the capital of France?")];
        let action = planner.plan(&question(), &history).await.unwrap();

        assert_eq!(action.source_names, vec!["web"]);
        assert_eq!(action.query, "France capital city name");
    }

    #[tokio::test]
    async fn test_unknown_sources_dropped() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply(
            r#"{"sources": ["wikipedia", "web"], "query": "capital France", "rationale": "try elsewhere"}"#,
        ));
        let registry = registry_with(&["local", "web"]).await;
        let planner = LlmPlanner::new(provider, registry, PlannerConfig::new("test-model"));

        let history = vec![insufficient_record(0, &["local"], "What is the capital of France?")];
        let action = planner.plan(&question(), &history).await.unwrap();

        assert_eq!(action.source_names, vec!["web"]);
    }

    #[tokio::test]
    async fn test_empty_query_falls_back_to_question() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply(
            r#"{"sources": ["web"], "query": "   ", "rationale": "rewrite went wrong"}"#,
        ));
        let registry = registry_with(&["local", "web"]).await;
        let planner = LlmPlanner::new(provider, registry, PlannerConfig::new("test-model"));

        let history = vec![insufficient_record(0, &["local"], "something else")];
        let action = planner.plan(&question(), &history).await.unwrap();

        assert_eq!(action.query, "What is the capital of France?");
    }

    #[tokio::test]
    async fn test_repeated_failed_plan_switches_source() {
        // The model proposes exactly the pair that already failed
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply(
            r#"{"sources": ["local"], "query": "What is the capital of France?", "rationale": "try again"}"#,
        ));
        let registry = registry_with(&["local", "web"]).await;
        let planner = LlmPlanner::new(provider, registry, PlannerConfig::new("test-model"));

        let history = vec![insufficient_record(0, &["local"], "What is the capital of France?")];
        let action = planner.plan(&question(), &history).await.unwrap();

        assert_eq!(action.source_names, vec!["web"]);
    }

    #[tokio::test]
    async fn test_unparseable_plan_falls_back() {
        let provider =
            Arc::new(MockLlmProvider::new("mock").with_reply("let me think about this..."));
        let registry = registry_with(&["local", "web"]).await;
        let planner = LlmPlanner::new(provider, registry, PlannerConfig::new("test-model"));

        let history = vec![insufficient_record(0, &["local"], "older query")];
        let action = planner.plan(&question(), &history).await.unwrap();

        assert_eq!(action.source_names, vec!["local"]);
        assert_eq!(action.query, "What is the capital of France?");
    }

    #[tokio::test]
    async fn test_history_rendered_into_prompt() {
        let provider = Arc::new(MockLlmProvider::new("mock").with_reply(
            r#"{"sources": ["web"], "query": "next", "rationale": "r"}"#,
        ));
        let registry = registry_with(&["local", "web"]).await;
        let planner =
            LlmPlanner::new(provider.clone(), registry, PlannerConfig::new("test-model"));

        let history = vec![insufficient_record(0, &["local"], "first query")];
        planner.plan(&question(), &history).await.unwrap();

        let requests = provider.requests();
        let prompt = requests[0].messages[0].content().to_string();
        assert!(prompt.contains("first query"));
        assert!(prompt.contains("score 3/10"));
        assert!(prompt.contains("population data"));
        assert!(prompt.contains("local, web"));
    }
}
