//! Evidence sufficiency evaluation

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::evidence::EvidenceItem;
use crate::domain::judgment::parse_judgment;
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::question::Question;
use crate::domain::DomainError;

/// Highest sufficiency score
pub const MAX_SCORE: u8 = 10;

/// Qualitative sufficiency judgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Sufficient,
    Insufficient,
}

impl Verdict {
    pub fn is_sufficient(&self) -> bool {
        matches!(self, Self::Sufficient)
    }
}

/// Result of judging accumulated evidence against the question
///
/// The score judges content adequacy on a 1-10 scale (0 is reserved for
/// the no-evidence and failed-judgment cases), independent of how the
/// evidence was ranked. The verdict is derived from the caller-supplied
/// threshold, never hardcoded here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: u8,
    pub verdict: Verdict,
    pub reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_info: Option<String>,
}

impl Evaluation {
    /// Build an evaluation from a score, deriving the verdict
    pub fn from_score(
        score: u8,
        threshold: u8,
        reasoning: impl Into<String>,
        missing_info: Option<String>,
    ) -> Self {
        let score = score.min(MAX_SCORE);
        let verdict = if score >= threshold {
            Verdict::Sufficient
        } else {
            Verdict::Insufficient
        };

        Self {
            score,
            verdict,
            reasoning: reasoning.into(),
            missing_info,
        }
    }

    /// The fixed evaluation for an empty evidence set
    pub fn no_evidence() -> Self {
        Self {
            score: 0,
            verdict: Verdict::Insufficient,
            reasoning: "No evidence has been retrieved".to_string(),
            missing_info: None,
        }
    }

    /// Conservative evaluation used when the judgment call fails
    pub fn judgment_failed(reason: impl Into<String>) -> Self {
        Self {
            score: 0,
            verdict: Verdict::Insufficient,
            reasoning: reason.into(),
            missing_info: None,
        }
    }
}

/// Trait for judging whether evidence suffices to answer a question
///
/// The threshold is orchestrator-level configuration and arrives as an
/// argument on every call.
#[async_trait]
pub trait Evaluator: Send + Sync + Debug {
    async fn evaluate(
        &self,
        question: &Question,
        evidence: &[EvidenceItem],
        threshold: u8,
    ) -> Result<Evaluation, DomainError>;
}

/// Configuration for the LLM-backed evaluator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Model to use for the judgment call
    pub model: String,
    /// Temperature for the judgment call (lower = more deterministic)
    #[serde(default)]
    pub temperature: f32,
    /// Custom judgment prompt template
    /// Available variables: ${question}, ${evidence}
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl EvaluatorConfig {
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

    /// Get the default judgment prompt
    pub fn default_prompt() -> &'static str {
        r#"You are judging whether retrieved evidence is sufficient to answer a question.

Question: ${question}

Evidence:
${evidence}

Rate the sufficiency of the evidence on a scale of 1 to 10, where:
- 1-3: irrelevant - the evidence does not help answer the question
- 4-6: partial - the evidence covers some of what is needed
- 7-8: mostly sufficient - the evidence answers the question with minor gaps
- 9-10: fully sufficient - the evidence completely answers the question

Respond with ONLY a JSON object in this exact format:
{"score": <number>, "reasoning": "<brief explanation>", "missing_info": "<what is still missing, or null>"}"#
    }

    /// Get the judgment prompt to use
    pub fn get_prompt(&self) -> &str {
        match &self.prompt {
            Some(prompt) => prompt.as_str(),
            None => Self::default_prompt(),
        }
    }
}

/// Expected shape of the evaluator's judgment reply
#[derive(Debug, Deserialize)]
struct EvaluationJudgment {
    score: i64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    missing_info: Option<String>,
}

/// LLM-backed evaluator
#[derive(Debug)]
pub struct LlmEvaluator {
    provider: Arc<dyn LlmProvider>,
    config: EvaluatorConfig,
}

impl LlmEvaluator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: EvaluatorConfig) -> Self {
        Self { provider, config }
    }

    fn build_prompt(&self, question: &Question, evidence: &[EvidenceItem]) -> String {
        let listing = evidence
            .iter()
            .map(|item| format!("[{}] {}", item.id, item.text))
            .collect::<Vec<_>>()
            .join("\n");

        self.config
            .get_prompt()
            .replace("${question}", question.text())
            .replace("${evidence}", &listing)
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        question: &Question,
        evidence: &[EvidenceItem],
        threshold: u8,
    ) -> Result<Evaluation, DomainError> {
        if evidence.is_empty() {
            return Ok(Evaluation::no_evidence());
        }

        let request = LlmRequest::builder()
            .user(self.build_prompt(question, evidence))
            .temperature(self.config.temperature)
            .build();

        let response = self.provider.chat(&self.config.model, request).await?;

        match parse_judgment::<EvaluationJudgment>(response.content()) {
            Ok(judgment) => {
                let score = judgment.score.clamp(0, i64::from(MAX_SCORE)) as u8;
                Ok(Evaluation::from_score(
                    score,
                    threshold,
                    judgment.reasoning,
                    judgment.missing_info,
                ))
            }
            Err(error) => {
                tracing::warn!(%error, "Evaluator judgment was unparseable, scoring as insufficient");
                Ok(Evaluation::judgment_failed(
                    "Sufficiency judgment could not be parsed",
                ))
            }
        }
    }
}

#[cfg(test)]
pub mod mock {
    use std::sync::Mutex;

    use super::*;

    /// Mock evaluator for testing
    ///
    /// Returns scripted scores call by call; once the script is
    /// exhausted the last score repeats. Records the evidence count seen
    /// on each call so tests can assert on accumulation.
    #[derive(Debug)]
    pub struct MockEvaluator {
        scripted: Mutex<Vec<u8>>,
        last_score: Mutex<Option<u8>>,
        error: Option<String>,
        evidence_counts: Mutex<Vec<usize>>,
    }

    impl MockEvaluator {
        pub fn new() -> Self {
            Self {
                scripted: Mutex::new(Vec::new()),
                last_score: Mutex::new(None),
                error: None,
                evidence_counts: Mutex::new(Vec::new()),
            }
        }

        /// Return the same score on every call
        pub fn with_score(self, score: u8) -> Self {
            *self.last_score.lock().unwrap() = Some(score);
            self
        }

        /// Return one scripted score per call, in order
        pub fn with_scripted_scores(self, scores: Vec<u8>) -> Self {
            {
                let mut scripted = self.scripted.lock().unwrap();
                *scripted = scores.into_iter().rev().collect();
            }
            self
        }

        pub fn with_error(mut self, error: impl Into<String>) -> Self {
            self.error = Some(error.into());
            self
        }

        /// Evidence counts observed on each call
        pub fn evidence_counts(&self) -> Vec<usize> {
            self.evidence_counts.lock().unwrap().clone()
        }
    }

    impl Default for MockEvaluator {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Evaluator for MockEvaluator {
        async fn evaluate(
            &self,
            _question: &Question,
            evidence: &[EvidenceItem],
            threshold: u8,
        ) -> Result<Evaluation, DomainError> {
            self.evidence_counts.lock().unwrap().push(evidence.len());

            if let Some(ref error) = self.error {
                return Err(DomainError::provider("mock_evaluator", error));
            }

            let score = {
                let mut scripted = self.scripted.lock().unwrap();
                match scripted.pop() {
                    Some(score) => {
                        *self.last_score.lock().unwrap() = Some(score);
                        score
                    }
                    None => self.last_score.lock().unwrap().unwrap_or(0),
                }
            };

            Ok(Evaluation::from_score(score, threshold, "Mock evaluation", None))
        }
    }
}
