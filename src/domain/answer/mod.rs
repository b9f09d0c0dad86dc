//! Final answer generation contract

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::evidence::EvidenceItem;
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::question::Question;
use crate::domain::DomainError;

/// Trait for synthesizing the final answer text from evidence
///
/// An external collaborator from the orchestrator's point of view; only
/// this contract matters. Implementations should cite the bracketed
/// evidence ids they used, so callers can attribute the answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync + Debug {
    async fn generate(
        &self,
        question: &Question,
        evidence: &[EvidenceItem],
    ) -> Result<String, DomainError>;
}

/// Configuration for the LLM-backed answer generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerGeneratorConfig {
    /// Model to use for answer generation
    pub model: String,
    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

impl AnswerGeneratorConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// LLM-backed answer generator
#[derive(Debug)]
pub struct LlmAnswerGenerator {
    provider: Arc<dyn LlmProvider>,
    config: AnswerGeneratorConfig,
}

impl LlmAnswerGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AnswerGeneratorConfig) -> Self {
        Self { provider, config }
    }

    fn build_prompt(&self, question: &Question, evidence: &[EvidenceItem]) -> String {
        let listing = evidence
            .iter()
            .map(|item| format!("[{}] {}", item.id, item.text))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Answer the question using only the evidence below. \
             Cite the bracketed id of each evidence item you rely on.\n\n\
             Question: {}\n\nEvidence:\n{}",
            question.text(),
            listing,
        )
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(
        &self,
        question: &Question,
        evidence: &[EvidenceItem],
    ) -> Result<String, DomainError> {
        let mut builder = LlmRequest::builder()
            .user(self.build_prompt(question, evidence))
            .temperature(self.config.temperature);

        if let Some(max_tokens) = self.config.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        let response = self.provider.chat(&self.config.model, builder.build()).await?;

        Ok(response.content().to_string())
    }
}
