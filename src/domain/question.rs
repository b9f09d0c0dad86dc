//! Question input for an orchestration run

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Role of a prior conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A single prior turn of conversation context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
        }
    }
}

/// The question driving a run, with optional conversation history
///
/// Created once per orchestrator invocation and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    history: Vec<ConversationTurn>,
}

impl Question {
    /// Create a new question; the text must be non-empty
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();

        if text.trim().is_empty() {
            return Err(DomainError::validation("Question text must not be empty"));
        }

        Ok(Self {
            text,
            history: Vec::new(),
        })
    }

    /// Attach prior conversation turns
    pub fn with_history(mut self, history: Vec<ConversationTurn>) -> Self {
        self.history = history;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }
}
