use std::time::Duration;

use serde::Deserialize;

use crate::domain::fusion::FusionConfig;
use crate::domain::orchestrator::RunOptions;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Orchestrator defaults, overridable per run
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_sufficiency_threshold")]
    pub sufficiency_threshold: u8,
    #[serde(default = "default_source_timeout_secs")]
    pub source_timeout_secs: u64,
    #[serde(default = "default_source_limit")]
    pub source_limit: usize,
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,
}

fn default_max_iterations() -> usize {
    3
}

fn default_sufficiency_threshold() -> u8 {
    7
}

fn default_source_timeout_secs() -> u64 {
    10
}

fn default_source_limit() -> usize {
    10
}

fn default_rrf_k() -> u32 {
    60
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            sufficiency_threshold: default_sufficiency_threshold(),
            source_timeout_secs: default_source_timeout_secs(),
            source_limit: default_source_limit(),
            rrf_k: default_rrf_k(),
        }
    }
}

impl OrchestratorSettings {
    /// Translate the settings into per-run options
    pub fn run_options(&self) -> RunOptions {
        RunOptions::new()
            .with_max_iterations(self.max_iterations)
            .with_sufficiency_threshold(self.sufficiency_threshold)
            .with_source_timeout(Duration::from_secs(self.source_timeout_secs))
            .with_source_limit(self.source_limit)
            .with_fusion(FusionConfig::new().with_rrf_k(self.rrf_k))
    }
}

/// Models used for judgment calls and answer generation
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_judgment_model")]
    pub judgment_model: String,
    #[serde(default = "default_answer_model")]
    pub answer_model: String,
}

fn default_judgment_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_answer_model() -> String {
    "gpt-4o".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            judgment_model: default_judgment_model(),
            answer_model: default_answer_model(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
