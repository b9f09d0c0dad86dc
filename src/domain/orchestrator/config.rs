//! Run options for the orchestrator

use std::collections::HashMap;
use std::time::Duration;

use crate::domain::fusion::FusionConfig;

const DEFAULT_MAX_ITERATIONS: usize = 3;
const DEFAULT_SUFFICIENCY_THRESHOLD: u8 = 7;
const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_SOURCE_LIMIT: usize = 10;

/// Options governing a single orchestration run
///
/// The iteration cap and sufficiency threshold are deliberately runtime
/// configuration, never hardcoded at call sites.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Hard bound on loop iterations
    pub max_iterations: usize,
    /// Evaluator score at which evidence counts as sufficient (1-10)
    pub sufficiency_threshold: u8,
    /// Timeout applied to each individual source call
    pub source_timeout: Duration,
    /// Optional deadline for the whole run, checked between iterations
    pub run_timeout: Option<Duration>,
    /// Result limit requested from each source
    pub source_limit: usize,
    /// Rank fusion configuration
    pub fusion: FusionConfig,
    /// Per-source fusion weights; unlisted sources weigh 1.0
    pub source_weights: HashMap<String, f64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            sufficiency_threshold: DEFAULT_SUFFICIENCY_THRESHOLD,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            run_timeout: None,
            source_limit: DEFAULT_SOURCE_LIMIT,
            fusion: FusionConfig::default(),
            source_weights: HashMap::new(),
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration cap (minimum 1)
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Set the sufficiency threshold, clamped to 1..=10
    pub fn with_sufficiency_threshold(mut self, threshold: u8) -> Self {
        self.sufficiency_threshold = threshold.clamp(1, 10);
        self
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    /// Set the per-source result limit (minimum 1)
    pub fn with_source_limit(mut self, limit: usize) -> Self {
        self.source_limit = limit.max(1);
        self
    }

    pub fn with_fusion(mut self, fusion: FusionConfig) -> Self {
        self.fusion = fusion;
        self
    }

    /// Set the fusion weight for a named source; non-finite values are ignored
    pub fn with_source_weight(mut self, source: impl Into<String>, weight: f64) -> Self {
        if weight.is_finite() {
            self.source_weights.insert(source.into(), weight);
        } else {
            tracing::warn!(weight, "Ignoring non-finite source weight");
        }
        self
    }

    /// Fusion weight for a source, defaulting to 1.0
    pub fn weight_for(&self, source: &str) -> f64 {
        self.source_weights.get(source).copied().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RunOptions::default();
        assert_eq!(options.max_iterations, 3);
        assert_eq!(options.sufficiency_threshold, 7);
        assert_eq!(options.source_timeout, Duration::from_secs(10));
        assert_eq!(options.source_limit, 10);
        assert!(options.run_timeout.is_none());
    }

    #[test]
    fn test_threshold_clamped() {
        assert_eq!(RunOptions::new().with_sufficiency_threshold(0).sufficiency_threshold, 1);
        assert_eq!(RunOptions::new().with_sufficiency_threshold(15).sufficiency_threshold, 10);
    }

    #[test]
    fn test_iteration_floor() {
        assert_eq!(RunOptions::new().with_max_iterations(0).max_iterations, 1);
    }

    #[test]
    fn test_weight_lookup() {
        let options = RunOptions::new()
            .with_source_weight("web", 2.5)
            .with_source_weight("broken", f64::INFINITY);

        assert_eq!(options.weight_for("web"), 2.5);
        assert_eq!(options.weight_for("local"), 1.0);
        assert_eq!(options.weight_for("broken"), 1.0);
    }
}
