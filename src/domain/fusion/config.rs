//! Fusion configuration

use serde::{Deserialize, Serialize};

/// Configuration for reciprocal rank fusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Rank decay constant `k` in `weight / (k + rank)`
    ///
    /// Lower values weight top positions more aggressively.
    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,
}

fn default_rrf_k() -> u32 {
    60
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: default_rrf_k(),
        }
    }
}

impl FusionConfig {
    /// Create a configuration with the standard decay constant
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rank decay constant (minimum 1)
    pub fn with_rrf_k(mut self, rrf_k: u32) -> Self {
        self.rrf_k = rrf_k.max(1);
        self
    }
}
