use serde::{Deserialize, Serialize};

use crate::batch::DEFAULT_WORKERS;
use crate::scoring::ScoringConfig;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub scoring: Option<ScoringConfig>,
    #[serde(default)]
    pub batch: Option<BatchConfig>,
}

impl Config {
    pub fn scoring(&self) -> ScoringConfig {
        self.scoring.clone().unwrap_or_default()
    }

    pub fn workers(&self) -> usize {
        self.batch
            .as_ref()
            .and_then(|b| b.workers)
            .unwrap_or(DEFAULT_WORKERS)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Concurrent row workers, 1-16 (default: 8)
    #[serde(default)]
    pub workers: Option<usize>,
}
