//! Run-level simulation parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct SimulationConfig {
    /// Seed for the churn random source.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Virtual run length in seconds.
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_total_time_secs")]
    pub total_time_secs: f64,
}

fn default_seed() -> u64 {
    42
}

fn default_total_time_secs() -> f64 {
    600.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            total_time_secs: default_total_time_secs(),
        }
    }
}

impl SimulationConfig {
    /// Run length, or `None` when it is not a positive finite number.
    pub fn total_time(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.total_time_secs)
            .ok()
            .filter(|total| !total.is_zero())
    }
}
