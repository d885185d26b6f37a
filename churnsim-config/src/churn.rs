//! Churn model configuration.
//!
//! Severity coefficients, decision threshold, epoch interval and the churn
//! mode. All values are fixed for the lifetime of a run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// When churn runs.
///
/// Deserializes from a name (`off`, `static`, `dynamic`) or from the numeric
/// churn levels `0`, `1`, `2`, quoted or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "ModeRepr")]
pub enum ChurnMode {
    /// No churn at all.
    #[default]
    #[serde(rename = "off")]
    Off,
    /// One pass at start-up.
    #[serde(rename = "static")]
    StaticOnce,
    /// A pass at start-up, then one every epoch interval.
    #[serde(rename = "dynamic")]
    DynamicRecurring,
}

impl ChurnMode {
    /// Maps the numeric churn levels (0, 1, 2) used by older run scripts.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(ChurnMode::Off),
            1 => Some(ChurnMode::StaticOnce),
            2 => Some(ChurnMode::DynamicRecurring),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Level(u64),
    Name(String),
}

impl TryFrom<ModeRepr> for ChurnMode {
    type Error = String;

    fn try_from(repr: ModeRepr) -> Result<Self, Self::Error> {
        match repr {
            ModeRepr::Level(level) => u8::try_from(level)
                .ok()
                .and_then(ChurnMode::from_level)
                .ok_or_else(|| format!("unknown churn level {level}, expected 0, 1 or 2")),
            ModeRepr::Name(name) => match name.trim().to_ascii_lowercase().as_str() {
                "off" | "0" => Ok(ChurnMode::Off),
                "static" | "static_once" | "1" => Ok(ChurnMode::StaticOnce),
                "dynamic" | "dynamic_recurring" | "2" => Ok(ChurnMode::DynamicRecurring),
                other => Err(format!(
                    "unknown churn mode '{other}', expected off, static or dynamic"
                )),
            },
        }
    }
}

/// When the random source is reseeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReseedPolicy {
    /// Seeded once from the configured seed.
    #[default]
    Once,
    /// Reseeded at the start of every pass with `(seed, epoch)`.
    PerEpoch,
    /// Reseeded before every node from the wall-clock second. Draws taken in
    /// the same second repeat; not reproducible.
    WallClock,
}

/// Churn pressure coefficients per health band.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct SeverityCoefficients {
    /// Applied when availability `L <= 0.4`.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_degraded")]
    pub degraded: f64,

    /// Applied when `0.4 < L <= 0.7`.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_moderate")]
    pub moderate: f64,

    /// Applied when `L > 0.7`.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_healthy")]
    pub healthy: f64,
}

fn default_degraded() -> f64 {
    0.16
}
fn default_moderate() -> f64 {
    0.08
}
fn default_healthy() -> f64 {
    0.04
}

impl Default for SeverityCoefficients {
    fn default() -> Self {
        Self {
            degraded: default_degraded(),
            moderate: default_moderate(),
            healthy: default_healthy(),
        }
    }
}

/// Churn configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct ChurnConfig {
    #[serde(default)]
    pub mode: ChurnMode,

    /// Leading nodes (server, attacker, monitor roles) never churned.
    #[serde(default = "default_exclusion_count")]
    pub exclusion_count: usize,

    /// Virtual seconds between passes in dynamic mode.
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,

    /// Rounded churn probability at or above which a node churns out.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[validate(nested)]
    #[serde(default)]
    pub severity: SeverityCoefficients,

    #[serde(default)]
    pub reseed: ReseedPolicy,
}

fn default_exclusion_count() -> usize {
    1
}
fn default_interval_secs() -> f64 {
    20.0
}
fn default_threshold() -> f64 {
    0.04
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            mode: ChurnMode::default(),
            exclusion_count: default_exclusion_count(),
            interval_secs: default_interval_secs(),
            threshold: default_threshold(),
            severity: SeverityCoefficients::default(),
            reseed: ReseedPolicy::default(),
        }
    }
}

impl ChurnConfig {
    /// The epoch interval, or `None` when it is zero, negative or not finite.
    pub fn interval(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.interval_secs)
            .ok()
            .filter(|interval| !interval.is_zero())
    }
}
