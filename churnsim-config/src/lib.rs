//! # churnsim Configuration System
//!
//! Hierarchical configuration for churn simulation runs.
//!
//! ## Features
//! - **Unified Configuration**: topology, churn, run and telemetry settings in one document
//! - **Validation**: field ranges plus cross-section rules, checked on every load
//! - **Environment Awareness**: `CHURNSIM_ENV` overlays and `CHURNSIM_*` overrides

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod churn;
mod error;
mod simulation;
mod telemetry;
mod topology;
mod validation;

pub use churn::{ChurnConfig, ChurnMode, ReseedPolicy, SeverityCoefficients};
pub use error::ConfigError;
pub use simulation::SimulationConfig;
pub use telemetry::TelemetryConfig;
pub use topology::{DeviceType, TopologyConfig};

const BASE_FILE: &str = "config/churnsim.yaml";
const ENV_PREFIX: &str = "CHURNSIM_";

/// Top‑level configuration container for a churn simulation run.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default, PartialEq)]
#[validate(schema(function = validation::validate_eligible_range))]
pub struct ChurnsimConfig {
    /// Node count and device type.
    #[validate(nested)]
    #[serde(default)]
    pub topology: TopologyConfig,

    /// Churn model and scheduling parameters.
    #[validate(nested)]
    #[serde(default)]
    pub churn: ChurnConfig,

    /// Seed and run length.
    #[validate(nested)]
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Logging and metrics.
    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl ChurnsimConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default Values
    /// 2. `config/churnsim.yaml` - Base settings. If missing, defaults are used.
    /// 3. `config/<CHURNSIM_ENV>.yaml` - Environment‑specific overrides.
    /// 4. `CHURNSIM_*` environment variables (`__` separates sections).
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(ChurnsimConfig::default()));

        if Path::new(BASE_FILE).exists() {
            figment = figment.merge(Yaml::file(BASE_FILE));
        }

        if let Ok(env) = std::env::var("CHURNSIM_ENV") {
            let env_file = format!("config/{}.yaml", env);
            if Path::new(&env_file).exists() {
                figment = figment.merge(Yaml::file(env_file));
            }
        }

        Self::finish(figment)
    }

    /// Load configuration from a specific file, still honoring `CHURNSIM_*`
    /// overrides. Sections missing from the file take their defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(path)));
        }

        let figment = Figment::from(Serialized::defaults(ChurnsimConfig::default()))
            .merge(Yaml::file(path));
        Self::finish(figment)
    }

    /// Re-runs validation, e.g. after command-line overrides were applied.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    fn finish(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract::<Self>()
            .map_err(ConfigError::from)
            .and_then(Self::validated)
    }
}
