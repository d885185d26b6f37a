//! Custom validation functions for configuration.
//!
//! Cross-section rules that a single field's `#[validate]` attribute cannot
//! express.

use validator::ValidationError;

use crate::{ChurnMode, ChurnsimConfig};

/// With churn requested, at least one node must sit outside the exempt prefix.
pub fn validate_eligible_range(config: &ChurnsimConfig) -> Result<(), ValidationError> {
    if config.churn.mode != ChurnMode::Off
        && config.churn.exclusion_count >= config.topology.node_count
    {
        let mut error = ValidationError::new("empty_eligible_range");
        error.message = Some(
            format!(
                "exclusion_count ({}) must be smaller than node_count ({}) when churn is enabled",
                config.churn.exclusion_count, config.topology.node_count
            )
            .into(),
        );
        return Err(error);
    }
    Ok(())
}

/// Validate log level names accepted by the tracing filter.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
