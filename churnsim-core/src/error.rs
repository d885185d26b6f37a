use thiserror::Error;

use crate::device::DeviceKind;
use crate::network::DeviceError;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported device type {kind} on node {node}")]
    UnsupportedDevice { node: usize, kind: DeviceKind },

    #[error(
        "No eligible nodes: exclusion count {exclusion_count} covers all {node_count} nodes"
    )]
    EmptyEligibleRange {
        exclusion_count: usize,
        node_count: usize,
    },

    #[error("Epoch interval must be a positive number of seconds, got {0}")]
    InvalidInterval(f64),

    #[error("Node {node} has no resolvable device")]
    DeviceAccess { node: usize },

    #[error("Device on node {node} rejected transition: {source}")]
    Device {
        node: usize,
        #[source]
        source: DeviceError,
    },
}

impl SimulationError {
    /// Configuration errors are raised before any virtual time elapses.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SimulationError::Config(_)
                | SimulationError::UnsupportedDevice { .. }
                | SimulationError::EmptyEligibleRange { .. }
                | SimulationError::InvalidInterval(_)
        )
    }
}
