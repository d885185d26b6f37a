//! Topology configuration.
//!
//! Only what the churn run needs from the network: how many nodes there are
//! and what kind of device each one carries.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Device installed on every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Wired CSMA LAN.
    Csma,
    /// Ad-hoc Wi-Fi.
    #[default]
    Wifi,
    /// Loopback only; churn cannot drive it.
    Loopback,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct TopologyConfig {
    /// Total nodes, including the exempt prefix.
    #[validate(range(min = 1, max = 100_000))]
    #[serde(default = "default_node_count")]
    pub node_count: usize,

    #[serde(default)]
    pub device: DeviceType,
}

fn default_node_count() -> usize {
    10
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            node_count: default_node_count(),
            device: DeviceType::default(),
        }
    }
}
