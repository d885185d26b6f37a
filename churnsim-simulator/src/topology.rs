//! Simulated topology: one device per node, all of the configured kind.

use std::ops::Range;
use std::sync::Arc;

use tracing::debug;

use churnsim_config::{DeviceType, TopologyConfig};
use churnsim_core::device::{DeviceAvailability, DeviceHandle, DeviceList, NetDevice};
use churnsim_core::network::{CsmaNetDevice, LoopbackNetDevice, WifiNetDevice};
use churnsim_core::SimulationError;

/// Owns every node's device. Churn only ever holds weak handles into it.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    devices: Vec<NetDevice>,
}

impl Topology {
    pub fn build(config: &TopologyConfig) -> Self {
        let devices = (0..config.node_count)
            .map(|_| match config.device {
                DeviceType::Csma => NetDevice::Csma(Arc::new(CsmaNetDevice::new())),
                DeviceType::Wifi => NetDevice::Wifi(Arc::new(WifiNetDevice::new())),
                DeviceType::Loopback => NetDevice::Loopback(Arc::new(LoopbackNetDevice::new())),
            })
            .collect();
        debug!(node_count = config.node_count, device = ?config.device, "Topology built");
        Self { devices }
    }

    pub fn node_count(&self) -> usize {
        self.devices.len()
    }

    pub fn devices(&self) -> &[NetDevice] {
        &self.devices
    }

    /// Binds the devices of `nodes` to weak availability handles. Nodes
    /// outside the range get no handle.
    ///
    /// # Errors
    /// `UnsupportedDevice` for the first node whose device has no
    /// availability controls.
    pub fn device_list(&self, nodes: Range<usize>) -> Result<DeviceList, SimulationError> {
        let mut list = DeviceList::new();
        for node in nodes {
            if let Some(device) = self.devices.get(node) {
                list.attach(node, DeviceHandle::bind(node, device)?);
            }
        }
        Ok(list)
    }

    /// Nodes whose device currently accepts traffic.
    pub fn enabled_nodes(&self) -> usize {
        self.devices
            .iter()
            .filter(|device| match device {
                NetDevice::Csma(csma) => csma.is_enabled(),
                NetDevice::Wifi(wifi) => wifi.is_enabled(),
                NetDevice::Loopback(_) => true,
            })
            .count()
    }
}
