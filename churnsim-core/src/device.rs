//! ## churnsim-core::device
//! **Device availability capability**
//!
//! Churn switches devices on and off without knowing what they are. Each
//! device model that supports it implements [`DeviceAvailability`]; the
//! mapping from a topology device to that capability is made once, in
//! [`DeviceHandle::bind`], and never rediscovered per call.
//!
//! Handles are weak: the topology owns its devices and the churn subsystem
//! must never keep one alive.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::network::{
    CsmaNetDevice, DeviceError, LoopbackNetDevice, PhyState, WifiNetDevice,
};
use crate::SimulationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Csma,
    Wifi,
    Loopback,
    /// Instrumented or externally provided devices.
    Custom,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Csma => "csma",
            DeviceKind::Wifi => "wifi",
            DeviceKind::Loopback => "loopback",
            DeviceKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// The one capability set churn needs from a device.
///
/// `enable` and `disable` are idempotent: calling either on a device already
/// in the requested state does nothing and succeeds.
pub trait DeviceAvailability: Send + Sync {
    fn kind(&self) -> DeviceKind;

    fn is_enabled(&self) -> bool;

    fn enable(&self) -> Result<(), DeviceError>;

    fn disable(&self) -> Result<(), DeviceError>;
}

impl DeviceAvailability for CsmaNetDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Csma
    }

    fn is_enabled(&self) -> bool {
        self.is_send_enabled() && self.is_receive_enabled()
    }

    fn enable(&self) -> Result<(), DeviceError> {
        self.set_send_enable(true);
        self.set_receive_enable(true);
        Ok(())
    }

    fn disable(&self) -> Result<(), DeviceError> {
        self.set_send_enable(false);
        self.set_receive_enable(false);
        Ok(())
    }
}

impl DeviceAvailability for WifiNetDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Wifi
    }

    fn is_enabled(&self) -> bool {
        !self.phy().is_state_off()
    }

    fn enable(&self) -> Result<(), DeviceError> {
        match self.phy().switch_from_off() {
            Err(DeviceError::NotOff(PhyState::Idle | PhyState::Sleep)) => Ok(()),
            other => other,
        }
    }

    fn disable(&self) -> Result<(), DeviceError> {
        match self.phy().switch_to_off() {
            Err(DeviceError::AlreadyOff) => Ok(()),
            other => other,
        }
    }
}

/// A device as the topology describes it.
#[derive(Clone, Debug)]
pub enum NetDevice {
    Csma(Arc<CsmaNetDevice>),
    Wifi(Arc<WifiNetDevice>),
    Loopback(Arc<LoopbackNetDevice>),
}

impl NetDevice {
    pub fn kind(&self) -> DeviceKind {
        match self {
            NetDevice::Csma(_) => DeviceKind::Csma,
            NetDevice::Wifi(_) => DeviceKind::Wifi,
            NetDevice::Loopback(_) => DeviceKind::Loopback,
        }
    }
}

/// Non-owning reference from a node to its device's availability controls.
#[derive(Clone)]
pub struct DeviceHandle {
    kind: DeviceKind,
    device: Weak<dyn DeviceAvailability>,
}

impl DeviceHandle {
    /// Maps a topology device onto the availability capability.
    ///
    /// # Errors
    /// `UnsupportedDevice` when the device kind has no availability controls.
    pub fn bind(node: usize, device: &NetDevice) -> Result<Self, SimulationError> {
        let available: Arc<dyn DeviceAvailability> = match device {
            NetDevice::Csma(csma) => csma.clone(),
            NetDevice::Wifi(wifi) => wifi.clone(),
            NetDevice::Loopback(_) => {
                return Err(SimulationError::UnsupportedDevice {
                    node,
                    kind: device.kind(),
                })
            }
        };
        Ok(Self::from_device(&available))
    }

    pub fn from_device(device: &Arc<dyn DeviceAvailability>) -> Self {
        Self {
            kind: device.kind(),
            device: Arc::downgrade(device),
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Upgrades to the live device.
    ///
    /// # Errors
    /// `DeviceAccess` once the owning topology has dropped the device.
    pub fn resolve(&self, node: usize) -> Result<Arc<dyn DeviceAvailability>, SimulationError> {
        self.device
            .upgrade()
            .ok_or(SimulationError::DeviceAccess { node })
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("kind", &self.kind)
            .field("live", &(self.device.strong_count() > 0))
            .finish()
    }
}

/// Device handles aligned with node indices. Nodes without a handle (exempt
/// roles, or nodes the topology left bare) are empty slots.
#[derive(Clone, Debug, Default)]
pub struct DeviceList {
    slots: Vec<Option<DeviceHandle>>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `handle` to `node`, replacing any previous one.
    pub fn attach(&mut self, node: usize, handle: DeviceHandle) {
        if self.slots.len() <= node {
            self.slots.resize(node + 1, None);
        }
        self.slots[node] = Some(handle);
    }

    pub fn get(&self, node: usize) -> Option<&DeviceHandle> {
        self.slots.get(node).and_then(Option::as_ref)
    }

    /// # Errors
    /// `DeviceAccess` when the node has no handle or its device is gone.
    pub fn resolve(&self, node: usize) -> Result<Arc<dyn DeviceAvailability>, SimulationError> {
        self.get(node)
            .ok_or(SimulationError::DeviceAccess { node })?
            .resolve(node)
    }

    /// Number of slots, i.e. one past the highest attached node.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

impl FromIterator<DeviceHandle> for DeviceList {
    fn from_iter<I: IntoIterator<Item = DeviceHandle>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().map(Some).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wired_disable_suppresses_both_directions() {
        let csma = CsmaNetDevice::new();
        csma.disable().unwrap();
        assert!(!csma.is_send_enabled());
        assert!(!csma.is_receive_enabled());
        assert!(!csma.is_enabled());
        csma.enable().unwrap();
        assert!(csma.is_enabled());
    }

    #[test]
    fn half_open_wired_device_is_not_enabled() {
        let csma = CsmaNetDevice::new();
        csma.set_receive_enable(false);
        assert!(!csma.is_enabled());
    }

    #[test]
    fn wireless_transitions_are_idempotent() {
        let wifi = WifiNetDevice::new();
        wifi.enable().unwrap();
        assert!(wifi.is_enabled());

        wifi.disable().unwrap();
        wifi.disable().unwrap();
        assert!(!wifi.is_enabled());
        assert_eq!(wifi.phy().state(), PhyState::Off);

        wifi.enable().unwrap();
        wifi.enable().unwrap();
        assert_eq!(wifi.phy().state(), PhyState::Idle);
    }

    #[test]
    fn sleeping_radio_counts_as_enabled() {
        let wifi = WifiNetDevice::new();
        wifi.phy().switch_to_sleep().unwrap();
        assert!(wifi.is_enabled());
        wifi.enable().unwrap();
        assert_eq!(wifi.phy().state(), PhyState::Sleep);
    }

    #[test]
    fn bind_maps_supported_kinds() {
        let wifi = NetDevice::Wifi(Arc::new(WifiNetDevice::new()));
        let handle = DeviceHandle::bind(1, &wifi).unwrap();
        assert_eq!(handle.kind(), DeviceKind::Wifi);

        let device = handle.resolve(1).unwrap();
        device.disable().unwrap();
        match &wifi {
            NetDevice::Wifi(inner) => assert!(inner.phy().is_state_off()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn bind_rejects_loopback() {
        let lo = NetDevice::Loopback(Arc::new(LoopbackNetDevice::new()));
        let err = DeviceHandle::bind(3, &lo).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::UnsupportedDevice {
                node: 3,
                kind: DeviceKind::Loopback
            }
        ));
        assert!(err.is_configuration());
    }

    #[test]
    fn device_list_reports_missing_slots() {
        let csma = NetDevice::Csma(Arc::new(CsmaNetDevice::new()));
        let mut devices = DeviceList::new();
        assert!(devices.is_empty());
        devices.attach(3, DeviceHandle::bind(3, &csma).unwrap());

        assert_eq!(devices.len(), 4);
        assert!(devices.get(1).is_none());
        assert!(devices.resolve(3).is_ok());
        assert!(matches!(
            devices.resolve(1),
            Err(SimulationError::DeviceAccess { node: 1 })
        ));
        assert!(matches!(
            devices.resolve(9),
            Err(SimulationError::DeviceAccess { node: 9 })
        ));
    }

    #[test]
    fn handle_does_not_keep_device_alive() {
        let csma = NetDevice::Csma(Arc::new(CsmaNetDevice::new()));
        let handle = DeviceHandle::bind(2, &csma).unwrap();
        assert!(handle.resolve(2).is_ok());

        drop(csma);
        assert!(matches!(
            handle.resolve(2),
            Err(SimulationError::DeviceAccess { node: 2 })
        ));
    }
}
