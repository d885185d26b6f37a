use parking_lot::Mutex;

use super::DeviceError;

/// Radio state of a [`WifiPhy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhyState {
    Idle,
    Sleep,
    Off,
}

/// Physical layer of a wireless device.
///
/// Switching off an already-off PHY, or switching on a PHY that is not off,
/// is an illegal transition and is rejected.
#[derive(Debug)]
pub struct WifiPhy {
    state: Mutex<PhyState>,
}

impl Default for WifiPhy {
    fn default() -> Self {
        Self {
            state: Mutex::new(PhyState::Idle),
        }
    }
}

impl WifiPhy {
    pub fn state(&self) -> PhyState {
        *self.state.lock()
    }

    pub fn is_state_off(&self) -> bool {
        self.state() == PhyState::Off
    }

    pub fn switch_to_off(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if *state == PhyState::Off {
            return Err(DeviceError::AlreadyOff);
        }
        *state = PhyState::Off;
        Ok(())
    }

    pub fn switch_from_off(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if *state != PhyState::Off {
            return Err(DeviceError::NotOff(*state));
        }
        *state = PhyState::Idle;
        Ok(())
    }

    pub fn switch_to_sleep(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        if *state == PhyState::Off {
            return Err(DeviceError::PoweredDown(PhyState::Sleep));
        }
        *state = PhyState::Sleep;
        Ok(())
    }

    pub fn resume_from_sleep(&self) -> Result<(), DeviceError> {
        let mut state = self.state.lock();
        match *state {
            PhyState::Off => Err(DeviceError::PoweredDown(PhyState::Idle)),
            _ => {
                *state = PhyState::Idle;
                Ok(())
            }
        }
    }
}

/// Wireless device in an ad-hoc network.
#[derive(Debug, Default)]
pub struct WifiNetDevice {
    phy: WifiPhy,
}

impl WifiNetDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phy(&self) -> &WifiPhy {
        &self.phy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phy_starts_idle() {
        let device = WifiNetDevice::new();
        assert_eq!(device.phy().state(), PhyState::Idle);
        assert!(!device.phy().is_state_off());
    }

    #[test]
    fn double_switch_off_is_rejected() {
        let phy = WifiPhy::default();
        phy.switch_to_off().unwrap();
        assert_eq!(phy.switch_to_off(), Err(DeviceError::AlreadyOff));
        assert!(phy.is_state_off());
    }

    #[test]
    fn switch_from_off_requires_off() {
        let phy = WifiPhy::default();
        assert_eq!(
            phy.switch_from_off(),
            Err(DeviceError::NotOff(PhyState::Idle))
        );
        phy.switch_to_off().unwrap();
        phy.switch_from_off().unwrap();
        assert_eq!(phy.state(), PhyState::Idle);
    }

    #[test]
    fn sleeping_phy_can_be_switched_off() {
        let phy = WifiPhy::default();
        phy.switch_to_sleep().unwrap();
        phy.switch_to_off().unwrap();
        assert_eq!(
            phy.resume_from_sleep(),
            Err(DeviceError::PoweredDown(PhyState::Idle))
        );
    }
}
