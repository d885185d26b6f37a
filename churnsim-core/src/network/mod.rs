//! ## churnsim-core::network
//! **Device models attached to simulated nodes**
//!
//! ### Models:
//! - `CsmaNetDevice`: wired device gated by independent send/receive enables.
//! - `WifiNetDevice`: wireless device whose PHY runs a small state machine.
//! - `LoopbackNetDevice`: local-only device with no availability control.
//!
//! These are topology-owned collaborators; churn reaches them only through
//! [`crate::device::DeviceAvailability`].

mod csma;
mod loopback;
mod wifi;

pub use csma::CsmaNetDevice;
pub use loopback::LoopbackNetDevice;
pub use wifi::{PhyState, WifiNetDevice, WifiPhy};

use thiserror::Error;

/// Transitions a device model refuses to perform.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("PHY is already off")]
    AlreadyOff,

    #[error("PHY is not off (state {0:?})")]
    NotOff(PhyState),

    #[error("PHY is off and cannot enter {0:?}")]
    PoweredDown(PhyState),
}
