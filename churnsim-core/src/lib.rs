//! # churnsim-core
//!
//! Foundation layer for the churn simulator.
//!
//! ### Key Submodules:
//! - `time`: `VirtualClock` plus the `Scheduler` trait and a deterministic `EventQueue`
//! - `random`: reseedable uniform sources consumed by the churn model
//! - `network`: device models (CSMA, Wi-Fi, loopback)
//! - `device`: the `DeviceAvailability` capability and weak `DeviceHandle`s
//!
//! The churn logic itself lives in `churnsim-simulator`; everything here is
//! the collaborator surface it runs against.

pub mod device;
pub mod error;
pub mod network;
pub mod random;
pub mod time;

pub use error::SimulationError;
