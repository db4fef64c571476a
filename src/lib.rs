//! # OBDH Antenna Device Layer
//!
//! Antenna handling for a CubeSat on-board computer: the ISIS deployable
//! antenna command set, status and temperature decoding, and the one-shot
//! deployment sequence run after orbit insertion.
//!
//! ## Features
//!
//! - **Driver abstraction**: ISIS (I2C) and SpaceLab (GPIO burn line) antennas behind [`drivers::AntennaDriver`]
//! - **Deployment sequence**: arm with bounded retries, burn each antenna, sequential burn, verify, disarm
//! - **Telemetry decoding**: status word bit fields and calibrated temperature lookup
//! - **Embedded-friendly**: `embedded-hal` 1.0 bus and delay traits, fixed-capacity buffers
//! - **Simulation**: an ISIS board model with fault injection for host-side testing
//!
//! ## Quick Start
//!
//! ```rust
//! use obdh_antenna::antenna::AntennaDevice;
//! use obdh_antenna::deployment::DeployTiming;
//! use obdh_antenna::drivers::IsisAntenna;
//! use obdh_antenna::sim::SimulatedIsisBoard;
//!
//! let mut board = SimulatedIsisBoard::new();
//! let mut device = AntennaDevice::new(IsisAntenna::new(&mut board), DeployTiming::default());
//!
//! device.init().unwrap();
//! let outcome = device.deploy(20_000);
//! assert!(outcome.is_clean());
//! assert!(outcome.final_status.unwrap().all_deployed());
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - ISIS opcodes and command frames
//! - [`status`] - Deployment status word decoder
//! - [`temperature`] - Temperature sensor calibration
//! - [`bus`] - Command/response transport and the I2C adapter
//! - [`drivers`] - Antenna driver trait and implementations
//! - [`deployment`] - Deployment state machine
//! - [`antenna`] - Device facade used by the subsystem layer
//! - [`config`] - JSON configuration
//! - [`sim`] - Simulated hardware

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod antenna;
pub mod bus;
pub mod config;
pub mod deployment;
pub mod drivers;
pub mod protocol;
pub mod retry;
pub mod sim;
pub mod status;
pub mod temperature;

// Re-export main public types for convenience
pub use antenna::{AntennaData, AntennaDevice};
pub use config::AntennaConfig;
pub use deployment::{DeployOutcome, DeploymentController, ErrorTally};
pub use drivers::{AntennaDriver, AntennaError, DriverKind};
pub use status::{decode_status, DeploymentStatus};
