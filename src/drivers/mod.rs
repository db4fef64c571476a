pub mod isis;
pub mod sl;

pub use isis::IsisAntenna;
pub use sl::SlAntenna;

use crate::bus::{AntennaBus, BusError};
use crate::protocol::{AntennaId, DeployOverride, DEPLOY_TIMER_TICK_MS};
use crate::status::{decode_status, DeploymentStatus};
use core::fmt;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Antenna hardware fitted to the spacecraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverKind {
    /// ISIS deployable antenna system, I2C controlled.
    Isis,
    /// SpaceLab antenna with a single GPIO burn line.
    SpaceLabSl,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::Isis => f.write_str("ISIS antenna"),
            DriverKind::SpaceLabSl => f.write_str("SpaceLab antenna"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AntennaError {
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
    #[error("{operation} is not supported by this antenna")]
    Unsupported { operation: &'static str },
    #[error("expected {expected} response bytes, got {got}")]
    InvalidResponse { expected: usize, got: usize },
    #[error("burn line could not be driven")]
    Gpio,
    #[error("antenna device initialization failed")]
    InitFailed,
}

impl AntennaError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, AntennaError::Unsupported { .. })
    }
}

/// Deployment history of one antenna as kept by the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AntennaReport {
    pub activation_count: u8,
    /// Accumulated burn time in board ticks.
    pub activation_time: u16,
}

impl AntennaReport {
    pub fn activation_time_ms(&self) -> u32 {
        u32::from(self.activation_time) * DEPLOY_TIMER_TICK_MS
    }
}

/// Operations the deployment controller and the device facade need from an
/// antenna driver.
///
/// Drivers return [`AntennaError::Unsupported`] for operations their hardware
/// does not have.
pub trait AntennaDriver {
    fn kind(&self) -> DriverKind;

    fn init(&mut self) -> Result<(), AntennaError>;

    fn arm(&mut self) -> Result<(), AntennaError>;

    fn disarm(&mut self) -> Result<(), AntennaError>;

    fn is_armed(&mut self) -> Result<bool, AntennaError> {
        Ok(self.read_deployment_status()?.armed)
    }

    fn start_independent_deploy(
        &mut self,
        antenna: AntennaId,
        burn_time_s: u8,
        override_switch: DeployOverride,
    ) -> Result<(), AntennaError>;

    fn start_sequential_deploy(&mut self, burn_time_s: u8) -> Result<(), AntennaError>;

    fn read_deployment_status_code(&mut self) -> Result<u16, AntennaError>;

    fn read_deployment_status(&mut self) -> Result<DeploymentStatus, AntennaError> {
        self.read_deployment_status_code().map(decode_status)
    }

    fn read_raw_temperature(&mut self) -> Result<u16, AntennaError>;

    fn read_activation_report(&mut self, _antenna: AntennaId) -> Result<AntennaReport, AntennaError> {
        Err(AntennaError::Unsupported { operation: "activation report" })
    }

    fn cancel_deploy(&mut self) -> Result<(), AntennaError> {
        Err(AntennaError::Unsupported { operation: "deploy cancel" })
    }

    fn reset(&mut self) -> Result<(), AntennaError> {
        Err(AntennaError::Unsupported { operation: "reset" })
    }

    fn delay_s(&mut self, s: u8);

    fn delay_ms(&mut self, ms: u32);
}

impl<T: AntennaDriver + ?Sized> AntennaDriver for Box<T> {
    fn kind(&self) -> DriverKind {
        (**self).kind()
    }

    fn init(&mut self) -> Result<(), AntennaError> {
        (**self).init()
    }

    fn arm(&mut self) -> Result<(), AntennaError> {
        (**self).arm()
    }

    fn disarm(&mut self) -> Result<(), AntennaError> {
        (**self).disarm()
    }

    fn is_armed(&mut self) -> Result<bool, AntennaError> {
        (**self).is_armed()
    }

    fn start_independent_deploy(
        &mut self,
        antenna: AntennaId,
        burn_time_s: u8,
        override_switch: DeployOverride,
    ) -> Result<(), AntennaError> {
        (**self).start_independent_deploy(antenna, burn_time_s, override_switch)
    }

    fn start_sequential_deploy(&mut self, burn_time_s: u8) -> Result<(), AntennaError> {
        (**self).start_sequential_deploy(burn_time_s)
    }

    fn read_deployment_status_code(&mut self) -> Result<u16, AntennaError> {
        (**self).read_deployment_status_code()
    }

    fn read_deployment_status(&mut self) -> Result<DeploymentStatus, AntennaError> {
        (**self).read_deployment_status()
    }

    fn read_raw_temperature(&mut self) -> Result<u16, AntennaError> {
        (**self).read_raw_temperature()
    }

    fn read_activation_report(&mut self, antenna: AntennaId) -> Result<AntennaReport, AntennaError> {
        (**self).read_activation_report(antenna)
    }

    fn cancel_deploy(&mut self) -> Result<(), AntennaError> {
        (**self).cancel_deploy()
    }

    fn reset(&mut self) -> Result<(), AntennaError> {
        (**self).reset()
    }

    fn delay_s(&mut self, s: u8) {
        (**self).delay_s(s);
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms);
    }
}

/// Builds the driver for `kind`. The hardware handles the other kind would
/// need are dropped.
pub fn select_driver<'a, B, P, D>(kind: DriverKind, bus: B, burn_line: P, delay: D) -> Box<dyn AntennaDriver + 'a>
where
    B: AntennaBus + 'a,
    P: OutputPin + 'a,
    D: DelayNs + 'a,
{
    match kind {
        DriverKind::Isis => Box::new(IsisAntenna::new(bus)),
        DriverKind::SpaceLabSl => Box::new(SlAntenna::new(burn_line, delay)),
    }
}
