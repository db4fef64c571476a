//! ISIS deployable antenna system driver.
//!
//! Every command is a single write of opcode plus optional parameter,
//! followed by a settle delay. Queries then read a fixed-length big-endian
//! response.

use super::{AntennaDriver, AntennaError, AntennaReport, DriverKind};
use crate::bus::{AntennaBus, Response};
use crate::protocol::{AntennaId, DeployOverride, IsisCommand};
use tracing::{debug, warn};

/// Time the board needs after a command before the next transaction.
pub const SETTLE_DELAY_MS: u32 = 100;

#[derive(Debug)]
pub struct IsisAntenna<B> {
    bus: B,
}

impl<B: AntennaBus> IsisAntenna<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn into_inner(self) -> B {
        self.bus
    }

    fn send(&mut self, command: IsisCommand) -> Result<(), AntennaError> {
        let frame = command.encode();
        debug!(opcode = command.opcode(), ?command, "isis command");
        let result = self.bus.write_command(&frame);
        self.bus.delay_ms(SETTLE_DELAY_MS);
        result.map_err(|e| {
            warn!(opcode = command.opcode(), error = %e, "isis command failed");
            AntennaError::from(e)
        })
    }

    fn query(&mut self, command: IsisCommand) -> Result<Response, AntennaError> {
        self.send(command)?;
        let expected = command.response_len();
        let response = self.bus.read_response(expected)?;
        if response.len() != expected {
            return Err(AntennaError::InvalidResponse { expected, got: response.len() });
        }
        Ok(response)
    }

    fn query_u16(&mut self, command: IsisCommand) -> Result<u16, AntennaError> {
        let response = self.query(command)?;
        Ok(u16::from_be_bytes([response[0], response[1]]))
    }

    pub fn read_activation_count(&mut self, antenna: AntennaId) -> Result<u8, AntennaError> {
        let response = self.query(IsisCommand::ReportDeployCounter(antenna))?;
        Ok(response[0])
    }

    /// Accumulated burn time of `antenna` in board ticks.
    pub fn read_activation_time(&mut self, antenna: AntennaId) -> Result<u16, AntennaError> {
        self.query_u16(IsisCommand::ReportDeployTimer(antenna))
    }
}

impl<B: AntennaBus> AntennaDriver for IsisAntenna<B> {
    fn kind(&self) -> DriverKind {
        DriverKind::Isis
    }

    /// Checks the board address with an empty write.
    fn init(&mut self) -> Result<(), AntennaError> {
        self.bus.write_command(&[])?;
        Ok(())
    }

    fn arm(&mut self) -> Result<(), AntennaError> {
        self.send(IsisCommand::Arm)
    }

    fn disarm(&mut self) -> Result<(), AntennaError> {
        self.send(IsisCommand::Disarm)
    }

    fn start_independent_deploy(
        &mut self,
        antenna: AntennaId,
        burn_time_s: u8,
        override_switch: DeployOverride,
    ) -> Result<(), AntennaError> {
        self.send(IsisCommand::DeployIndependent { antenna, burn_time_s, override_switch })
    }

    fn start_sequential_deploy(&mut self, burn_time_s: u8) -> Result<(), AntennaError> {
        self.send(IsisCommand::DeploySequential { burn_time_s })
    }

    fn read_deployment_status_code(&mut self) -> Result<u16, AntennaError> {
        self.query_u16(IsisCommand::ReportDeployStatus)
    }

    fn read_raw_temperature(&mut self) -> Result<u16, AntennaError> {
        self.query_u16(IsisCommand::MeasureTemperature)
    }

    fn read_activation_report(&mut self, antenna: AntennaId) -> Result<AntennaReport, AntennaError> {
        Ok(AntennaReport {
            activation_count: self.read_activation_count(antenna)?,
            activation_time: self.read_activation_time(antenna)?,
        })
    }

    fn cancel_deploy(&mut self) -> Result<(), AntennaError> {
        self.send(IsisCommand::CancelDeploy)
    }

    fn reset(&mut self) -> Result<(), AntennaError> {
        self.send(IsisCommand::Reset)
    }

    fn delay_s(&mut self, s: u8) {
        self.bus.delay_s(s);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.bus.delay_ms(ms);
    }
}
