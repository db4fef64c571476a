//! SpaceLab antenna driver.
//!
//! A single GPIO line drives the burn circuit. Deployment is a fixed
//! three-stage HIGH/LOW/HIGH pattern; the board gives no status, arming or
//! temperature feedback.

use super::{AntennaDriver, AntennaError, DriverKind};
use crate::protocol::{AntennaId, DeployOverride};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use tracing::{info, warn};

pub const STAGE_DURATION_S: u8 = 20;
pub const TRANSITION_DURATION_S: u8 = 10;
pub const HALF_TRANSITION_DURATION_S: u8 = TRANSITION_DURATION_S >> 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    High,
    Low,
}

/// Burn line level for each stage.
const STAGES: [Level; 3] = [Level::High, Level::Low, Level::High];

#[derive(Debug)]
pub struct SlAntenna<P, D> {
    pin: P,
    delay: D,
}

impl<P: OutputPin, D: DelayNs> SlAntenna<P, D> {
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    pub fn release(self) -> (P, D) {
        (self.pin, self.delay)
    }

    fn drive(&mut self, level: Level) -> Result<(), AntennaError> {
        match level {
            Level::High => self.pin.set_high(),
            Level::Low => self.pin.set_low(),
        }
        .map_err(|_| AntennaError::Gpio)
    }

    fn sleep_s(&mut self, s: u8) {
        self.delay.delay_ms(u32::from(s) * 1000);
    }

    fn run_stages(&mut self) -> Result<(), AntennaError> {
        for (stage, &level) in STAGES.iter().enumerate() {
            if stage > 0 {
                self.sleep_s(HALF_TRANSITION_DURATION_S);
            }
            self.drive(level)?;
            info!(stage = stage + 1, ?level, "burn stage");
            if stage > 0 {
                self.sleep_s(HALF_TRANSITION_DURATION_S);
            }
            self.sleep_s(STAGE_DURATION_S);
        }
        Ok(())
    }
}

impl<P: OutputPin, D: DelayNs> AntennaDriver for SlAntenna<P, D> {
    fn kind(&self) -> DriverKind {
        DriverKind::SpaceLabSl
    }

    fn init(&mut self) -> Result<(), AntennaError> {
        self.drive(Level::Low)
    }

    /// No arming circuit; the burn line is always live.
    fn arm(&mut self) -> Result<(), AntennaError> {
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), AntennaError> {
        self.drive(Level::Low)
    }

    fn is_armed(&mut self) -> Result<bool, AntennaError> {
        Ok(true)
    }

    fn start_independent_deploy(
        &mut self,
        _antenna: AntennaId,
        _burn_time_s: u8,
        _override_switch: DeployOverride,
    ) -> Result<(), AntennaError> {
        Err(AntennaError::Unsupported { operation: "independent deploy" })
    }

    /// Runs the full stage pattern; the burn time is fixed by the hardware.
    fn start_sequential_deploy(&mut self, _burn_time_s: u8) -> Result<(), AntennaError> {
        let result = self.run_stages();
        if let Err(e) = self.drive(Level::Low) {
            warn!(error = %e, "burn line left energized");
        }
        result
    }

    fn read_deployment_status_code(&mut self) -> Result<u16, AntennaError> {
        Err(AntennaError::Unsupported { operation: "deployment status" })
    }

    fn read_raw_temperature(&mut self) -> Result<u16, AntennaError> {
        Err(AntennaError::Unsupported { operation: "temperature" })
    }

    fn delay_s(&mut self, s: u8) {
        self.sleep_s(s);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
