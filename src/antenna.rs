//! Antenna device facade used by the subsystem and telemetry layers.

use crate::config::AntennaConfig;
use crate::deployment::{DeployOutcome, DeployTiming, DeploymentController};
use crate::drivers::{AntennaDriver, AntennaError, AntennaReport};
use crate::protocol::AntennaId;
use crate::status::{decode_status, DeploymentStatus};
use crate::temperature::{raw_to_celsius, TEMPERATURE_UNKNOWN};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Status word reported when no reading is available.
pub const STATUS_UNKNOWN: u16 = 0xFFFF;

/// Telemetry snapshot of the antenna board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntennaData {
    pub status: DeploymentStatus,
    /// Raw temperature sensor count.
    pub temperature: u16,
}

impl AntennaData {
    /// Placeholder written before a read so that a failed read never leaves
    /// stale values behind.
    pub fn poisoned() -> Self {
        Self {
            status: decode_status(STATUS_UNKNOWN),
            temperature: TEMPERATURE_UNKNOWN,
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.status.code == STATUS_UNKNOWN && self.temperature == TEMPERATURE_UNKNOWN
    }

    pub fn temperature_celsius(&self) -> Option<i16> {
        raw_to_celsius(self.temperature)
    }
}

impl Default for AntennaData {
    fn default() -> Self {
        Self::poisoned()
    }
}

/// Owns the selected antenna driver and its lifecycle.
#[derive(Debug)]
pub struct AntennaDevice<D> {
    driver: D,
    timing: DeployTiming,
    initialized: bool,
}

impl<D: AntennaDriver> AntennaDevice<D> {
    pub fn new(driver: D, timing: DeployTiming) -> Self {
        Self { driver, timing, initialized: false }
    }

    pub fn from_config(driver: D, config: &AntennaConfig) -> Self {
        Self::new(driver, config.timing())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn timing(&self) -> DeployTiming {
        self.timing
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Initializes the driver and logs a temperature and status reading.
    ///
    /// Once it has succeeded, later calls return `Ok` without touching the
    /// hardware. Any failing step fails the whole initialization; readings
    /// the hardware cannot provide at all are skipped.
    pub fn init(&mut self) -> Result<(), AntennaError> {
        if self.initialized {
            return Ok(());
        }

        let kind = self.driver.kind();
        info!(driver = %kind, "initializing antenna device");

        self.driver.init().map_err(|e| {
            error!(driver = %kind, error = %e, "antenna driver initialization failed");
            AntennaError::InitFailed
        })?;

        match self.driver.read_raw_temperature() {
            Ok(raw) => info!(raw, celsius = ?raw_to_celsius(raw), "antenna temperature"),
            Err(e) if e.is_unsupported() => debug!("antenna temperature not available"),
            Err(e) => {
                error!(error = %e, "reading antenna temperature failed");
                return Err(AntennaError::InitFailed);
            }
        }

        match self.driver.read_deployment_status() {
            Ok(status) => info!(status = %status.summary(), "antenna status"),
            Err(e) if e.is_unsupported() => debug!("antenna status not available"),
            Err(e) => {
                error!(error = %e, "reading antenna status failed");
                return Err(AntennaError::InitFailed);
            }
        }

        self.initialized = true;
        Ok(())
    }

    /// Reads status and temperature into `data`.
    ///
    /// `data` is poisoned first and only overwritten when both reads succeed.
    pub fn get_data_into(&mut self, data: &mut AntennaData) -> Result<(), AntennaError> {
        *data = AntennaData::poisoned();

        let status = self.driver.read_deployment_status().map_err(|e| {
            warn!(error = %e, "reading antenna status failed");
            e
        })?;
        let temperature = self.driver.read_raw_temperature().map_err(|e| {
            warn!(error = %e, "reading antenna temperature failed");
            e
        })?;

        *data = AntennaData { status, temperature };
        Ok(())
    }

    pub fn get_data(&mut self) -> Result<AntennaData, AntennaError> {
        let mut data = AntennaData::poisoned();
        self.get_data_into(&mut data)?;
        Ok(data)
    }

    /// Runs the full deployment sequence once. Never fails; inspect the
    /// returned error tally for degraded phases.
    pub fn deploy(&mut self, arming_timeout_ms: u32) -> DeployOutcome {
        let outcome = DeploymentController::new(&mut self.driver, self.timing).run(arming_timeout_ms);
        match &outcome.final_status {
            Some(status) => info!(
                errors = %outcome.errors,
                deployed = status.deployed_count(),
                "antenna deployment finished"
            ),
            None => warn!(errors = %outcome.errors, "antenna deployment finished without a status reading"),
        }
        outcome
    }

    /// Burn counters and timers for all four antennas.
    pub fn activation_reports(&mut self) -> Result<[AntennaReport; 4], AntennaError> {
        let mut reports = [AntennaReport::default(); 4];
        for antenna in AntennaId::ALL {
            reports[antenna.index()] = self.driver.read_activation_report(antenna)?;
        }
        Ok(reports)
    }
}
