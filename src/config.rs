use crate::deployment::{DeployTiming, DEFAULT_INDEPENDENT_BURN_TIME_S, DEFAULT_SEQUENTIAL_BURN_TIME_S};
use crate::drivers::DriverKind;
use crate::protocol::{I2C_ADDRESS_UC_A, I2C_ADDRESS_UC_B};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ARMING_TIMEOUT_MS: u32 = 20_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("I2C address 0x{0:02X} is not an antenna microcontroller (expected 0x31 or 0x32)")]
    InvalidAddress(u8),
    #[error("{field} must be at least one second")]
    ZeroBurnTime { field: &'static str },
}

/// Antenna device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntennaConfig {
    pub driver: DriverKind,
    /// Slave address of the board microcontroller in use.
    pub i2c_address: u8,
    pub independent_burn_time_s: u8,
    pub sequential_burn_time_s: u8,
    pub arming_timeout_ms: u32,
}

impl Default for AntennaConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::Isis,
            i2c_address: I2C_ADDRESS_UC_B,
            independent_burn_time_s: DEFAULT_INDEPENDENT_BURN_TIME_S,
            sequential_burn_time_s: DEFAULT_SEQUENTIAL_BURN_TIME_S,
            arming_timeout_ms: DEFAULT_ARMING_TIMEOUT_MS,
        }
    }
}

impl AntennaConfig {
    /// Parses and validates a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.i2c_address != I2C_ADDRESS_UC_A && self.i2c_address != I2C_ADDRESS_UC_B {
            return Err(ConfigError::InvalidAddress(self.i2c_address));
        }
        if self.independent_burn_time_s == 0 {
            return Err(ConfigError::ZeroBurnTime { field: "independent_burn_time_s" });
        }
        if self.sequential_burn_time_s == 0 {
            return Err(ConfigError::ZeroBurnTime { field: "sequential_burn_time_s" });
        }
        Ok(())
    }

    pub fn timing(&self) -> DeployTiming {
        DeployTiming {
            independent_burn_time_s: self.independent_burn_time_s,
            sequential_burn_time_s: self.sequential_burn_time_s,
        }
    }
}
