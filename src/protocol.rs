//! ISIS antenna system wire protocol.
//!
//! Opcodes and addresses are fixed by the ISIS AntS interface control
//! document and must match byte for byte.

use core::fmt;
use serde::{Deserialize, Serialize};

pub const I2C_ADDRESS_UC_A: u8 = 0x31;
pub const I2C_ADDRESS_UC_B: u8 = 0x32;

/// All antennas not deployed, system disarmed.
pub const STATUS_MASK: u16 = 0x8888;

pub const CMD_RESET: u8 = 0xAA;
pub const CMD_ARM: u8 = 0xAD;
pub const CMD_DISARM: u8 = 0xAC;
pub const CMD_DEPLOY_ANT_1: u8 = 0xA1;
pub const CMD_DEPLOY_ANT_2: u8 = 0xA2;
pub const CMD_DEPLOY_ANT_3: u8 = 0xA3;
pub const CMD_DEPLOY_ANT_4: u8 = 0xA4;
pub const CMD_DEPLOY_SEQUENTIAL: u8 = 0xA5;
pub const CMD_DEPLOY_CANCEL: u8 = 0xA9;
pub const CMD_DEPLOY_ANT_1_OVERRIDE: u8 = 0xBA;
pub const CMD_DEPLOY_ANT_2_OVERRIDE: u8 = 0xBB;
pub const CMD_DEPLOY_ANT_3_OVERRIDE: u8 = 0xBC;
pub const CMD_DEPLOY_ANT_4_OVERRIDE: u8 = 0xBD;
pub const CMD_MEASURE_TEMPERATURE: u8 = 0xC0;
pub const CMD_REPORT_DEPLOY_STATUS: u8 = 0xC3;
pub const CMD_REPORT_DEPLOY_COUNTER_ANT_1: u8 = 0xB0;
pub const CMD_REPORT_DEPLOY_COUNTER_ANT_2: u8 = 0xB1;
pub const CMD_REPORT_DEPLOY_COUNTER_ANT_3: u8 = 0xB2;
pub const CMD_REPORT_DEPLOY_COUNTER_ANT_4: u8 = 0xB3;
pub const CMD_REPORT_DEPLOY_TIMER_ANT_1: u8 = 0xB4;
pub const CMD_REPORT_DEPLOY_TIMER_ANT_2: u8 = 0xB5;
pub const CMD_REPORT_DEPLOY_TIMER_ANT_3: u8 = 0xB6;
pub const CMD_REPORT_DEPLOY_TIMER_ANT_4: u8 = 0xB7;

/// Activation timer resolution reported by the board.
pub const DEPLOY_TIMER_TICK_MS: u32 = 50;

/// Longest command frame: opcode plus one parameter byte.
pub const MAX_COMMAND_LEN: usize = 2;

/// Physical antenna element, numbered as on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AntennaId {
    Ant1 = 1,
    Ant2 = 2,
    Ant3 = 3,
    Ant4 = 4,
}

impl AntennaId {
    /// Ascending deployment order.
    pub const ALL: [AntennaId; 4] = [AntennaId::Ant1, AntennaId::Ant2, AntennaId::Ant3, AntennaId::Ant4];

    pub fn number(self) -> u8 {
        self as u8
    }

    /// Zero-based position, for indexing per-antenna arrays.
    pub fn index(self) -> usize {
        self as usize - 1
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(AntennaId::Ant1),
            2 => Some(AntennaId::Ant2),
            3 => Some(AntennaId::Ant3),
            4 => Some(AntennaId::Ant4),
            _ => None,
        }
    }

    pub fn deploy_opcode(self, override_switch: DeployOverride) -> u8 {
        match (self, override_switch) {
            (AntennaId::Ant1, DeployOverride::Without) => CMD_DEPLOY_ANT_1,
            (AntennaId::Ant2, DeployOverride::Without) => CMD_DEPLOY_ANT_2,
            (AntennaId::Ant3, DeployOverride::Without) => CMD_DEPLOY_ANT_3,
            (AntennaId::Ant4, DeployOverride::Without) => CMD_DEPLOY_ANT_4,
            (AntennaId::Ant1, DeployOverride::With) => CMD_DEPLOY_ANT_1_OVERRIDE,
            (AntennaId::Ant2, DeployOverride::With) => CMD_DEPLOY_ANT_2_OVERRIDE,
            (AntennaId::Ant3, DeployOverride::With) => CMD_DEPLOY_ANT_3_OVERRIDE,
            (AntennaId::Ant4, DeployOverride::With) => CMD_DEPLOY_ANT_4_OVERRIDE,
        }
    }

    pub fn counter_opcode(self) -> u8 {
        match self {
            AntennaId::Ant1 => CMD_REPORT_DEPLOY_COUNTER_ANT_1,
            AntennaId::Ant2 => CMD_REPORT_DEPLOY_COUNTER_ANT_2,
            AntennaId::Ant3 => CMD_REPORT_DEPLOY_COUNTER_ANT_3,
            AntennaId::Ant4 => CMD_REPORT_DEPLOY_COUNTER_ANT_4,
        }
    }

    pub fn timer_opcode(self) -> u8 {
        match self {
            AntennaId::Ant1 => CMD_REPORT_DEPLOY_TIMER_ANT_1,
            AntennaId::Ant2 => CMD_REPORT_DEPLOY_TIMER_ANT_2,
            AntennaId::Ant3 => CMD_REPORT_DEPLOY_TIMER_ANT_3,
            AntennaId::Ant4 => CMD_REPORT_DEPLOY_TIMER_ANT_4,
        }
    }
}

impl fmt::Display for AntennaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ANT{}", self.number())
    }
}

/// Whether an independent deploy ignores the antenna's deployment switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployOverride {
    Without,
    With,
}

/// A command frame sent to the antenna microcontroller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsisCommand {
    Reset,
    Arm,
    Disarm,
    DeployIndependent {
        antenna: AntennaId,
        burn_time_s: u8,
        override_switch: DeployOverride,
    },
    DeploySequential { burn_time_s: u8 },
    CancelDeploy,
    MeasureTemperature,
    ReportDeployStatus,
    ReportDeployCounter(AntennaId),
    ReportDeployTimer(AntennaId),
}

impl IsisCommand {
    pub fn opcode(&self) -> u8 {
        match *self {
            IsisCommand::Reset => CMD_RESET,
            IsisCommand::Arm => CMD_ARM,
            IsisCommand::Disarm => CMD_DISARM,
            IsisCommand::DeployIndependent { antenna, override_switch, .. } => {
                antenna.deploy_opcode(override_switch)
            }
            IsisCommand::DeploySequential { .. } => CMD_DEPLOY_SEQUENTIAL,
            IsisCommand::CancelDeploy => CMD_DEPLOY_CANCEL,
            IsisCommand::MeasureTemperature => CMD_MEASURE_TEMPERATURE,
            IsisCommand::ReportDeployStatus => CMD_REPORT_DEPLOY_STATUS,
            IsisCommand::ReportDeployCounter(antenna) => antenna.counter_opcode(),
            IsisCommand::ReportDeployTimer(antenna) => antenna.timer_opcode(),
        }
    }

    /// Number of response bytes the board returns for this command.
    pub fn response_len(&self) -> usize {
        match self {
            IsisCommand::MeasureTemperature
            | IsisCommand::ReportDeployStatus
            | IsisCommand::ReportDeployTimer(_) => 2,
            IsisCommand::ReportDeployCounter(_) => 1,
            _ => 0,
        }
    }

    pub fn encode(&self) -> heapless::Vec<u8, MAX_COMMAND_LEN> {
        let mut frame = heapless::Vec::new();
        let _ = frame.push(self.opcode());
        match *self {
            IsisCommand::DeployIndependent { burn_time_s, .. }
            | IsisCommand::DeploySequential { burn_time_s } => {
                let _ = frame.push(burn_time_s);
            }
            _ => {}
        }
        frame
    }
}
