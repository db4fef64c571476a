//! Deployment status word decoding.
//!
//! Bit layout of the 16-bit word returned by `REPORT_DEPLOY_STATUS`,
//! MSB first:
//!
//! ```text
//! 15: ant1 not deployed   14: ant1 timeout   13: ant1 burning   12: reserved
//! 11: ant2 not deployed   10: ant2 timeout    9: ant2 burning    8: ignoring switches
//!  7: ant3 not deployed    6: ant3 timeout    5: ant3 burning    4: independent burn
//!  3: ant4 not deployed    2: ant4 timeout    1: ant4 burning    0: armed
//! ```
//!
//! The deployment switch bit is inverted: 1 means the antenna is still
//! stowed.

use crate::protocol::AntennaId;
use arrayvec::ArrayString;
use core::fmt::Write;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

const ANT1_SHIFT: u16 = 13;
const ANT2_SHIFT: u16 = 9;
const ANT3_SHIFT: u16 = 5;
const ANT4_SHIFT: u16 = 1;

const NOT_DEPLOYED_BIT: u16 = 0b100;
const TIMEOUT_BIT: u16 = 0b010;
const BURNING_BIT: u16 = 0b001;

const IGNORING_SWITCHES_BIT: u16 = 1 << 8;
const INDEPENDENT_BURN_BIT: u16 = 1 << 4;
const ARMED_BIT: u16 = 1 << 0;

pub const SUMMARY_LEN: usize = 128;

pub type StatusSummary = ArrayString<SUMMARY_LEN>;

/// Longest line `summary` can produce: every antenna in its longest state
/// and both flags set.
const SUMMARY_WORST_CASE_LEN: usize = "code=0xFFFF".len()
    + 4 * " ANT4=deployed".len()
    + " armed=yes".len()
    + " ignoring-switches".len()
    + " independent-burn".len();

const_assert!(SUMMARY_WORST_CASE_LEN <= SUMMARY_LEN);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AntennaChannel {
    pub deployed: bool,
    pub stopped_by_timeout: bool,
    pub burning_active: bool,
}

impl AntennaChannel {
    fn from_field(field: u16) -> Self {
        Self {
            deployed: field & NOT_DEPLOYED_BIT == 0,
            stopped_by_timeout: field & TIMEOUT_BIT != 0,
            burning_active: field & BURNING_BIT != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStatus {
    /// Raw word as read from the board.
    pub code: u16,
    pub antennas: [AntennaChannel; 4],
    pub ignoring_switches: bool,
    pub independent_burn_active: bool,
    pub armed: bool,
}

/// Decodes a raw status word. Every 16-bit value is a valid status.
pub fn decode_status(raw: u16) -> DeploymentStatus {
    let channel = |shift: u16| AntennaChannel::from_field((raw >> shift) & 0b111);

    DeploymentStatus {
        code: raw,
        antennas: [
            channel(ANT1_SHIFT),
            channel(ANT2_SHIFT),
            channel(ANT3_SHIFT),
            channel(ANT4_SHIFT),
        ],
        ignoring_switches: raw & IGNORING_SWITCHES_BIT != 0,
        independent_burn_active: raw & INDEPENDENT_BURN_BIT != 0,
        armed: raw & ARMED_BIT != 0,
    }
}

impl DeploymentStatus {
    pub fn channel(&self, antenna: AntennaId) -> &AntennaChannel {
        &self.antennas[antenna.index()]
    }

    pub fn deployed_count(&self) -> usize {
        self.antennas.iter().filter(|a| a.deployed).count()
    }

    pub fn all_deployed(&self) -> bool {
        self.deployed_count() == self.antennas.len()
    }

    pub fn any_burning(&self) -> bool {
        self.antennas.iter().any(|a| a.burning_active)
    }

    /// One-line rendering for the system log, e.g.
    /// `code=0x8888 ANT1=stowed ANT2=stowed ANT3=stowed ANT4=stowed armed=no`.
    pub fn summary(&self) -> StatusSummary {
        let mut out = StatusSummary::new();
        // Bounded by SUMMARY_WORST_CASE_LEN, so writes cannot overflow.
        let _ = write!(out, "code=0x{:04X}", self.code);
        for antenna in AntennaId::ALL {
            let channel = self.channel(antenna);
            let state = match (channel.deployed, channel.burning_active) {
                (true, _) => "deployed",
                (false, true) => "burning",
                (false, false) if channel.stopped_by_timeout => "timeout",
                (false, false) => "stowed",
            };
            let _ = write!(out, " {}={}", antenna, state);
        }
        let _ = write!(out, " armed={}", if self.armed { "yes" } else { "no" });
        if self.ignoring_switches {
            let _ = out.try_push_str(" ignoring-switches");
        }
        if self.independent_burn_active {
            let _ = out.try_push_str(" independent-burn");
        }
        out
    }
}

impl Default for DeploymentStatus {
    /// The board's power-on state.
    fn default() -> Self {
        decode_status(crate::protocol::STATUS_MASK)
    }
}
