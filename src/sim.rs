//! Host-side models of the antenna hardware.
//!
//! [`SimulatedIsisBoard`] answers the ISIS command set on the
//! [`AntennaBus`] interface and models arming, burn timing and deployment
//! switches in virtual time. Delays advance the virtual clock instead of
//! sleeping, so a full deployment runs instantly.

use crate::bus::{AntennaBus, BusError, Response};
use crate::protocol::{self, AntennaId, DEPLOY_TIMER_TICK_MS, MAX_COMMAND_LEN};
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Burn time after which an antenna's restraint releases.
pub const DEFAULT_RELEASE_AFTER_MS: u32 = 3000;

/// Raw sensor count for roughly 25 C.
pub const DEFAULT_TEMPERATURE_RAW: u16 = 560;

pub type CommandFrame = heapless::Vec<u8, MAX_COMMAND_LEN>;

/// Failures to inject into the simulated board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimFaultPlan {
    /// Nothing on the bus acknowledges.
    pub offline: bool,
    /// Opcodes the board refuses.
    pub nacked_opcodes: Vec<u8>,
    /// Number of initial ARM commands refused.
    pub rejected_arm_commands: u32,
    /// Antennas whose restraint never releases.
    pub stuck_antennas: Vec<AntennaId>,
    /// Every read transaction fails.
    pub failing_reads: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct SimAntenna {
    deployed: bool,
    burning: bool,
    timed_out: bool,
    burn_remaining_ms: u32,
    burn_elapsed_ms: u32,
    activation_count: u8,
    activation_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurnMode {
    Independent { ignore_switch: bool },
    Sequential,
}

#[derive(Debug)]
pub struct SimulatedIsisBoard {
    antennas: [SimAntenna; 4],
    armed: bool,
    burn_mode: Option<BurnMode>,
    /// Antennas still to burn in the running sequential deploy.
    sequential_queue: heapless::Deque<(AntennaId, u32), 4>,
    pending_response: Option<Response>,
    temperature_raw: u16,
    release_after_ms: u32,
    faults: SimFaultPlan,
    arm_rejections_left: u32,
    elapsed_ms: u64,
    command_log: Vec<CommandFrame>,
}

impl SimulatedIsisBoard {
    pub fn new() -> Self {
        Self::with_faults(SimFaultPlan::default())
    }

    pub fn with_faults(faults: SimFaultPlan) -> Self {
        Self {
            antennas: [SimAntenna::default(); 4],
            armed: false,
            burn_mode: None,
            sequential_queue: heapless::Deque::new(),
            pending_response: None,
            temperature_raw: DEFAULT_TEMPERATURE_RAW,
            release_after_ms: DEFAULT_RELEASE_AFTER_MS,
            arm_rejections_left: faults.rejected_arm_commands,
            faults,
            elapsed_ms: 0,
            command_log: Vec::new(),
        }
    }

    pub fn set_temperature_raw(&mut self, raw: u16) {
        self.temperature_raw = raw;
    }

    pub fn set_release_after_ms(&mut self, ms: u32) {
        self.release_after_ms = ms;
    }

    /// Marks an antenna as already released, e.g. by an earlier pass.
    pub fn set_deployed(&mut self, antenna: AntennaId) {
        self.antennas[antenna.index()].deployed = true;
    }

    pub fn faults_mut(&mut self) -> &mut SimFaultPlan {
        &mut self.faults
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_deployed(&self, antenna: AntennaId) -> bool {
        self.antennas[antenna.index()].deployed
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Every frame written to the board, in order, including refused ones.
    pub fn command_log(&self) -> &[CommandFrame] {
        &self.command_log
    }

    pub fn opcodes(&self) -> impl Iterator<Item = u8> + '_ {
        self.command_log.iter().filter_map(|frame| frame.first().copied())
    }

    /// Current status word as the board would report it.
    pub fn status_word(&self) -> u16 {
        const SHIFTS: [u16; 4] = [13, 9, 5, 1];

        let mut word = 0u16;
        for (antenna, shift) in self.antennas.iter().zip(SHIFTS) {
            let field = (u16::from(!antenna.deployed) << 2)
                | (u16::from(antenna.timed_out) << 1)
                | u16::from(antenna.burning);
            word |= field << shift;
        }
        if matches!(self.burn_mode, Some(BurnMode::Independent { ignore_switch: true })) {
            word |= 1 << 8;
        }
        if matches!(self.burn_mode, Some(BurnMode::Independent { .. })) {
            word |= 1 << 4;
        }
        if self.armed {
            word |= 1;
        }
        word
    }

    fn respond_u16(&mut self, value: u16) {
        let mut response = Response::new();
        let _ = response.extend_from_slice(&value.to_be_bytes());
        self.pending_response = Some(response);
    }

    fn respond_u8(&mut self, value: u8) {
        let mut response = Response::new();
        let _ = response.push(value);
        self.pending_response = Some(response);
    }

    fn stop_burns(&mut self) {
        for antenna in &mut self.antennas {
            antenna.burning = false;
        }
        self.burn_mode = None;
        self.sequential_queue.clear();
    }

    fn start_burn(&mut self, id: AntennaId, burn_ms: u32, mode: BurnMode) {
        // The board burns one element at a time.
        for antenna in &mut self.antennas {
            antenna.burning = false;
        }
        let antenna = &mut self.antennas[id.index()];
        antenna.burning = true;
        antenna.timed_out = false;
        antenna.burn_remaining_ms = burn_ms;
        antenna.burn_elapsed_ms = 0;
        antenna.activation_count = antenna.activation_count.saturating_add(1);
        self.burn_mode = Some(mode);
        debug!(antenna = %id, burn_ms, ?mode, "sim burn started");
    }

    fn start_next_sequential(&mut self) {
        while let Some((id, burn_ms)) = self.sequential_queue.pop_front() {
            if !self.antennas[id.index()].deployed {
                self.start_burn(id, burn_ms, BurnMode::Sequential);
                return;
            }
        }
        self.burn_mode = None;
    }

    fn deploy_command(&mut self, opcode: u8, burn_s: u8) {
        let (id, ignore_switch) = match opcode {
            protocol::CMD_DEPLOY_ANT_1 => (AntennaId::Ant1, false),
            protocol::CMD_DEPLOY_ANT_2 => (AntennaId::Ant2, false),
            protocol::CMD_DEPLOY_ANT_3 => (AntennaId::Ant3, false),
            protocol::CMD_DEPLOY_ANT_4 => (AntennaId::Ant4, false),
            protocol::CMD_DEPLOY_ANT_1_OVERRIDE => (AntennaId::Ant1, true),
            protocol::CMD_DEPLOY_ANT_2_OVERRIDE => (AntennaId::Ant2, true),
            protocol::CMD_DEPLOY_ANT_3_OVERRIDE => (AntennaId::Ant3, true),
            _ => (AntennaId::Ant4, true),
        };
        if !self.armed {
            debug!(antenna = %id, "sim ignoring deploy while disarmed");
            return;
        }
        if self.antennas[id.index()].deployed && !ignore_switch {
            return;
        }
        self.sequential_queue.clear();
        self.start_burn(id, u32::from(burn_s) * 1000, BurnMode::Independent { ignore_switch });
    }

    fn sequential_command(&mut self, burn_s: u8) {
        if !self.armed {
            debug!("sim ignoring sequential deploy while disarmed");
            return;
        }
        self.stop_burns();
        for id in AntennaId::ALL {
            let _ = self.sequential_queue.push_back((id, u32::from(burn_s) * 1000));
        }
        self.start_next_sequential();
    }

    fn execute(&mut self, frame: &[u8]) -> Result<(), BusError> {
        let opcode = frame[0];
        let parameter = frame.get(1).copied();

        match opcode {
            protocol::CMD_ARM => {
                if self.arm_rejections_left > 0 {
                    self.arm_rejections_left -= 1;
                    return Err(BusError::Nack);
                }
                self.armed = true;
            }
            protocol::CMD_DISARM => {
                self.stop_burns();
                self.armed = false;
            }
            protocol::CMD_RESET => {
                self.stop_burns();
                self.armed = false;
                self.pending_response = None;
            }
            protocol::CMD_DEPLOY_CANCEL => self.stop_burns(),
            protocol::CMD_DEPLOY_ANT_1..=protocol::CMD_DEPLOY_ANT_4
            | protocol::CMD_DEPLOY_ANT_1_OVERRIDE..=protocol::CMD_DEPLOY_ANT_4_OVERRIDE => {
                let burn_s = parameter.ok_or(BusError::Nack)?;
                self.deploy_command(opcode, burn_s);
            }
            protocol::CMD_DEPLOY_SEQUENTIAL => {
                let burn_s = parameter.ok_or(BusError::Nack)?;
                self.sequential_command(burn_s);
            }
            protocol::CMD_MEASURE_TEMPERATURE => self.respond_u16(self.temperature_raw),
            protocol::CMD_REPORT_DEPLOY_STATUS => self.respond_u16(self.status_word()),
            protocol::CMD_REPORT_DEPLOY_COUNTER_ANT_1..=protocol::CMD_REPORT_DEPLOY_COUNTER_ANT_4 => {
                let index = usize::from(opcode - protocol::CMD_REPORT_DEPLOY_COUNTER_ANT_1);
                self.respond_u8(self.antennas[index].activation_count);
            }
            protocol::CMD_REPORT_DEPLOY_TIMER_ANT_1..=protocol::CMD_REPORT_DEPLOY_TIMER_ANT_4 => {
                let index = usize::from(opcode - protocol::CMD_REPORT_DEPLOY_TIMER_ANT_1);
                let ticks = self.antennas[index].activation_ms / DEPLOY_TIMER_TICK_MS;
                self.respond_u16(u16::try_from(ticks).unwrap_or(u16::MAX));
            }
            _ => return Err(BusError::Nack),
        }
        Ok(())
    }

    /// Advances the burn model by `ms` of virtual time.
    fn advance(&mut self, ms: u32) {
        let mut remaining = ms;
        self.elapsed_ms += u64::from(ms);

        while remaining > 0 {
            let Some(index) = self.antennas.iter().position(|a| a.burning) else {
                return;
            };
            let ignore_switch = matches!(self.burn_mode, Some(BurnMode::Independent { ignore_switch: true }));
            let stuck = self.faults.stuck_antennas.iter().any(|id| id.index() == index);
            let release_after_ms = self.release_after_ms;

            let antenna = &mut self.antennas[index];
            // Stop the step at the release point so the switch is seen on time.
            let until_release = if antenna.deployed || stuck {
                u32::MAX
            } else {
                release_after_ms.saturating_sub(antenna.burn_elapsed_ms)
            };
            let step = remaining.min(antenna.burn_remaining_ms).min(until_release);
            antenna.burn_remaining_ms -= step;
            antenna.burn_elapsed_ms += step;
            antenna.activation_ms = antenna.activation_ms.saturating_add(step);
            remaining -= step;

            if !stuck && antenna.burn_elapsed_ms >= release_after_ms {
                antenna.deployed = true;
            }

            let burn_over = antenna.burn_remaining_ms == 0;
            let released = antenna.deployed && !ignore_switch;
            if burn_over || released {
                antenna.burning = false;
                antenna.timed_out = burn_over && !antenna.deployed;
                trace!(index, deployed = antenna.deployed, "sim burn ended");
                if self.burn_mode == Some(BurnMode::Sequential) {
                    self.start_next_sequential();
                } else {
                    self.burn_mode = None;
                }
            }
        }
    }
}

impl Default for SimulatedIsisBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl AntennaBus for SimulatedIsisBoard {
    fn write_command(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        if self.faults.offline {
            return Err(BusError::Nack);
        }
        if bytes.is_empty() {
            // Address check.
            return Ok(());
        }

        let mut frame = CommandFrame::new();
        let _ = frame.extend_from_slice(&bytes[..bytes.len().min(MAX_COMMAND_LEN)]);
        self.command_log.push(frame);

        if self.faults.nacked_opcodes.contains(&bytes[0]) {
            return Err(BusError::Nack);
        }
        self.execute(bytes)
    }

    fn read_response(&mut self, len: usize) -> Result<Response, BusError> {
        if self.faults.offline || self.faults.failing_reads {
            return Err(BusError::Nack);
        }
        let mut response = self.pending_response.take().ok_or(BusError::Nack)?;
        response.truncate(len);
        Ok(response)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms);
    }
}

/// Burn line that records every level it is driven to.
#[derive(Debug, Default)]
pub struct SimulatedDeployPin {
    high: bool,
    levels: Vec<bool>,
}

impl SimulatedDeployPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Levels driven so far, `true` for high.
    pub fn levels(&self) -> &[bool] {
        &self.levels
    }
}

impl ErrorType for SimulatedDeployPin {
    type Error = Infallible;
}

impl OutputPin for SimulatedDeployPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.levels.push(true);
        Ok(())
    }
}

/// Delay source that only counts time.
#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualClock {
    elapsed_ns: u64,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }
}

impl DelayNs for VirtualClock {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ns += u64::from(ms) * 1_000_000;
    }
}
