//! Antenna deployment sequence.
//!
//! The sequence always runs to completion:
//!
//! ```text
//! Idle -> Arming -> IndependentDeploy(1..=4) -> SequentialDeploy
//!      -> StatusVerification -> Disarming -> Done
//! ```
//!
//! A failing phase adds one to the error tally and the next phase runs
//! anyway. Only the arming phase retries, bounded by the caller's timeout in
//! one second steps; the burn phases use the configured burn times.

use crate::drivers::{AntennaDriver, AntennaError};
use crate::protocol::{AntennaId, DeployOverride};
use crate::retry::{retry_until, RetryOutcome};
use crate::status::DeploymentStatus;
use core::fmt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub const ARMING_RETRY_INTERVAL_MS: u32 = 1000;

/// Antenna burn durations the board may spend during one sequential deploy.
pub const SEQUENTIAL_WAIT_BURNS: u8 = 4;

pub const DEFAULT_INDEPENDENT_BURN_TIME_S: u8 = 10;
pub const DEFAULT_SEQUENTIAL_BURN_TIME_S: u8 = 8;

/// Arm, four independent deploys, sequential deploy, verification, disarm.
pub const MAX_PHASES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployPhase {
    Idle,
    Arming,
    IndependentDeploy(AntennaId),
    SequentialDeploy,
    StatusVerification,
    Disarming,
    Done,
}

impl DeployPhase {
    pub fn next(self) -> Self {
        match self {
            DeployPhase::Idle => DeployPhase::Arming,
            DeployPhase::Arming => DeployPhase::IndependentDeploy(AntennaId::Ant1),
            DeployPhase::IndependentDeploy(AntennaId::Ant1) => DeployPhase::IndependentDeploy(AntennaId::Ant2),
            DeployPhase::IndependentDeploy(AntennaId::Ant2) => DeployPhase::IndependentDeploy(AntennaId::Ant3),
            DeployPhase::IndependentDeploy(AntennaId::Ant3) => DeployPhase::IndependentDeploy(AntennaId::Ant4),
            DeployPhase::IndependentDeploy(AntennaId::Ant4) => DeployPhase::SequentialDeploy,
            DeployPhase::SequentialDeploy => DeployPhase::StatusVerification,
            DeployPhase::StatusVerification => DeployPhase::Disarming,
            DeployPhase::Disarming | DeployPhase::Done => DeployPhase::Done,
        }
    }
}

impl fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployPhase::Idle => f.write_str("idle"),
            DeployPhase::Arming => f.write_str("arming"),
            DeployPhase::IndependentDeploy(antenna) => write!(f, "independent deploy {}", antenna),
            DeployPhase::SequentialDeploy => f.write_str("sequential deploy"),
            DeployPhase::StatusVerification => f.write_str("status verification"),
            DeployPhase::Disarming => f.write_str("disarming"),
            DeployPhase::Done => f.write_str("done"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseResult {
    Ok,
    Failed,
    /// The driver has no hardware for this phase.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: DeployPhase,
    pub result: PhaseResult,
}

/// Number of degraded phases in one deploy run. Zero is a clean run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct ErrorTally(u32);

impl ErrorTally {
    pub const CLEAN: ErrorTally = ErrorTally(0);

    pub fn count(self) -> u32 {
        self.0
    }

    pub fn is_clean(self) -> bool {
        self.0 == 0
    }

    /// Tally as the signed integer reported to the telemetry layer.
    pub fn as_i32(self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }

    fn increment(&mut self) {
        self.0 = self.0.saturating_add(1);
    }
}

impl fmt::Display for ErrorTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployTiming {
    pub independent_burn_time_s: u8,
    pub sequential_burn_time_s: u8,
}

impl Default for DeployTiming {
    fn default() -> Self {
        Self {
            independent_burn_time_s: DEFAULT_INDEPENDENT_BURN_TIME_S,
            sequential_burn_time_s: DEFAULT_SEQUENTIAL_BURN_TIME_S,
        }
    }
}

/// Result of one complete deploy run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployOutcome {
    pub errors: ErrorTally,
    /// Status read during verification, if that read succeeded.
    pub final_status: Option<DeploymentStatus>,
    pub arming_attempts: u32,
    pub phases: heapless::Vec<PhaseRecord, MAX_PHASES>,
}

impl DeployOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_clean()
    }

    pub fn failed_phases(&self) -> impl Iterator<Item = DeployPhase> + '_ {
        self.phases
            .iter()
            .filter(|r| r.result == PhaseResult::Failed)
            .map(|r| r.phase)
    }
}

/// Accumulator for the run in progress.
#[derive(Debug, Default)]
struct DeployAttempt {
    errors: ErrorTally,
    status: Option<DeploymentStatus>,
    arming_attempts: u32,
    phases: heapless::Vec<PhaseRecord, MAX_PHASES>,
}

impl DeployAttempt {
    fn record(&mut self, phase: DeployPhase, result: PhaseResult) {
        if result == PhaseResult::Failed {
            self.errors.increment();
        }
        debug_assert!(!self.phases.is_full(), "phase log overflow at {}", phase);
        let _ = self.phases.push(PhaseRecord { phase, result });
    }

    fn record_result<T>(&mut self, phase: DeployPhase, result: &Result<T, AntennaError>) {
        let outcome = match result {
            Ok(_) => PhaseResult::Ok,
            Err(e) if e.is_unsupported() => {
                debug!(%phase, error = %e, "phase skipped");
                PhaseResult::Skipped
            }
            Err(e) => {
                warn!(%phase, error = %e, "phase failed");
                PhaseResult::Failed
            }
        };
        self.record(phase, outcome);
    }

    fn finish(self) -> DeployOutcome {
        DeployOutcome {
            errors: self.errors,
            final_status: self.status,
            arming_attempts: self.arming_attempts,
            phases: self.phases,
        }
    }
}

/// Drives one deploy run over a borrowed driver.
pub struct DeploymentController<'a, D: ?Sized> {
    driver: &'a mut D,
    timing: DeployTiming,
    phase: DeployPhase,
}

impl<'a, D: AntennaDriver + ?Sized> DeploymentController<'a, D> {
    pub fn new(driver: &'a mut D, timing: DeployTiming) -> Self {
        Self { driver, timing, phase: DeployPhase::Idle }
    }

    pub fn phase(&self) -> DeployPhase {
        self.phase
    }

    /// Runs every phase in order. `arming_timeout_ms` bounds only the arming
    /// retry loop.
    pub fn run(mut self, arming_timeout_ms: u32) -> DeployOutcome {
        info!(arming_timeout_ms, timing = ?self.timing, "starting antenna deployment");
        let mut attempt = DeployAttempt::default();

        while self.phase != DeployPhase::Done {
            self.phase = self.phase.next();
            self.execute(self.phase, arming_timeout_ms, &mut attempt);
        }

        let outcome = attempt.finish();
        if outcome.is_clean() {
            info!("antenna deployment completed cleanly");
        } else {
            error!(errors = %outcome.errors, "antenna deployment completed with errors");
        }
        outcome
    }

    fn execute(&mut self, phase: DeployPhase, arming_timeout_ms: u32, attempt: &mut DeployAttempt) {
        match phase {
            DeployPhase::Idle | DeployPhase::Done => {}
            DeployPhase::Arming => self.arm(arming_timeout_ms, attempt),
            DeployPhase::IndependentDeploy(antenna) => self.deploy_independent(antenna, attempt),
            DeployPhase::SequentialDeploy => self.deploy_sequential(attempt),
            DeployPhase::StatusVerification => self.verify(attempt),
            DeployPhase::Disarming => {
                let result = self.driver.disarm();
                attempt.record_result(phase, &result);
            }
        }
    }

    fn arm(&mut self, timeout_ms: u32, attempt: &mut DeployAttempt) {
        let max_attempts = timeout_ms.div_ceil(ARMING_RETRY_INTERVAL_MS);

        let outcome = retry_until(
            &mut *self.driver,
            max_attempts,
            ARMING_RETRY_INTERVAL_MS,
            |driver, n| match driver.arm().and_then(|()| driver.is_armed()) {
                Ok(true) => true,
                Ok(false) => {
                    debug!(attempt = n, "board not armed yet");
                    false
                }
                Err(e) => {
                    warn!(attempt = n, error = %e, "arm attempt failed");
                    false
                }
            },
            |driver, ms| driver.delay_ms(ms),
        );

        attempt.arming_attempts = outcome.attempts();
        match outcome {
            RetryOutcome::Succeeded { attempts } => {
                info!(attempts, "antenna board armed");
                attempt.record(DeployPhase::Arming, PhaseResult::Ok);
            }
            RetryOutcome::TimedOut { attempts } => {
                error!(attempts, timeout_ms, "arming timed out, continuing");
                attempt.record(DeployPhase::Arming, PhaseResult::Failed);
            }
        }
    }

    fn deploy_independent(&mut self, antenna: AntennaId, attempt: &mut DeployAttempt) {
        let burn_time_s = self.timing.independent_burn_time_s;
        info!(%antenna, burn_time_s, "independent deploy");

        let result = self
            .driver
            .start_independent_deploy(antenna, burn_time_s, DeployOverride::With);
        attempt.record_result(DeployPhase::IndependentDeploy(antenna), &result);

        // One burn at a time: wait out the burn whether or not the command
        // was accepted.
        self.driver.delay_s(burn_time_s);
    }

    fn deploy_sequential(&mut self, attempt: &mut DeployAttempt) {
        let burn_time_s = self.timing.sequential_burn_time_s;
        info!(burn_time_s, "sequential deploy");

        let result = self.driver.start_sequential_deploy(burn_time_s);
        attempt.record_result(DeployPhase::SequentialDeploy, &result);

        for _ in 0..SEQUENTIAL_WAIT_BURNS {
            self.driver.delay_s(burn_time_s);
        }
    }

    fn verify(&mut self, attempt: &mut DeployAttempt) {
        let result = self.driver.read_deployment_status();
        if let Ok(status) = &result {
            info!(
                status = %status.summary(),
                deployed = status.deployed_count(),
                "deployment status"
            );
            attempt.status = Some(*status);
        }
        attempt.record_result(DeployPhase::StatusVerification, &result);
    }
}
