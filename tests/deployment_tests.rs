use obdh_antenna::deployment::*;
use obdh_antenna::drivers::{AntennaDriver, AntennaError, DriverKind, SlAntenna};
use obdh_antenna::protocol::{AntennaId, DeployOverride};
use obdh_antenna::bus::BusError;
use obdh_antenna::sim::{SimulatedDeployPin, VirtualClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Arm,
    IsArmed,
    Disarm,
    Independent(AntennaId, u8, DeployOverride),
    Sequential(u8),
    ReadStatus,
    Delay(u32),
}

/// Driver double that records every call in order.
#[derive(Default)]
struct ScriptedDriver {
    calls: Vec<Call>,
    fail_everything: bool,
    /// Arm attempt on which the board starts reporting armed.
    armed_on_attempt: Option<u32>,
    arm_attempts: u32,
    status_code: u16,
}

impl ScriptedDriver {
    fn failing() -> Self {
        Self { fail_everything: true, ..Self::default() }
    }

    fn healthy(status_code: u16) -> Self {
        Self { armed_on_attempt: Some(1), status_code, ..Self::default() }
    }

    fn result(&self) -> Result<(), AntennaError> {
        if self.fail_everything {
            Err(AntennaError::Bus(BusError::Nack))
        } else {
            Ok(())
        }
    }

    fn count(&self, call: Call) -> usize {
        self.calls.iter().filter(|&&c| c == call).count()
    }

    /// Calls before the first independent deploy.
    fn arming_calls(&self) -> Vec<Call> {
        self.calls
            .iter()
            .take_while(|c| !matches!(c, Call::Independent(..)))
            .copied()
            .collect()
    }
}

impl AntennaDriver for ScriptedDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Isis
    }

    fn init(&mut self) -> Result<(), AntennaError> {
        self.result()
    }

    fn arm(&mut self) -> Result<(), AntennaError> {
        self.calls.push(Call::Arm);
        self.arm_attempts += 1;
        self.result()
    }

    fn disarm(&mut self) -> Result<(), AntennaError> {
        self.calls.push(Call::Disarm);
        self.result()
    }

    fn is_armed(&mut self) -> Result<bool, AntennaError> {
        self.calls.push(Call::IsArmed);
        self.result()?;
        Ok(self.armed_on_attempt.map_or(false, |n| self.arm_attempts >= n))
    }

    fn start_independent_deploy(
        &mut self,
        antenna: AntennaId,
        burn_time_s: u8,
        override_switch: DeployOverride,
    ) -> Result<(), AntennaError> {
        self.calls.push(Call::Independent(antenna, burn_time_s, override_switch));
        self.result()
    }

    fn start_sequential_deploy(&mut self, burn_time_s: u8) -> Result<(), AntennaError> {
        self.calls.push(Call::Sequential(burn_time_s));
        self.result()
    }

    fn read_deployment_status_code(&mut self) -> Result<u16, AntennaError> {
        self.calls.push(Call::ReadStatus);
        self.result()?;
        Ok(self.status_code)
    }

    fn read_raw_temperature(&mut self) -> Result<u16, AntennaError> {
        self.result()?;
        Ok(560)
    }

    fn delay_s(&mut self, s: u8) {
        self.delay_ms(u32::from(s) * 1000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(Call::Delay(ms));
    }
}

fn run(driver: &mut ScriptedDriver, arming_timeout_ms: u32) -> DeployOutcome {
    DeploymentController::new(driver, DeployTiming::default()).run(arming_timeout_ms)
}

#[test]
fn test_every_failure_counts_once_per_phase() {
    let mut driver = ScriptedDriver::failing();
    let outcome = run(&mut driver, 3000);

    // Arming, four independent deploys, sequential, verification, disarm.
    assert_eq!(outcome.errors.count(), 8);
    assert_eq!(outcome.errors.as_i32(), 8);
    assert!(outcome.final_status.is_none());
    assert_eq!(outcome.failed_phases().count(), 8);
}

#[test]
fn test_failing_run_issues_calls_in_order() {
    let mut driver = ScriptedDriver::failing();
    run(&mut driver, 3000);

    let mut expected = vec![
        Call::Arm,
        Call::Delay(1000),
        Call::Arm,
        Call::Delay(1000),
        Call::Arm,
        Call::Delay(1000),
    ];
    for antenna in AntennaId::ALL {
        expected.push(Call::Independent(antenna, DEFAULT_INDEPENDENT_BURN_TIME_S, DeployOverride::With));
        expected.push(Call::Delay(u32::from(DEFAULT_INDEPENDENT_BURN_TIME_S) * 1000));
    }
    expected.push(Call::Sequential(DEFAULT_SEQUENTIAL_BURN_TIME_S));
    for _ in 0..SEQUENTIAL_WAIT_BURNS {
        expected.push(Call::Delay(u32::from(DEFAULT_SEQUENTIAL_BURN_TIME_S) * 1000));
    }
    expected.push(Call::ReadStatus);
    expected.push(Call::Disarm);

    assert_eq!(driver.calls, expected);
}

#[test]
fn test_clean_run_reports_final_status() {
    let mut driver = ScriptedDriver::healthy(0x0001);
    let outcome = run(&mut driver, 20_000);

    assert!(outcome.is_clean());
    assert_eq!(outcome.errors, ErrorTally::CLEAN);
    assert_eq!(outcome.arming_attempts, 1);

    let status = outcome.final_status.expect("verification read succeeded");
    assert_eq!(status.code, 0x0001);
    assert!(status.all_deployed());
    assert!(status.armed);
}

#[test]
fn test_phases_are_recorded_in_sequence() {
    let mut driver = ScriptedDriver::healthy(0x0000);
    let outcome = run(&mut driver, 5000);

    let phases: Vec<DeployPhase> = outcome.phases.iter().map(|r| r.phase).collect();
    assert_eq!(
        phases,
        vec![
            DeployPhase::Arming,
            DeployPhase::IndependentDeploy(AntennaId::Ant1),
            DeployPhase::IndependentDeploy(AntennaId::Ant2),
            DeployPhase::IndependentDeploy(AntennaId::Ant3),
            DeployPhase::IndependentDeploy(AntennaId::Ant4),
            DeployPhase::SequentialDeploy,
            DeployPhase::StatusVerification,
            DeployPhase::Disarming,
        ]
    );
    assert!(outcome.phases.iter().all(|r| r.result == PhaseResult::Ok));
}

#[test]
fn test_arming_succeeds_on_later_attempt() {
    let mut driver = ScriptedDriver { armed_on_attempt: Some(3), ..ScriptedDriver::default() };
    let outcome = run(&mut driver, 20_000);

    assert_eq!(outcome.arming_attempts, 3);
    assert!(outcome.is_clean());
    assert_eq!(
        driver.arming_calls(),
        vec![
            Call::Arm,
            Call::IsArmed,
            Call::Delay(1000),
            Call::Arm,
            Call::IsArmed,
            Call::Delay(1000),
            Call::Arm,
            Call::IsArmed,
        ]
    );
}

#[test]
fn test_board_never_reports_armed() {
    let mut driver = ScriptedDriver { armed_on_attempt: None, ..ScriptedDriver::default() };
    let outcome = run(&mut driver, 4000);

    assert_eq!(outcome.arming_attempts, 4);
    assert_eq!(driver.count(Call::IsArmed), 4);
    assert_eq!(outcome.errors.count(), 1);
    assert_eq!(outcome.failed_phases().collect::<Vec<_>>(), vec![DeployPhase::Arming]);
}

#[test]
fn test_zero_timeout_skips_arming_and_continues() {
    let mut driver = ScriptedDriver::healthy(0x8888);
    let outcome = run(&mut driver, 0);

    assert_eq!(driver.count(Call::Arm), 0);
    assert_eq!(outcome.arming_attempts, 0);
    assert_eq!(outcome.errors.count(), 1);
    assert_eq!(driver.count(Call::Disarm), 1);
    assert_eq!(outcome.final_status.map(|s| s.deployed_count()), Some(0));
}

#[test]
fn test_partial_second_rounds_up() {
    let mut driver = ScriptedDriver::failing();
    let outcome = run(&mut driver, 1500);

    assert_eq!(outcome.arming_attempts, 2);
    assert_eq!(driver.count(Call::Arm), 2);
}

#[test]
fn test_custom_burn_times() {
    let mut driver = ScriptedDriver::healthy(0x0000);
    let timing = DeployTiming { independent_burn_time_s: 5, sequential_burn_time_s: 3 };
    let outcome = DeploymentController::new(&mut driver, timing).run(1000);

    assert!(outcome.is_clean());
    assert_eq!(driver.count(Call::Independent(AntennaId::Ant2, 5, DeployOverride::With)), 1);
    assert_eq!(driver.count(Call::Sequential(3)), 1);
    assert_eq!(driver.count(Call::Delay(5000)), 4);
    assert_eq!(driver.count(Call::Delay(3000)), 4);
}

#[test]
fn test_controller_starts_idle() {
    let mut driver = ScriptedDriver::default();
    let controller = DeploymentController::new(&mut driver, DeployTiming::default());
    assert_eq!(controller.phase(), DeployPhase::Idle);
    assert_eq!(DeployPhase::Disarming.next(), DeployPhase::Done);
    assert_eq!(DeployPhase::Done.next(), DeployPhase::Done);
}

#[test]
fn test_runs_through_trait_object() {
    let mut driver: Box<dyn AntennaDriver> = Box::new(ScriptedDriver::healthy(0x0001));
    let outcome = DeploymentController::new(&mut driver, DeployTiming::default()).run(2000);
    assert!(outcome.is_clean());
}

#[test]
fn test_gpio_antenna_skips_unsupported_phases() {
    let mut driver = SlAntenna::new(SimulatedDeployPin::new(), VirtualClock::new());
    let outcome = DeploymentController::new(&mut driver, DeployTiming::default()).run(20_000);

    assert!(outcome.is_clean());
    assert!(outcome.final_status.is_none());
    assert_eq!(outcome.arming_attempts, 1);

    let results: Vec<PhaseResult> = outcome.phases.iter().map(|r| r.result).collect();
    assert_eq!(
        results,
        vec![
            PhaseResult::Ok,
            PhaseResult::Skipped,
            PhaseResult::Skipped,
            PhaseResult::Skipped,
            PhaseResult::Skipped,
            PhaseResult::Ok,
            PhaseResult::Skipped,
            PhaseResult::Ok,
        ]
    );

    let (pin, _) = driver.release();
    assert_eq!(pin.levels(), &[true, false, true, false, false]);
    assert!(!pin.is_high());
}
