use obdh_antenna::antenna::*;
use obdh_antenna::bus::BusError;
use obdh_antenna::config::AntennaConfig;
use obdh_antenna::deployment::DeployTiming;
use obdh_antenna::drivers::{AntennaDriver, AntennaError, DriverKind, SlAntenna};
use obdh_antenna::protocol::{AntennaId, DeployOverride};
use obdh_antenna::sim::{SimulatedDeployPin, VirtualClock};
use obdh_antenna::status::decode_status;

#[derive(Default)]
struct StubDriver {
    init_calls: u32,
    status_reads: u32,
    fail_init: bool,
    fail_status: bool,
    fail_temperature: bool,
    status_code: u16,
    temperature: u16,
}

fn nack<T>() -> Result<T, AntennaError> {
    Err(AntennaError::Bus(BusError::Nack))
}

impl AntennaDriver for StubDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Isis
    }

    fn init(&mut self) -> Result<(), AntennaError> {
        self.init_calls += 1;
        if self.fail_init {
            return nack();
        }
        Ok(())
    }

    fn arm(&mut self) -> Result<(), AntennaError> {
        Ok(())
    }

    fn disarm(&mut self) -> Result<(), AntennaError> {
        Ok(())
    }

    fn start_independent_deploy(&mut self, _: AntennaId, _: u8, _: DeployOverride) -> Result<(), AntennaError> {
        Ok(())
    }

    fn start_sequential_deploy(&mut self, _: u8) -> Result<(), AntennaError> {
        Ok(())
    }

    fn read_deployment_status_code(&mut self) -> Result<u16, AntennaError> {
        self.status_reads += 1;
        if self.fail_status {
            return nack();
        }
        Ok(self.status_code)
    }

    fn read_raw_temperature(&mut self) -> Result<u16, AntennaError> {
        if self.fail_temperature {
            return nack();
        }
        Ok(self.temperature)
    }

    fn delay_s(&mut self, _: u8) {}

    fn delay_ms(&mut self, _: u32) {}
}

fn device(driver: StubDriver) -> AntennaDevice<StubDriver> {
    AntennaDevice::new(driver, DeployTiming::default())
}

#[test]
fn test_init_runs_once() {
    let mut device = device(StubDriver::default());
    assert!(!device.is_initialized());
    device.init().unwrap();
    assert!(device.is_initialized());

    // A second init must not touch the hardware, even if it would now fail.
    device.driver_mut().fail_init = true;
    device.driver_mut().fail_status = true;
    assert_eq!(device.init(), Ok(()));
    assert_eq!(device.driver().init_calls, 1);
    assert_eq!(device.driver().status_reads, 1);
}

#[test]
fn test_init_failure_can_be_retried() {
    let mut device = device(StubDriver { fail_init: true, ..StubDriver::default() });
    assert_eq!(device.init(), Err(AntennaError::InitFailed));
    assert!(!device.is_initialized());
    assert_eq!(device.driver().status_reads, 0);

    device.driver_mut().fail_init = false;
    assert_eq!(device.init(), Ok(()));
    assert_eq!(device.driver().init_calls, 2);
}

#[test]
fn test_init_fails_on_temperature_read() {
    let mut device = device(StubDriver { fail_temperature: true, ..StubDriver::default() });
    assert_eq!(device.init(), Err(AntennaError::InitFailed));
    assert!(!device.is_initialized());
}

#[test]
fn test_init_fails_on_status_read() {
    let mut device = device(StubDriver { fail_status: true, ..StubDriver::default() });
    assert_eq!(device.init(), Err(AntennaError::InitFailed));
    assert!(!device.is_initialized());
}

#[test]
fn test_init_tolerates_missing_sensors() {
    let driver = SlAntenna::new(SimulatedDeployPin::new(), VirtualClock::new());
    let mut device = AntennaDevice::new(driver, DeployTiming::default());
    assert_eq!(device.init(), Ok(()));

    let (pin, _) = device.into_driver().release();
    assert_eq!(pin.levels(), &[false]);
}

#[test]
fn test_get_data_reads_both_values() {
    let mut device = device(StubDriver { status_code: 0x0888, temperature: 560, ..StubDriver::default() });
    let data = device.get_data().unwrap();

    assert_eq!(data.status, decode_status(0x0888));
    assert_eq!(data.status.deployed_count(), 1);
    assert_eq!(data.temperature, 560);
    assert_eq!(data.temperature_celsius(), Some(25));
    assert!(!data.is_poisoned());
}

#[test]
fn test_failed_status_read_poisons_data() {
    let mut device = device(StubDriver { fail_status: true, temperature: 560, ..StubDriver::default() });
    let mut data = AntennaData { status: decode_status(0x0000), temperature: 600 };

    assert_eq!(device.get_data_into(&mut data), Err(AntennaError::Bus(BusError::Nack)));
    assert!(data.is_poisoned());
    assert_eq!(data.status.code, STATUS_UNKNOWN);
    assert_eq!(data.temperature_celsius(), None);
}

#[test]
fn test_failed_temperature_read_discards_status() {
    let mut device = device(StubDriver { fail_temperature: true, status_code: 0x0000, ..StubDriver::default() });
    let mut data = AntennaData { status: decode_status(0x8888), temperature: 560 };

    assert!(device.get_data_into(&mut data).is_err());
    assert_eq!(data, AntennaData::poisoned());
}

#[test]
fn test_default_data_is_poisoned() {
    assert!(AntennaData::default().is_poisoned());
}

#[test]
fn test_config_sets_burn_timing() {
    let config = AntennaConfig { independent_burn_time_s: 4, sequential_burn_time_s: 2, ..AntennaConfig::default() };
    let device = AntennaDevice::from_config(StubDriver::default(), &config);
    assert_eq!(device.timing(), DeployTiming { independent_burn_time_s: 4, sequential_burn_time_s: 2 });
}

#[test]
fn test_deploy_through_facade() {
    let mut device = device(StubDriver { status_code: 0x0000, ..StubDriver::default() });
    let outcome = device.deploy(2000);

    // The stub never reports armed through the status word.
    assert_eq!(outcome.errors.count(), 1);
    assert_eq!(outcome.arming_attempts, 2);
    assert!(outcome.final_status.unwrap().all_deployed());
}

#[test]
fn test_reports_unsupported_without_counters() {
    let driver = SlAntenna::new(SimulatedDeployPin::new(), VirtualClock::new());
    let mut device = AntennaDevice::new(driver, DeployTiming::default());
    assert!(device.activation_reports().unwrap_err().is_unsupported());
}
