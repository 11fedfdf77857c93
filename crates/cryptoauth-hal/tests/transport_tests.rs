//! I2C and single-wire transports against the simulated device.

use std::sync::Arc;

use cryptoauth_hal::i2c::{WAKE_SPEED_HZ, WORD_ADDRESS_IDLE, WORD_ADDRESS_SLEEP};
use cryptoauth_hal::sim::PowerState;
use cryptoauth_hal::swi::{SWI_BAUD, SWI_FLAG_IDLE, SWI_WAKE_BAUD, encode};
use cryptoauth_hal::{
    BusResource, Hal, I2cBus, I2cPlatform, InterfaceConfig, InterfaceKind, RecordingDelay,
    SimI2cPlatform, SimUartPlatform, SimulatedChip, Transport, UartPlatform, UartPort,
};
use cryptoauth_protocol::{
    AtcaError, AtcaResult, Command, CommandBuilder, DeviceFamily, Response, SUCCESS_FRAME,
    TimingProfile, verify_frame,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn i2c_hal(chip: Option<SimulatedChip>) -> (Hal, SimI2cPlatform, RecordingDelay) {
    let platform = SimI2cPlatform::with_buses([0]);
    if let Some(chip) = chip {
        platform.attach(0, 0x60, chip);
    }
    let delay = RecordingDelay::new();
    let hal = Hal::new(Arc::new(delay.clone())).with_i2c(platform.clone());
    (hal, platform, delay)
}

fn swi_hal(chip: Option<SimulatedChip>) -> (Hal, SimUartPlatform) {
    let platform = SimUartPlatform::new();
    platform.add_bus(0);
    if let Some(chip) = chip {
        platform.attach(0, chip);
    }
    let hal = Hal::new(Arc::new(RecordingDelay::new())).with_uart(platform.clone());
    (hal, platform)
}

fn info_frame(family: DeviceFamily) -> Result<Vec<u8>, AtcaError> {
    let builder = CommandBuilder::new(TimingProfile::from(family));
    Ok(builder.build(Command::Info, 0, 0, &[])?.as_bytes().to_vec())
}

#[test]
fn test_i2c_wake_switches_speed_and_restores() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Ecc608A);
    let (mut hal, platform, delay) = i2c_hal(Some(chip.clone()));
    let mut transport = hal.open(&InterfaceConfig::ecc608a_i2c_default())?;

    transport.wake()?;

    assert_eq!(chip.power_state(), PowerState::Awake);
    assert_eq!(platform.stats(0).speeds, vec![400_000, WAKE_SPEED_HZ, 400_000]);
    assert_eq!(platform.stats(0).wake_pulses, 1);
    assert_eq!(delay.calls(), vec![1500]);

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_i2c_wake_at_100khz_keeps_speed() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Ecc508A);
    let (mut hal, platform, _) = i2c_hal(Some(chip));
    let mut config = InterfaceConfig::ecc508a_i2c_default();
    config.interface = InterfaceKind::I2c {
        bus: 0,
        address: 0x60,
        speed_hz: 100_000,
    };
    let mut transport = hal.open(&config)?;

    transport.wake()?;
    assert_eq!(platform.stats(0).speeds, vec![100_000]);

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_i2c_wake_without_device_fails_and_restores_speed() -> TestResult {
    let (mut hal, platform, _) = i2c_hal(None);
    let mut transport = hal.open(&InterfaceConfig::ecc508a_i2c_default())?;

    let result = transport.wake();
    assert!(matches!(result, Err(AtcaError::CommFail(_))));
    assert_eq!(platform.stats(0).speeds.last(), Some(&400_000));

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_i2c_wake_without_token_fails() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Ecc508A);
    chip.set_wake_enabled(false);
    let (mut hal, _, _) = i2c_hal(Some(chip.clone()));
    let mut transport = hal.open(&InterfaceConfig::ecc508a_i2c_default())?;

    assert!(matches!(transport.wake(), Err(AtcaError::CommFail(_))));
    assert_eq!(chip.power_state(), PowerState::Asleep);

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_i2c_command_round_trip() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Ecc508A);
    let (mut hal, platform, _) = i2c_hal(Some(chip.clone()));
    let mut transport = hal.open(&InterfaceConfig::ecc508a_i2c_default())?;

    let frame = info_frame(DeviceFamily::Ecc508A)?;
    transport.wake()?;
    transport.send(&frame)?;

    let mut buf = [0u8; 7];
    let read = transport.receive(&mut buf)?;
    assert_eq!(read, 7);
    verify_frame(&buf)?;
    assert_eq!(Response::from(buf.to_vec()).data(), &[0x00, 0x00, 0x50, 0x00]);

    // the command went out behind the 0x03 word address
    let sent = platform.stats(0).writes;
    assert_eq!(sent.first().map(|w| w[0]), Some(0x03));
    assert_eq!(sent.first().map(|w| w[1..].to_vec()), Some(frame.clone()));
    assert_eq!(chip.commands(), vec![frame]);

    transport.idle()?;
    assert_eq!(platform.stats(0).writes.last(), Some(&vec![WORD_ADDRESS_IDLE]));
    assert_eq!(chip.power_state(), PowerState::Idle);

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_i2c_receive_from_silent_device() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Ecc508A);
    chip.set_silent(true);
    let (mut hal, _, _) = i2c_hal(Some(chip));
    let mut transport = hal.open(&InterfaceConfig::ecc508a_i2c_default().with_rx_retries(3))?;

    transport.wake()?;
    transport.send(&info_frame(DeviceFamily::Ecc508A)?)?;
    let mut buf = [0u8; 7];
    assert_eq!(transport.receive(&mut buf)?, 0);

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_i2c_receive_truncates_to_count_byte() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Ecc508A);
    chip.script_response(vec![0x04, 0x00, 0x03, 0x40, 0xAA, 0xBB]);
    let (mut hal, _, _) = i2c_hal(Some(chip));
    let mut transport = hal.open(&InterfaceConfig::ecc508a_i2c_default())?;

    transport.wake()?;
    transport.send(&info_frame(DeviceFamily::Ecc508A)?)?;
    let mut buf = [0u8; 35];
    assert_eq!(transport.receive(&mut buf)?, 4);
    assert_eq!(&buf[..4], &SUCCESS_FRAME);

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_i2c_sleep() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Ecc508A);
    let (mut hal, platform, _) = i2c_hal(Some(chip.clone()));
    let mut transport = hal.open(&InterfaceConfig::ecc508a_i2c_default())?;

    transport.wake()?;
    transport.sleep()?;
    assert_eq!(platform.stats(0).writes.last(), Some(&vec![WORD_ADDRESS_SLEEP]));
    assert_eq!(chip.power_state(), PowerState::Asleep);
    assert_eq!(chip.counters().sleeps, 1);

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_swi_wake_and_command() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Sha204A);
    let (mut hal, platform) = swi_hal(Some(chip.clone()));
    let config = InterfaceConfig::swi(DeviceFamily::Sha204A, 0);
    let mut transport = hal.open(&config)?;

    transport.wake()?;
    assert_eq!(platform.stats(0).speeds, vec![SWI_BAUD, SWI_WAKE_BAUD, SWI_BAUD]);
    assert_eq!(platform.stats(0).wake_pulses, 1);

    let frame = info_frame(DeviceFamily::Sha204A)?;
    transport.send(&frame)?;
    let mut buf = [0u8; 7];
    assert_eq!(transport.receive(&mut buf)?, 7);
    verify_frame(&buf)?;
    assert_eq!(&buf[1..5], &[0x00, 0x02, 0x00, 0x08]);
    assert_eq!(chip.commands(), vec![frame]);

    transport.idle()?;
    assert_eq!(platform.stats(0).writes.last(), Some(&encode(&[SWI_FLAG_IDLE])));
    assert_eq!(chip.power_state(), PowerState::Idle);

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_swi_wake_without_device_fails() -> TestResult {
    let (mut hal, _) = swi_hal(None);
    let mut transport = hal.open(&InterfaceConfig::ecc508a_swi_default().with_rx_retries(2))?;
    assert!(matches!(transport.wake(), Err(AtcaError::CommFail(_))));
    hal.release(transport)?;
    Ok(())
}

/// Wraps a simulated bus and fails the first `failures` reads.
struct FlakyI2c {
    inner: SimI2cPlatform,
    failures: u32,
}

struct FlakyI2cBus {
    inner: Box<dyn I2cBus>,
    failures: u32,
}

impl I2cPlatform for FlakyI2c {
    fn buses(&self) -> Vec<u8> {
        self.inner.buses()
    }

    fn open(&mut self, bus: u8, speed_hz: u32) -> AtcaResult<Box<dyn I2cBus>> {
        Ok(Box::new(FlakyI2cBus {
            inner: self.inner.open(bus, speed_hz)?,
            failures: self.failures,
        }))
    }
}

impl BusResource for FlakyI2cBus {
    fn disable(&mut self) -> AtcaResult<()> {
        self.inner.disable()
    }
}

impl I2cBus for FlakyI2cBus {
    fn set_speed(&mut self, speed_hz: u32) -> AtcaResult<()> {
        self.inner.set_speed(speed_hz)
    }

    fn speed(&self) -> u32 {
        self.inner.speed()
    }

    fn write(&mut self, address: u8, data: &[u8]) -> AtcaResult<()> {
        self.inner.write(address, data)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> AtcaResult<usize> {
        if self.failures > 0 {
            self.failures = self.failures.saturating_sub(1);
            return Err(AtcaError::comm_fail("nack"));
        }
        self.inner.read(address, buf)
    }
}

struct FlakyUart {
    inner: SimUartPlatform,
    failures: u32,
}

struct FlakyUartPort {
    inner: Box<dyn UartPort>,
    failures: u32,
}

impl UartPlatform for FlakyUart {
    fn buses(&self) -> Vec<u8> {
        self.inner.buses()
    }

    fn open(&mut self, bus: u8, baud: u32) -> AtcaResult<Box<dyn UartPort>> {
        Ok(Box::new(FlakyUartPort {
            inner: self.inner.open(bus, baud)?,
            failures: self.failures,
        }))
    }
}

impl BusResource for FlakyUartPort {
    fn disable(&mut self) -> AtcaResult<()> {
        self.inner.disable()
    }
}

impl UartPort for FlakyUartPort {
    fn set_baud(&mut self, baud: u32) -> AtcaResult<()> {
        self.inner.set_baud(baud)
    }

    fn write(&mut self, data: &[u8]) -> AtcaResult<()> {
        self.inner.write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> AtcaResult<usize> {
        if self.failures > 0 {
            self.failures = self.failures.saturating_sub(1);
            return Err(AtcaError::comm_fail("framing error"));
        }
        self.inner.read(buf)
    }
}

fn flaky_i2c_hal(chip: &SimulatedChip, failures: u32) -> (Hal, SimI2cPlatform) {
    let platform = SimI2cPlatform::with_buses([0]);
    platform.attach(0, 0x60, chip.clone());
    let flaky = FlakyI2c {
        inner: platform.clone(),
        failures,
    };
    let hal = Hal::new(Arc::new(RecordingDelay::new())).with_i2c(flaky);
    (hal, platform)
}

#[test]
fn test_i2c_wake_retries_through_nack() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Ecc508A);
    let (mut hal, platform) = flaky_i2c_hal(&chip, 1);
    let mut transport = hal.open(&InterfaceConfig::ecc508a_i2c_default().with_rx_retries(3))?;

    transport.wake()?;
    assert_eq!(chip.power_state(), PowerState::Awake);
    assert_eq!(platform.stats(0).speeds, vec![400_000, WAKE_SPEED_HZ, 400_000]);

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_i2c_wake_gives_up_after_rx_retries() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Ecc508A);
    let (mut hal, platform) = flaky_i2c_hal(&chip, 3);
    let mut transport = hal.open(&InterfaceConfig::ecc508a_i2c_default().with_rx_retries(3))?;

    assert!(matches!(transport.wake(), Err(AtcaError::CommFail(_))));
    // speed is restored even when the token never arrives
    assert_eq!(platform.stats(0).speeds.last(), Some(&400_000));

    hal.release(transport)?;
    Ok(())
}

#[test]
fn test_swi_receive_retries_through_errors() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Sha204A);
    let platform = SimUartPlatform::new();
    platform.attach(0, chip.clone());
    let flaky = FlakyUart {
        inner: platform.clone(),
        failures: 1,
    };
    let mut hal = Hal::new(Arc::new(RecordingDelay::new())).with_uart(flaky);
    let config = InterfaceConfig::swi(DeviceFamily::Sha204A, 0).with_rx_retries(3);
    let mut transport = hal.open(&config)?;

    transport.wake()?;
    assert_eq!(chip.power_state(), PowerState::Awake);

    hal.release(transport)?;
    Ok(())
}
