//! Device handle lifecycle and zone access against the simulated device.

use std::sync::Arc;

use cryptoauth_device::Device;
use cryptoauth_hal::sim::DEFAULT_SERIAL;
use cryptoauth_hal::{
    BusKey, Hal, InterfaceConfig, RecordingDelay, Release, SimI2cPlatform, SimulatedChip,
};
use cryptoauth_protocol::{
    AtcaError, ClockDivider, Command, DeviceFamily, Opcode, TimingProfile, Zone,
};
use proptest::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Bench {
    hal: Hal,
    platform: SimI2cPlatform,
    chip: SimulatedChip,
    delay: RecordingDelay,
}

fn bench(chip: SimulatedChip) -> Bench {
    let platform = SimI2cPlatform::with_buses([0]);
    platform.attach(0, 0x60, chip.clone());
    let delay = RecordingDelay::new();
    let hal = Hal::new(Arc::new(delay.clone())).with_i2c(platform.clone());
    Bench {
        hal,
        platform,
        chip,
        delay,
    }
}

fn config(family: DeviceFamily) -> InterfaceConfig {
    InterfaceConfig::i2c(family, 0, 0x60)
}

#[test]
fn test_init_and_release() -> TestResult {
    let mut b = bench(SimulatedChip::new(DeviceFamily::Ecc508A));
    let device = Device::init(&config(DeviceFamily::Ecc508A), &mut b.hal)?;

    assert_eq!(device.profile(), TimingProfile::Ecc508A);
    assert_eq!(device.bus_key(), BusKey::I2c(0));
    // no traffic for families without a clock divider
    assert!(b.chip.commands().is_empty());

    assert_eq!(device.release(&mut b.hal)?, Release::Disabled);
    assert_eq!(b.platform.stats(0).disables, 1);
    Ok(())
}

#[test]
fn test_init_reads_clock_divider() -> TestResult {
    let chip = SimulatedChip::new(DeviceFamily::Ecc608A).with_clock_divider(ClockDivider::M2);
    let mut b = bench(chip);

    let mut device = Device::init(&config(DeviceFamily::Ecc608A), &mut b.hal)?;
    assert_eq!(
        device.profile(),
        TimingProfile::Ecc608A(ClockDivider::M2)
    );

    // the ChipMode read is one word read of config bytes 16..20
    let commands = b.chip.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(&commands[0][..5], &[0x07, 0x02, 0x00, 0x04, 0x00]);

    b.delay.clear();
    device.execute(Command::Sign, 0x80, 0, &[])?;
    assert_eq!(b.delay.calls(), vec![1500, 665_000]);

    device.release(&mut b.hal)?;
    Ok(())
}

#[test]
fn test_init_failure_releases_bus() {
    let chip = SimulatedChip::new(DeviceFamily::Ecc608A);
    chip.set_wake_enabled(false);
    let mut b = bench(chip);

    let result = Device::init(&config(DeviceFamily::Ecc608A), &mut b.hal);
    assert!(matches!(result, Err(AtcaError::CommFail(_))));
    assert!(!b.hal.is_bus_enabled(BusKey::I2c(0)));
    assert_eq!(b.platform.stats(0).disables, 1);
}

#[test]
fn test_two_devices_share_a_bus() -> TestResult {
    let mut b = bench(SimulatedChip::new(DeviceFamily::Ecc508A));
    let second = SimulatedChip::new(DeviceFamily::Sha204A);
    b.platform.attach(0, 0x64, second.clone());

    let mut ecc = Device::init(&config(DeviceFamily::Ecc508A), &mut b.hal)?;
    let mut sha = Device::init(&InterfaceConfig::sha204a_i2c_default(), &mut b.hal)?;
    assert_eq!(b.hal.bus_ref_count(BusKey::I2c(0)), 2);

    assert_eq!(ecc.info()?, [0x00, 0x00, 0x50, 0x00]);
    assert_eq!(sha.info()?, [0x00, 0x02, 0x00, 0x08]);
    assert!(!sha.supports(Opcode::Sign));
    assert!(matches!(
        sha.execute(Command::Sign, 0x80, 0, &[]),
        Err(AtcaError::BadOpcode { .. })
    ));
    assert_eq!(second.commands().len(), 1);

    assert_eq!(ecc.release(&mut b.hal)?, Release::Shared { remaining: 1 });
    assert_eq!(sha.release(&mut b.hal)?, Release::Disabled);
    Ok(())
}

#[test]
fn test_every_command_ends_in_idle() -> TestResult {
    let mut b = bench(SimulatedChip::new(DeviceFamily::Ecc508A));
    let mut device = Device::init(&config(DeviceFamily::Ecc508A), &mut b.hal)?;

    device.random()?;
    device.info()?;
    device.read_zone(Zone::Config, 0, 0, 0, 4)?;

    let counters = b.chip.counters();
    assert_eq!(counters.wakes, 3);
    assert_eq!(counters.idles, 3);
    device.release(&mut b.hal)?;
    Ok(())
}

#[test]
fn test_random_changes() -> TestResult {
    let mut b = bench(SimulatedChip::new(DeviceFamily::Ecc608A));
    let mut device = Device::init(&config(DeviceFamily::Ecc608A), &mut b.hal)?;
    let first = device.random()?;
    let second = device.random()?;
    assert_ne!(first, second);
    device.release(&mut b.hal)?;
    Ok(())
}

#[test]
fn test_serial_number() -> TestResult {
    for family in [DeviceFamily::Sha204A, DeviceFamily::Ecc508A] {
        let mut b = bench(SimulatedChip::new(family));
        let mut device = Device::init(&config(family), &mut b.hal)?;
        assert_eq!(device.serial_number()?, DEFAULT_SERIAL);
        // one block read
        assert_eq!(b.chip.commands().len(), 1);
        device.release(&mut b.hal)?;
    }
    Ok(())
}

#[test]
fn test_write_then_read_bytes_in_large_slot() -> TestResult {
    let mut b = bench(SimulatedChip::new(DeviceFamily::Ecc508A));
    let mut device = Device::init(&config(DeviceFamily::Ecc508A), &mut b.hal)?;

    // 32-byte aligned block, then two words
    let data: Vec<u8> = (0u8..40).collect();
    device.write_bytes_zone(Zone::Data, 8, 64, &data)?;
    assert_eq!(b.chip.commands().len(), 3);

    let slot = b.chip.slot(8).unwrap_or_default();
    assert_eq!(&slot[64..104], data.as_slice());

    let back = device.read_bytes_zone(Zone::Data, 8, 62, 20)?;
    let mut expected = vec![0, 0];
    expected.extend(0u8..18);
    assert_eq!(back, expected);

    device.release(&mut b.hal)?;
    Ok(())
}

#[test]
fn test_zone_bounds_checked_before_io() -> TestResult {
    let mut b = bench(SimulatedChip::new(DeviceFamily::Ecc508A));
    let mut device = Device::init(&config(DeviceFamily::Ecc508A), &mut b.hal)?;

    assert!(matches!(
        device.read_bytes_zone(Zone::Data, 0, 30, 8),
        Err(AtcaError::BadParam(_))
    ));
    assert!(matches!(
        device.write_bytes_zone(Zone::Data, 0, 2, &[0; 4]),
        Err(AtcaError::BadParam(_))
    ));
    assert!(matches!(
        device.write_bytes_zone(Zone::Otp, 0, 0, &[0; 6]),
        Err(AtcaError::BadParam(_))
    ));
    assert!(matches!(
        device.read_bytes_zone(Zone::Data, 16, 0, 4),
        Err(AtcaError::BadParam(_))
    ));
    assert!(matches!(
        device.read_zone(Zone::Config, 0, 0, 0, 8),
        Err(AtcaError::BadParam(_))
    ));
    assert!(b.chip.commands().is_empty());

    device.release(&mut b.hal)?;
    Ok(())
}

mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_read_bytes_matches_config_zone(offset in 0usize..128, len in 0usize..64) {
            prop_assume!(offset + len <= 128);
            let chip = SimulatedChip::new(DeviceFamily::Ecc508A);
            let expected = chip.config_zone()[offset..offset + len].to_vec();
            let mut b = bench(chip);
            let mut device = Device::init(&config(DeviceFamily::Ecc508A), &mut b.hal)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            let read = device
                .read_bytes_zone(Zone::Config, 0, offset, len)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            prop_assert_eq!(read, expected);
        }
    }
}
