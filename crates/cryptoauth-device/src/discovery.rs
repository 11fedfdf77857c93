//! Bus discovery.
//!
//! Every 7-bit address of every I2C bus is woken and asked for its revision
//! word; each single-wire bus is probed once. Failures at one address never
//! stop the scan, and the device is always sent back to idle before the next
//! address is tried.

use std::sync::Arc;

use cryptoauth_hal::{
    BusKey, DEFAULT_I2C_SPEED_HZ, Delay, Hal, I2C_ADDRESS_MAX, I2C_ADDRESS_MIN, InterfaceConfig,
    InterfaceKind, Transport,
};
use cryptoauth_protocol::{
    AtcaResult, Command, CommandBuilder, DeviceFamily, TimingProfile, classify_revision,
};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::device::INFO_MODE_REVISION;
use crate::execution::exchange;

/// Family assumed for unidentified devices and used for the Info probe.
pub const DISCOVERY_FAMILY: DeviceFamily = DeviceFamily::Ecc508A;
pub const DISCOVERY_WAKE_DELAY_US: u32 = 800;
pub const DISCOVERY_RX_RETRIES: u32 = 3;

/// Number of I2C addresses probed per bus.
pub const I2C_SCAN_LEN: usize = (I2C_ADDRESS_MAX - I2C_ADDRESS_MIN) as usize + 1;

/// What one address answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// No wake token.
    Absent,
    /// Woke but the revision read failed.
    Mute,
    Identified(DeviceFamily),
}

impl Probe {
    fn woke(self) -> bool {
        !matches!(self, Self::Absent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusScan {
    pub key: BusKey,
    /// Devices that answered the wake pulse.
    pub found: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub configs: Vec<InterfaceConfig>,
    pub scans: Vec<BusScan>,
}

impl DiscoveryReport {
    /// Total wake responses across all buses.
    pub fn found(&self) -> usize {
        self.scans.iter().map(|scan| scan.found).sum()
    }
}

/// Scans every bus the HAL's platforms report.
pub fn discover(hal: &mut Hal, max: usize) -> DiscoveryReport {
    let i2c = hal.i2c_buses();
    let swi = hal.swi_buses();
    discover_buses(hal, &i2c, &swi, max)
}

/// Scans the given buses and keeps at most `max` configs.
pub fn discover_buses(hal: &mut Hal, i2c: &[u8], swi: &[u8], max: usize) -> DiscoveryReport {
    let mut report = DiscoveryReport::default();
    for &bus in i2c {
        scan_i2c_bus(hal, bus, max, &mut report);
    }
    for &bus in swi {
        scan_swi_bus(hal, bus, max, &mut report);
    }
    info!(
        found = report.found(),
        recorded = report.configs.len(),
        "discovery complete"
    );
    report
}

fn discovery_config(interface: InterfaceKind) -> InterfaceConfig {
    InterfaceConfig {
        interface,
        family: DISCOVERY_FAMILY,
        wake_delay_us: DISCOVERY_WAKE_DELAY_US,
        rx_retries: DISCOVERY_RX_RETRIES,
    }
}

fn i2c_config(bus: u8, address: u8) -> InterfaceConfig {
    discovery_config(InterfaceKind::I2c {
        bus,
        address,
        speed_hz: DEFAULT_I2C_SPEED_HZ,
    })
}

fn scan_i2c_bus(hal: &mut Hal, bus: u8, max: usize, report: &mut DiscoveryReport) {
    let key = BusKey::I2c(bus);
    let delay = hal.delay();

    // Held for the whole scan so the bus stays enabled between addresses.
    let mut anchor = match hal.open(&i2c_config(bus, I2C_ADDRESS_MIN)) {
        Ok(transport) => transport,
        Err(e) => {
            warn!(%key, error = %e, "cannot open bus for discovery");
            report.scans.push(BusScan { key, found: 0 });
            return;
        }
    };

    let mut found = 0usize;
    for address in I2C_ADDRESS_MIN..=I2C_ADDRESS_MAX {
        let outcome = if address == I2C_ADDRESS_MIN {
            probe(anchor.as_mut(), &delay)
        } else {
            match hal.open(&i2c_config(bus, address)) {
                Ok(mut transport) => {
                    let outcome = probe(transport.as_mut(), &delay);
                    release_quietly(hal, transport);
                    outcome
                }
                Err(e) => {
                    warn!(%key, address, error = %e, "cannot open address");
                    Probe::Absent
                }
            }
        };

        if outcome.woke() {
            found = found.saturating_add(1);
        }
        if let Probe::Identified(family) = outcome {
            if report.configs.len() < max {
                report
                    .configs
                    .push(i2c_config(bus, address).with_family(family));
            }
        }
    }

    release_quietly(hal, anchor);
    debug!(%key, found, "i2c bus scanned");
    report.scans.push(BusScan { key, found });
}

fn scan_swi_bus(hal: &mut Hal, bus: u8, max: usize, report: &mut DiscoveryReport) {
    let key = BusKey::Swi(bus);
    let delay = hal.delay();
    let config = discovery_config(InterfaceKind::Swi { bus });

    let outcome = match hal.open(&config) {
        Ok(mut transport) => {
            let outcome = probe(transport.as_mut(), &delay);
            release_quietly(hal, transport);
            outcome
        }
        Err(e) => {
            warn!(%key, error = %e, "cannot open bus for discovery");
            Probe::Absent
        }
    };

    let count = usize::from(outcome.woke());
    if let Probe::Identified(family) = outcome {
        if report.configs.len() < max {
            report.configs.push(config.with_family(family));
        }
    }
    debug!(%key, found = count, "swi bus scanned");
    report.scans.push(BusScan { key, found: count });
}

/// Wakes one device and identifies it.
///
/// A device whose Info command fails is counted but not recorded. One that
/// answers with an unrecognised revision keeps the default family.
fn probe(transport: &mut dyn Transport, delay: &Arc<dyn Delay>) -> Probe {
    let outcome = match transport.wake() {
        Ok(()) => match identify(transport, delay.as_ref()) {
            Ok(family) => Probe::Identified(family),
            Err(e) => {
                debug!(error = %e, "revision read failed");
                Probe::Mute
            }
        },
        Err(e) => {
            trace!(error = %e, "no wake response");
            Probe::Absent
        }
    };

    if let Err(e) = transport.idle() {
        trace!(error = %e, "idle after probe failed");
    }
    outcome
}

fn identify(transport: &mut dyn Transport, delay: &dyn Delay) -> AtcaResult<DeviceFamily> {
    let builder = CommandBuilder::new(TimingProfile::from(DISCOVERY_FAMILY));
    let packet = builder.build(Command::Info, INFO_MODE_REVISION, 0, &[])?;
    let exec_ms = builder
        .execution_time_ms(packet.opcode())?
        .saturating_add(1);
    let response = exchange(transport, delay, &packet, exec_ms)?;

    let revision = response.as_bytes().get(1..5).unwrap_or_default();
    let family = classify_revision(revision).unwrap_or(DISCOVERY_FAMILY);
    debug!(?revision, %family, "device identified");
    Ok(family)
}

fn release_quietly(hal: &mut Hal, transport: Box<dyn Transport>) {
    if let Err(e) = hal.release(transport) {
        warn!(error = %e, "release after probe failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_range() {
        assert_eq!(I2C_SCAN_LEN, 114);
    }

    #[test]
    fn test_discovery_config_defaults() {
        let config = i2c_config(2, 0x60);
        assert_eq!(config.family, DeviceFamily::Ecc508A);
        assert_eq!(config.wake_delay_us, 800);
        assert_eq!(config.rx_retries, 3);
        assert!(config.validate().is_ok());
    }
}
