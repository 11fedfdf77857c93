//! Simulated I2C buses with devices attached by address.

use std::collections::BTreeMap;
use std::sync::Arc;

use cryptoauth_protocol::{AtcaError, AtcaResult};
use parking_lot::Mutex;

use super::chip::SimulatedChip;
use super::BusStats;
use crate::bus::{BusResource, I2cBus, I2cPlatform};
use crate::i2c::{
    GENERAL_CALL_ADDRESS, WAKE_SPEED_HZ, WORD_ADDRESS_COMMAND, WORD_ADDRESS_IDLE,
    WORD_ADDRESS_RESET, WORD_ADDRESS_SLEEP,
};

#[derive(Debug, Default)]
struct SimBus {
    devices: BTreeMap<u8, SimulatedChip>,
    stats: BusStats,
}

/// An I2C platform whose buses exist only in memory.
///
/// Clones share the same buses, so a test can inspect traffic after handing
/// a clone to [`crate::Hal`].
#[derive(Debug, Clone, Default)]
pub struct SimI2cPlatform {
    buses: Arc<Mutex<BTreeMap<u8, SimBus>>>,
}

impl SimI2cPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform with the given empty buses.
    pub fn with_buses(buses: impl IntoIterator<Item = u8>) -> Self {
        let platform = Self::new();
        for bus in buses {
            platform.add_bus(bus);
        }
        platform
    }

    pub fn add_bus(&self, bus: u8) {
        self.buses.lock().entry(bus).or_default();
    }

    /// Attaches `chip` at 7-bit `address`, creating the bus if needed.
    pub fn attach(&self, bus: u8, address: u8, chip: SimulatedChip) {
        self.buses
            .lock()
            .entry(bus)
            .or_default()
            .devices
            .insert(address, chip);
    }

    pub fn stats(&self, bus: u8) -> BusStats {
        self.buses
            .lock()
            .get(&bus)
            .map(|b| b.stats.clone())
            .unwrap_or_default()
    }
}

impl I2cPlatform for SimI2cPlatform {
    fn buses(&self) -> Vec<u8> {
        self.buses.lock().keys().copied().collect()
    }

    fn open(&mut self, bus: u8, speed_hz: u32) -> AtcaResult<Box<dyn I2cBus>> {
        let mut buses = self.buses.lock();
        let sim = buses
            .get_mut(&bus)
            .ok_or_else(|| AtcaError::comm_fail(format!("no simulated I2C bus {bus}")))?;
        sim.stats.opens = sim.stats.opens.saturating_add(1);
        sim.stats.speeds.push(speed_hz);
        Ok(Box::new(SimI2cBus {
            bus,
            speed_hz,
            buses: Arc::clone(&self.buses),
        }))
    }
}

struct SimI2cBus {
    bus: u8,
    speed_hz: u32,
    buses: Arc<Mutex<BTreeMap<u8, SimBus>>>,
}

impl SimI2cBus {
    fn with_bus<R>(&self, f: impl FnOnce(&mut SimBus) -> AtcaResult<R>) -> AtcaResult<R> {
        let mut buses = self.buses.lock();
        let sim = buses
            .get_mut(&self.bus)
            .ok_or_else(|| AtcaError::comm_fail(format!("simulated I2C bus {} removed", self.bus)))?;
        f(sim)
    }
}

fn nack(address: u8) -> AtcaError {
    AtcaError::comm_fail(format!("no acknowledge from {address:#04x}"))
}

impl BusResource for SimI2cBus {
    fn disable(&mut self) -> AtcaResult<()> {
        self.with_bus(|sim| {
            sim.stats.disables = sim.stats.disables.saturating_add(1);
            Ok(())
        })
    }
}

impl I2cBus for SimI2cBus {
    fn set_speed(&mut self, speed_hz: u32) -> AtcaResult<()> {
        self.speed_hz = speed_hz;
        self.with_bus(|sim| {
            sim.stats.speeds.push(speed_hz);
            Ok(())
        })
    }

    fn speed(&self) -> u32 {
        self.speed_hz
    }

    fn write(&mut self, address: u8, data: &[u8]) -> AtcaResult<()> {
        let speed_hz = self.speed_hz;
        self.with_bus(|sim| {
            if address == GENERAL_CALL_ADDRESS {
                sim.stats.wake_pulses = sim.stats.wake_pulses.saturating_add(1);
                // A zero byte at 100 kHz holds SDA low long enough to wake
                // every device on the bus.
                if speed_hz <= WAKE_SPEED_HZ && data.iter().all(|&b| b == 0) {
                    for chip in sim.devices.values() {
                        chip.wake();
                    }
                }
                return Err(nack(address));
            }

            let chip = sim.devices.get(&address).ok_or_else(|| nack(address))?;
            if chip.is_asleep() {
                return Err(nack(address));
            }
            sim.stats.writes.push(data.to_vec());

            let Some((&word_address, rest)) = data.split_first() else {
                return Ok(());
            };
            match word_address {
                WORD_ADDRESS_COMMAND => chip.execute(rest),
                WORD_ADDRESS_IDLE => chip.idle(),
                WORD_ADDRESS_SLEEP => chip.sleep(),
                WORD_ADDRESS_RESET => chip.reset_io(),
                _ => return Err(nack(address)),
            }
            Ok(())
        })
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> AtcaResult<usize> {
        self.with_bus(|sim| {
            let chip = sim.devices.get(&address).ok_or_else(|| nack(address))?;
            if chip.is_asleep() {
                return Err(nack(address));
            }
            let Some(output) = chip.take_output() else {
                return Ok(0);
            };
            let n = output.len().min(buf.len());
            if let (Some(dst), Some(src)) = (buf.get_mut(..n), output.get(..n)) {
                dst.copy_from_slice(src);
            }
            Ok(n)
        })
    }
}
