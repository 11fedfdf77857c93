//! Simulated UARTs, each with at most one single-wire device.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use cryptoauth_protocol::{AtcaError, AtcaResult};
use parking_lot::Mutex;

use super::BusStats;
use super::chip::SimulatedChip;
use crate::bus::{BusResource, UartPlatform, UartPort};
use crate::swi::{
    SWI_FLAG_CMD, SWI_FLAG_IDLE, SWI_FLAG_SLEEP, SWI_FLAG_TX, SWI_WAKE_BAUD, decode, encode,
};

#[derive(Debug, Default)]
struct SimLine {
    device: Option<SimulatedChip>,
    stats: BusStats,
}

/// A UART platform whose lines exist only in memory.
#[derive(Debug, Clone, Default)]
pub struct SimUartPlatform {
    lines: Arc<Mutex<BTreeMap<u8, SimLine>>>,
}

impl SimUartPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bus(&self, bus: u8) {
        self.lines.lock().entry(bus).or_default();
    }

    /// Attaches `chip` to `bus`, replacing any device already there.
    pub fn attach(&self, bus: u8, chip: SimulatedChip) {
        self.lines.lock().entry(bus).or_default().device = Some(chip);
    }

    pub fn stats(&self, bus: u8) -> BusStats {
        self.lines
            .lock()
            .get(&bus)
            .map(|line| line.stats.clone())
            .unwrap_or_default()
    }
}

impl UartPlatform for SimUartPlatform {
    fn buses(&self) -> Vec<u8> {
        self.lines.lock().keys().copied().collect()
    }

    fn open(&mut self, bus: u8, baud: u32) -> AtcaResult<Box<dyn UartPort>> {
        let mut lines = self.lines.lock();
        let line = lines
            .get_mut(&bus)
            .ok_or_else(|| AtcaError::comm_fail(format!("no simulated UART {bus}")))?;
        line.stats.opens = line.stats.opens.saturating_add(1);
        line.stats.speeds.push(baud);
        Ok(Box::new(SimUartPort {
            bus,
            baud,
            rx: VecDeque::new(),
            lines: Arc::clone(&self.lines),
        }))
    }
}

struct SimUartPort {
    bus: u8,
    baud: u32,
    rx: VecDeque<u8>,
    lines: Arc<Mutex<BTreeMap<u8, SimLine>>>,
}

impl SimUartPort {
    fn with_line<R>(&self, f: impl FnOnce(&mut SimLine) -> R) -> AtcaResult<R> {
        let mut lines = self.lines.lock();
        let line = lines
            .get_mut(&self.bus)
            .ok_or_else(|| AtcaError::comm_fail(format!("simulated UART {} removed", self.bus)))?;
        Ok(f(line))
    }
}

impl BusResource for SimUartPort {
    fn disable(&mut self) -> AtcaResult<()> {
        self.with_line(|line| {
            line.stats.disables = line.stats.disables.saturating_add(1);
        })
    }
}

impl UartPort for SimUartPort {
    fn set_baud(&mut self, baud: u32) -> AtcaResult<()> {
        self.baud = baud;
        self.with_line(|line| line.stats.speeds.push(baud))
    }

    fn write(&mut self, data: &[u8]) -> AtcaResult<()> {
        let baud = self.baud;
        let reply = self.with_line(|line| {
            line.stats.writes.push(data.to_vec());
            if baud == SWI_WAKE_BAUD && data == [0x00] {
                line.stats.wake_pulses = line.stats.wake_pulses.saturating_add(1);
                if let Some(chip) = &line.device {
                    chip.wake();
                }
                return None;
            }

            let chip = line.device.as_ref()?;
            if chip.is_asleep() {
                return None;
            }
            let logical = decode(data);
            let (&flag, rest) = logical.split_first()?;
            match flag {
                SWI_FLAG_CMD => chip.execute(rest),
                SWI_FLAG_TX => return chip.take_output(),
                SWI_FLAG_IDLE => chip.idle(),
                SWI_FLAG_SLEEP => chip.sleep(),
                _ => {}
            }
            None
        })?;

        if let Some(bytes) = reply {
            self.rx.extend(encode(&bytes));
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> AtcaResult<usize> {
        let n = buf.len().min(self.rx.len());
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}
