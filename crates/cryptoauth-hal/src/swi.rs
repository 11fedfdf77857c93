//! Single-wire interface bit-banged over a UART.
//!
//! Each logical bit is one UART character at 230400 baud: 0x7F for a one
//! and 0x7D for a zero, least significant bit first. A transaction starts
//! with a flag byte saying what follows. The wake pulse is a raw 0x00 sent
//! at 115200 baud, which holds the line low for long enough.

use std::sync::Arc;

use cryptoauth_protocol::{AtcaError, AtcaResult, WAKE_TOKEN};
use tracing::{debug, trace};

use crate::bus::UartPort;
use crate::config::{InterfaceConfig, InterfaceKind};
use crate::delay::Delay;
use crate::registry::{BusKey, Shared};
use crate::transport::Transport;

pub const SWI_FLAG_CMD: u8 = 0x77;
pub const SWI_FLAG_TX: u8 = 0x88;
pub const SWI_FLAG_IDLE: u8 = 0xBB;
pub const SWI_FLAG_SLEEP: u8 = 0xCC;

pub const SWI_BAUD: u32 = 230_400;
pub const SWI_WAKE_BAUD: u32 = 115_200;

pub const BIT_ONE: u8 = 0x7F;
pub const BIT_ZERO: u8 = 0x7D;

/// UART characters per logical byte.
pub const CHARS_PER_BYTE: usize = 8;

/// Expands logical bytes into UART characters.
pub fn encode(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len().saturating_mul(CHARS_PER_BYTE));
    for &byte in bytes {
        for bit in 0..8 {
            out.push(if byte & (1 << bit) != 0 { BIT_ONE } else { BIT_ZERO });
        }
    }
    out
}

/// Collapses UART characters back into logical bytes.
///
/// A trailing partial group is dropped.
pub fn decode(chars: &[u8]) -> Vec<u8> {
    chars
        .chunks_exact(CHARS_PER_BYTE)
        .map(|group| {
            group
                .iter()
                .enumerate()
                .fold(0u8, |acc, (bit, &c)| {
                    if (c ^ BIT_ONE) < 2 { acc | (1 << bit) } else { acc }
                })
        })
        .collect()
}

pub struct SwiTransport {
    config: InterfaceConfig,
    bus: u8,
    resource: Shared<dyn UartPort>,
    delay: Arc<dyn Delay>,
}

impl SwiTransport {
    /// Wraps an already enabled UART.
    ///
    /// # Errors
    ///
    /// `BadParam` if `config` does not describe a SWI interface.
    pub fn new(
        config: InterfaceConfig,
        resource: Shared<dyn UartPort>,
        delay: Arc<dyn Delay>,
    ) -> AtcaResult<Self> {
        let InterfaceKind::Swi { bus } = config.interface else {
            return Err(AtcaError::bad_param("SWI transport needs a SWI interface"));
        };
        Ok(Self {
            config,
            bus,
            resource,
            delay,
        })
    }

    fn send_flag(&mut self, flag: u8) -> AtcaResult<()> {
        self.resource.lock().write(&encode(&[flag]))
    }

    /// One transmit request: flag, count byte, then the rest of the frame.
    fn receive_once(&mut self, buf: &mut [u8]) -> AtcaResult<usize> {
        let mut port = self.resource.lock();
        port.write(&encode(&[SWI_FLAG_TX]))?;

        let Some(count) = read_logical(&mut **port, 1)?.first().copied() else {
            return Ok(0);
        };
        let Some(first) = buf.first_mut() else {
            return Ok(0);
        };
        *first = count;

        let wanted = usize::from(count).clamp(1, buf.len());
        let rest = read_logical(&mut **port, wanted.saturating_sub(1))?;
        let end = rest.len().saturating_add(1);
        if let Some(dst) = buf.get_mut(1..end) {
            dst.copy_from_slice(&rest);
        }
        Ok(end)
    }
}

/// Reads `n` logical bytes, stopping early when the port times out.
fn read_logical(port: &mut dyn UartPort, n: usize) -> AtcaResult<Vec<u8>> {
    let mut chars = vec![0u8; n.saturating_mul(CHARS_PER_BYTE)];
    let mut filled = 0;
    while let Some(dst) = chars.get_mut(filled..).filter(|dst| !dst.is_empty()) {
        let read = port.read(dst)?;
        if read == 0 {
            break;
        }
        filled = filled.saturating_add(read);
    }
    chars.truncate(filled);
    Ok(decode(&chars))
}

impl Transport for SwiTransport {
    fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    fn bus_key(&self) -> BusKey {
        BusKey::Swi(self.bus)
    }

    fn send(&mut self, frame: &[u8]) -> AtcaResult<()> {
        let mut logical = Vec::with_capacity(frame.len().saturating_add(1));
        logical.push(SWI_FLAG_CMD);
        logical.extend_from_slice(frame);
        trace!(bus = self.bus, len = logical.len(), "swi send");
        self.resource.lock().write(&encode(&logical))
    }

    fn receive(&mut self, buf: &mut [u8]) -> AtcaResult<usize> {
        let mut last_error = None;
        for attempt in 0..self.config.rx_retries.max(1) {
            match self.receive_once(buf) {
                Ok(0) => trace!(attempt, "swi receive: no data"),
                Ok(read) => return Ok(read),
                Err(e) => {
                    trace!(attempt, error = %e, "swi receive attempt failed");
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(0),
        }
    }

    fn wake(&mut self) -> AtcaResult<()> {
        {
            let mut port = self.resource.lock();
            port.set_baud(SWI_WAKE_BAUD)?;
            let pulse = port.write(&[0x00]);
            port.set_baud(SWI_BAUD)?;
            pulse?;
        }
        self.delay.delay_us(self.config.wake_delay_us);

        let mut token = [0u8; 4];
        let read = self.receive(&mut token)?;
        if read >= token.len() && token == WAKE_TOKEN {
            debug!(bus = self.bus, "device awake");
            Ok(())
        } else {
            Err(AtcaError::comm_fail(format!(
                "unexpected wake response {:02X?} on swi{}",
                token.get(..read.min(token.len())).unwrap_or_default(),
                self.bus
            )))
        }
    }

    fn idle(&mut self) -> AtcaResult<()> {
        self.send_flag(SWI_FLAG_IDLE)
    }

    fn sleep(&mut self) -> AtcaResult<()> {
        self.send_flag(SWI_FLAG_SLEEP)
    }
}

impl std::fmt::Debug for SwiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwiTransport")
            .field("bus", &self.bus)
            .field("family", &self.config.family)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_flag() {
        // 0x77 = 0b0111_0111, LSB first
        assert_eq!(
            encode(&[SWI_FLAG_CMD]),
            vec![0x7F, 0x7F, 0x7F, 0x7D, 0x7F, 0x7F, 0x7F, 0x7D]
        );
    }

    #[test]
    fn test_decode_tolerates_low_bit() {
        // 0x7E also reads as a one
        let chars = [0x7E, 0x7D, 0x7D, 0x7D, 0x7D, 0x7D, 0x7D, 0x7D];
        assert_eq!(decode(&chars), vec![0x01]);
        assert_eq!(decode(&chars[..5]), Vec::<u8>::new());
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn prop_decode_inverts_encode(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
                prop_assert_eq!(decode(&encode(&bytes)), bytes);
            }
        }
    }
}
