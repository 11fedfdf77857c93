//! I2C transport.
//!
//! Every write starts with a word-address byte that tells the device what
//! follows: a command, an idle request or a sleep request. Waking pulls SDA
//! low long enough by writing a zero byte at 100 kHz to the general-call
//! address, which no device acknowledges.

use std::sync::Arc;

use cryptoauth_protocol::{AtcaError, AtcaResult, WAKE_TOKEN};
use tracing::{debug, trace};

use crate::bus::I2cBus;
use crate::config::{InterfaceConfig, InterfaceKind};
use crate::delay::Delay;
use crate::registry::{BusKey, Shared};
use crate::transport::{Transport, declared_len};

pub const WORD_ADDRESS_RESET: u8 = 0x00;
pub const WORD_ADDRESS_SLEEP: u8 = 0x01;
pub const WORD_ADDRESS_IDLE: u8 = 0x02;
pub const WORD_ADDRESS_COMMAND: u8 = 0x03;

pub const GENERAL_CALL_ADDRESS: u8 = 0x00;

/// Bus speed at which a zero byte holds SDA low for the wake interval.
pub const WAKE_SPEED_HZ: u32 = 100_000;

pub struct I2cTransport {
    config: InterfaceConfig,
    bus: u8,
    address: u8,
    resource: Shared<dyn I2cBus>,
    delay: Arc<dyn Delay>,
}

impl I2cTransport {
    /// Wraps an already enabled bus.
    ///
    /// # Errors
    ///
    /// `BadParam` if `config` does not describe an I2C interface.
    pub fn new(
        config: InterfaceConfig,
        resource: Shared<dyn I2cBus>,
        delay: Arc<dyn Delay>,
    ) -> AtcaResult<Self> {
        let InterfaceKind::I2c { bus, address, .. } = config.interface else {
            return Err(AtcaError::bad_param("I2C transport needs an I2C interface"));
        };
        Ok(Self {
            config,
            bus,
            address,
            resource,
            delay,
        })
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    fn write_word(&mut self, word_address: u8) -> AtcaResult<()> {
        self.resource.lock().write(self.address, &[word_address])
    }
}

impl Transport for I2cTransport {
    fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    fn bus_key(&self) -> BusKey {
        BusKey::I2c(self.bus)
    }

    fn send(&mut self, frame: &[u8]) -> AtcaResult<()> {
        let mut out = Vec::with_capacity(frame.len().saturating_add(1));
        out.push(WORD_ADDRESS_COMMAND);
        out.extend_from_slice(frame);
        trace!(address = self.address, len = out.len(), "i2c send");
        self.resource.lock().write(self.address, &out)
    }

    fn receive(&mut self, buf: &mut [u8]) -> AtcaResult<usize> {
        let mut bus = self.resource.lock();
        receive_from(&mut **bus, self.address, self.config.rx_retries, buf)
    }

    fn wake(&mut self) -> AtcaResult<()> {
        let mut bus = self.resource.lock();
        let restore_hz = bus.speed();
        if restore_hz != WAKE_SPEED_HZ {
            bus.set_speed(WAKE_SPEED_HZ)?;
        }

        // Nobody acknowledges the general-call pulse.
        if let Err(e) = bus.write(GENERAL_CALL_ADDRESS, &[0x00]) {
            trace!(error = %e, "wake pulse not acknowledged");
        }
        self.delay.delay_us(self.config.wake_delay_us);

        let mut token = [0u8; 4];
        let read = receive_from(&mut **bus, self.address, self.config.rx_retries, &mut token);

        if restore_hz != WAKE_SPEED_HZ {
            bus.set_speed(restore_hz)?;
        }

        let read = read?;
        if read >= token.len() && token == WAKE_TOKEN {
            debug!(bus = self.bus, address = self.address, "device awake");
            Ok(())
        } else {
            Err(AtcaError::comm_fail(format!(
                "unexpected wake response {:02X?} from {:#04x}",
                token.get(..read.min(token.len())).unwrap_or_default(),
                self.address
            )))
        }
    }

    fn idle(&mut self) -> AtcaResult<()> {
        self.write_word(WORD_ADDRESS_IDLE)
    }

    fn sleep(&mut self) -> AtcaResult<()> {
        self.write_word(WORD_ADDRESS_SLEEP)
    }
}

/// Polls `address` up to `retries` times, retrying through NACKs.
///
/// The last bus error is returned only when every attempt failed.
fn receive_from(
    bus: &mut dyn I2cBus,
    address: u8,
    retries: u32,
    buf: &mut [u8],
) -> AtcaResult<usize> {
    let mut last_error = None;
    for attempt in 0..retries.max(1) {
        match bus.read(address, buf) {
            Ok(0) => trace!(attempt, "i2c receive: no data"),
            Ok(read) => {
                let read = read.min(buf.len());
                return Ok(declared_len(buf, read));
            }
            Err(e) => {
                trace!(attempt, error = %e, "i2c receive attempt failed");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) => Err(e),
        None => Ok(0),
    }
}

impl std::fmt::Debug for I2cTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I2cTransport")
            .field("bus", &self.bus)
            .field("address", &format_args!("{:#04x}", self.address))
            .field("family", &self.config.family)
            .finish_non_exhaustive()
    }
}
