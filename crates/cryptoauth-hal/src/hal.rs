//! The caller-owned HAL context.
//!
//! A [`Hal`] owns the platform drivers and one [`BusRegistry`] per
//! transport kind. Transports opened from it share the physical bus; the
//! bus is enabled by the first open and disabled by the last release.

use std::fmt;
use std::sync::Arc;

use cryptoauth_protocol::{AtcaError, AtcaResult};
use tracing::{debug, info};

use crate::bus::{I2cBus, I2cPlatform, UartPlatform, UartPort};
use crate::config::{InterfaceConfig, InterfaceKind};
use crate::delay::{Delay, StdDelay};
use crate::i2c::I2cTransport;
use crate::registry::{BusKey, BusRegistry, Release};
use crate::swi::{SWI_BAUD, SwiTransport};
use crate::transport::Transport;

pub struct Hal {
    i2c: Option<Box<dyn I2cPlatform>>,
    uart: Option<Box<dyn UartPlatform>>,
    i2c_buses: BusRegistry<dyn I2cBus>,
    swi_buses: BusRegistry<dyn UartPort>,
    delay: Arc<dyn Delay>,
}

impl Hal {
    /// A context with no platforms attached.
    pub fn new(delay: Arc<dyn Delay>) -> Self {
        Self {
            i2c: None,
            uart: None,
            i2c_buses: BusRegistry::new(),
            swi_buses: BusRegistry::new(),
            delay,
        }
    }

    pub fn with_i2c(mut self, platform: impl I2cPlatform + 'static) -> Self {
        self.i2c = Some(Box::new(platform));
        self
    }

    pub fn with_uart(mut self, platform: impl UartPlatform + 'static) -> Self {
        self.uart = Some(Box::new(platform));
        self
    }

    pub fn delay(&self) -> Arc<dyn Delay> {
        Arc::clone(&self.delay)
    }

    /// Opens a transport for `config`, enabling its bus if this is the
    /// first interface on it.
    ///
    /// When the bus is already enabled its existing settings are kept, so
    /// a second interface asking for a different I2C speed gets the speed
    /// of the first.
    ///
    /// # Errors
    ///
    /// `BadParam` for an invalid config, `CommFail` when no platform for
    /// the transport kind is attached or the platform cannot enable the bus.
    pub fn open(&mut self, config: &InterfaceConfig) -> AtcaResult<Box<dyn Transport>> {
        config.validate()?;
        let delay = Arc::clone(&self.delay);

        match config.interface {
            InterfaceKind::I2c { bus, speed_hz, .. } => {
                let platform = self
                    .i2c
                    .as_mut()
                    .ok_or_else(|| AtcaError::comm_fail("no I2C platform attached"))?;
                let resource = self
                    .i2c_buses
                    .acquire(bus, || platform.open(bus, speed_hz))?;
                match I2cTransport::new(config.clone(), resource, delay) {
                    Ok(transport) => {
                        debug!(bus, refs = self.i2c_buses.ref_count(bus), "opened i2c interface");
                        Ok(Box::new(transport))
                    }
                    Err(e) => {
                        self.i2c_buses.release(bus)?;
                        Err(e)
                    }
                }
            }
            InterfaceKind::Swi { bus } => {
                let platform = self
                    .uart
                    .as_mut()
                    .ok_or_else(|| AtcaError::comm_fail("no UART platform attached"))?;
                let resource = self
                    .swi_buses
                    .acquire(bus, || platform.open(bus, SWI_BAUD))?;
                match SwiTransport::new(config.clone(), resource, delay) {
                    Ok(transport) => {
                        debug!(bus, refs = self.swi_buses.ref_count(bus), "opened swi interface");
                        Ok(Box::new(transport))
                    }
                    Err(e) => {
                        self.swi_buses.release(bus)?;
                        Err(e)
                    }
                }
            }
        }
    }

    /// Drops `transport` and its reference on the bus.
    pub fn release(&mut self, transport: Box<dyn Transport>) -> AtcaResult<Release> {
        let key = transport.bus_key();
        drop(transport);
        self.release_bus(key)
    }

    /// Drops one reference on `key`. Releasing a bus nobody opened is a
    /// no-op.
    pub fn release_bus(&mut self, key: BusKey) -> AtcaResult<Release> {
        let released = match key {
            BusKey::I2c(bus) => self.i2c_buses.release(bus)?,
            BusKey::Swi(bus) => self.swi_buses.release(bus)?,
        };
        if released == Release::Disabled {
            info!(%key, "bus released");
        }
        Ok(released)
    }

    pub fn bus_ref_count(&self, key: BusKey) -> usize {
        match key {
            BusKey::I2c(bus) => self.i2c_buses.ref_count(bus),
            BusKey::Swi(bus) => self.swi_buses.ref_count(bus),
        }
    }

    pub fn is_bus_enabled(&self, key: BusKey) -> bool {
        match key {
            BusKey::I2c(bus) => self.i2c_buses.is_enabled(bus),
            BusKey::Swi(bus) => self.swi_buses.is_enabled(bus),
        }
    }

    /// I2C bus numbers the attached platform can open.
    pub fn i2c_buses(&self) -> Vec<u8> {
        self.i2c.as_ref().map(|p| p.buses()).unwrap_or_default()
    }

    /// UART bus numbers the attached platform can open.
    pub fn swi_buses(&self) -> Vec<u8> {
        self.uart.as_ref().map(|p| p.buses()).unwrap_or_default()
    }
}

impl Default for Hal {
    fn default() -> Self {
        Self::new(Arc::new(StdDelay))
    }
}

impl fmt::Debug for Hal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hal")
            .field("i2c_platform", &self.i2c.is_some())
            .field("uart_platform", &self.uart.is_some())
            .field("i2c_buses", &self.i2c_buses)
            .field("swi_buses", &self.swi_buses)
            .finish_non_exhaustive()
    }
}
