//! Physical bus drivers.
//!
//! Platforms hand out enabled bus resources; the [`crate::Hal`] keeps one
//! per physical bus and shares it between interfaces.

use cryptoauth_protocol::AtcaResult;

/// A physical resource that can be shut down when its last user leaves.
pub trait BusResource: Send {
    fn disable(&mut self) -> AtcaResult<()>;
}

/// An enabled I2C master.
///
/// Addresses are 7-bit.
pub trait I2cBus: BusResource {
    fn set_speed(&mut self, speed_hz: u32) -> AtcaResult<()>;

    fn speed(&self) -> u32;

    fn write(&mut self, address: u8, data: &[u8]) -> AtcaResult<()>;

    /// Reads up to `buf.len()` bytes and returns how many the device sent.
    fn read(&mut self, address: u8, buf: &mut [u8]) -> AtcaResult<usize>;
}

/// Enables I2C masters by logical bus number.
pub trait I2cPlatform: Send {
    /// Logical bus numbers the platform can open.
    fn buses(&self) -> Vec<u8>;

    fn open(&mut self, bus: u8, speed_hz: u32) -> AtcaResult<Box<dyn I2cBus>>;
}

/// An enabled UART used to bit-bang the single-wire interface.
pub trait UartPort: BusResource {
    fn set_baud(&mut self, baud: u32) -> AtcaResult<()>;

    fn write(&mut self, data: &[u8]) -> AtcaResult<()>;

    /// Reads up to `buf.len()` bytes; `Ok(0)` on timeout.
    fn read(&mut self, buf: &mut [u8]) -> AtcaResult<usize>;
}

/// Enables UARTs by logical bus number.
pub trait UartPlatform: Send {
    fn buses(&self) -> Vec<u8>;

    fn open(&mut self, bus: u8, baud: u32) -> AtcaResult<Box<dyn UartPort>>;
}
