//! Transports for CryptoAuthentication secure elements.
//!
//! # Key Features
//! - [`InterfaceConfig`] with YAML loading and the usual presets
//! - I2C transport (word-address framing, general-call wake)
//! - Single-wire transport bit-banged over a UART
//! - Reference-counted sharing of one physical bus between interfaces
//! - In-memory buses and a simulated device for tests ([`sim`])
//! - A `serialport` UART driver behind the `serial` feature
//! - An I2C platform over any `embedded-hal` 1.0 bus behind the
//!   `embedded-hal` feature
//!
//! Everything is blocking. Delays go through the [`Delay`] trait so tests
//! can record them instead of sleeping.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]

pub mod bus;
pub mod config;
pub mod delay;
#[cfg(feature = "embedded-hal")]
pub mod embedded;
pub mod hal;
pub mod i2c;
pub mod registry;
#[cfg(feature = "serial")]
pub mod serial;
pub mod sim;
pub mod swi;
pub mod transport;

pub use bus::{BusResource, I2cBus, I2cPlatform, UartPlatform, UartPort};
pub use config::{
    ConfigError, DEFAULT_I2C_ADDRESS, DEFAULT_I2C_SPEED_HZ, DEFAULT_RX_RETRIES,
    DEFAULT_WAKE_DELAY_US, I2C_ADDRESS_MAX, I2C_ADDRESS_MIN, InterfaceConfig, InterfaceKind,
};
pub use delay::{Delay, RecordingDelay, StdDelay};
#[cfg(feature = "embedded-hal")]
pub use embedded::{EmbeddedI2cBus, EmbeddedI2cPlatform};
pub use hal::Hal;
pub use i2c::I2cTransport;
pub use registry::{BusKey, BusRegistry, BusSlot, Release};
#[cfg(feature = "serial")]
pub use serial::SerialUartPlatform;
pub use sim::{SimI2cPlatform, SimUartPlatform, SimulatedChip};
pub use swi::SwiTransport;
pub use transport::Transport;
