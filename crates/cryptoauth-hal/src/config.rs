//! Interface configuration.
//!
//! An [`InterfaceConfig`] names the transport, the device family and the
//! timing knobs for one logical interface. It is caller-owned input: opening
//! a transport clones it, and nothing in this crate mutates it afterwards.

use std::path::Path;

use cryptoauth_protocol::{AtcaError, DeviceFamily};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default 7-bit I2C address of an unconfigured device.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x60;
pub const DEFAULT_I2C_SPEED_HZ: u32 = 400_000;
pub const DEFAULT_WAKE_DELAY_US: u32 = 1500;
pub const DEFAULT_RX_RETRIES: u32 = 20;

/// Lowest and highest valid 7-bit device addresses.
pub const I2C_ADDRESS_MIN: u8 = 0x07;
pub const I2C_ADDRESS_MAX: u8 = 0x78;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for AtcaError {
    fn from(e: ConfigError) -> Self {
        AtcaError::BadParam(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InterfaceKind {
    I2c {
        bus: u8,
        /// 7-bit device address.
        address: u8,
        speed_hz: u32,
    },
    Swi {
        bus: u8,
    },
}

impl InterfaceKind {
    pub fn bus(&self) -> u8 {
        match *self {
            InterfaceKind::I2c { bus, .. } | InterfaceKind::Swi { bus } => bus,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    pub interface: InterfaceKind,
    #[serde(default)]
    pub family: DeviceFamily,
    #[serde(default = "default_wake_delay_us")]
    pub wake_delay_us: u32,
    #[serde(default = "default_rx_retries")]
    pub rx_retries: u32,
}

fn default_wake_delay_us() -> u32 {
    DEFAULT_WAKE_DELAY_US
}

fn default_rx_retries() -> u32 {
    DEFAULT_RX_RETRIES
}

impl InterfaceConfig {
    pub fn i2c(family: DeviceFamily, bus: u8, address: u8) -> Self {
        Self {
            interface: InterfaceKind::I2c {
                bus,
                address,
                speed_hz: DEFAULT_I2C_SPEED_HZ,
            },
            family,
            wake_delay_us: DEFAULT_WAKE_DELAY_US,
            rx_retries: DEFAULT_RX_RETRIES,
        }
    }

    pub fn swi(family: DeviceFamily, bus: u8) -> Self {
        Self {
            interface: InterfaceKind::Swi { bus },
            family,
            wake_delay_us: DEFAULT_WAKE_DELAY_US,
            rx_retries: DEFAULT_RX_RETRIES,
        }
    }

    pub fn ecc508a_i2c_default() -> Self {
        Self::i2c(DeviceFamily::Ecc508A, 0, DEFAULT_I2C_ADDRESS)
    }

    pub fn ecc608a_i2c_default() -> Self {
        Self::i2c(DeviceFamily::Ecc608A, 0, DEFAULT_I2C_ADDRESS)
    }

    pub fn sha204a_i2c_default() -> Self {
        Self::i2c(DeviceFamily::Sha204A, 0, 0x64)
    }

    pub fn ecc508a_swi_default() -> Self {
        Self::swi(DeviceFamily::Ecc508A, 0)
    }

    pub fn with_family(mut self, family: DeviceFamily) -> Self {
        self.family = family;
        self
    }

    pub fn with_wake_delay_us(mut self, wake_delay_us: u32) -> Self {
        self.wake_delay_us = wake_delay_us;
        self
    }

    pub fn with_rx_retries(mut self, rx_retries: u32) -> Self {
        self.rx_retries = rx_retries;
        self
    }

    pub fn bus(&self) -> u8 {
        self.interface.bus()
    }

    /// Checks the values a transport relies on.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for a zero retry count, a zero I2C
    /// speed or an I2C address outside 0x07..=0x78.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rx_retries == 0 {
            return Err(ConfigError::Invalid(
                "rx_retries must be at least 1".to_string(),
            ));
        }
        if let InterfaceKind::I2c {
            address, speed_hz, ..
        } = self.interface
        {
            if !(I2C_ADDRESS_MIN..=I2C_ADDRESS_MAX).contains(&address) {
                return Err(ConfigError::Invalid(format!(
                    "I2C address {address:#04x} outside {I2C_ADDRESS_MIN:#04x}..={I2C_ADDRESS_MAX:#04x}"
                )));
            }
            if speed_hz == 0 {
                return Err(ConfigError::Invalid("I2C speed must be non-zero".to_string()));
            }
        }
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self::ecc508a_i2c_default()
    }
}
