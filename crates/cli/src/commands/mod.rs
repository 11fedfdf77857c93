//! Command implementations for atcactl

pub mod device;
pub mod discover;

use std::path::PathBuf;

use clap::{Args, Subcommand};
use cryptoauth_hal::{DEFAULT_I2C_ADDRESS, InterfaceConfig};
use cryptoauth_protocol::DeviceFamily;

use crate::error::CliError;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan every bus for devices
    Discover {
        /// Keep at most this many interface configs
        #[arg(long, default_value_t = 16)]
        max: usize,
    },

    /// Show the revision word and the family it identifies
    Info,

    /// Draw 32 random bytes from the device
    Random,

    /// Show the 9-byte serial number
    Serial,

    /// Dump the config zone
    ReadConfig,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Which interface to talk to and over what.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Interface config file (YAML); overrides the other interface flags
    #[arg(long, global = true, env = "ATCACTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Device family
    #[arg(long, global = true, default_value = "atecc508a")]
    pub family: DeviceFamily,

    /// Logical bus number
    #[arg(long, global = true, default_value_t = 0)]
    pub bus: u8,

    /// 7-bit I2C address, decimal or 0x-prefixed hex
    #[arg(long, global = true, value_parser = parse_address, default_value = "0x60")]
    pub address: u8,

    /// Use the single-wire interface instead of I2C
    #[arg(long, global = true)]
    pub swi: bool,

    /// Run against a simulated device instead of hardware
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Serial port carrying the single-wire bus
    #[cfg(feature = "serial")]
    #[arg(long, global = true, env = "ATCACTL_PORT")]
    pub port: Option<String>,
}

impl TargetArgs {
    /// Resolves the flags (or the config file) into an interface config.
    pub fn interface_config(&self) -> Result<InterfaceConfig, CliError> {
        let config = match &self.config {
            Some(path) => InterfaceConfig::from_yaml_file(path)?,
            None if self.swi => InterfaceConfig::swi(self.family, self.bus),
            None => InterfaceConfig::i2c(self.family, self.bus, self.address),
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for TargetArgs {
    fn default() -> Self {
        Self {
            config: None,
            family: DeviceFamily::Ecc508A,
            bus: 0,
            address: DEFAULT_I2C_ADDRESS,
            swi: false,
            simulate: false,
            #[cfg(feature = "serial")]
            port: None,
        }
    }
}

pub fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}
