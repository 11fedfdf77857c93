//! Error types for atcactl

use cryptoauth_hal::ConfigError;
use cryptoauth_protocol::AtcaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("No bus platform: {0}")]
    NoPlatform(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Device error: {0}")]
    Device(#[from] AtcaError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code. 2 is left to clap for usage errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Device(_) => 3,
            CliError::InvalidConfiguration(_) | CliError::Config(_) | CliError::JsonError(_) => 4,
            CliError::NoPlatform(_) => 5,
        }
    }
}
