//! One invocation's HAL, bus platform and interface config.

use std::sync::Arc;

use cryptoauth_device::Device;
use cryptoauth_hal::{
    Hal, InterfaceConfig, InterfaceKind, SimI2cPlatform, SimUartPlatform, SimulatedChip, StdDelay,
};
use cryptoauth_protocol::AtcaResult;
use tracing::{debug, warn};

use crate::commands::TargetArgs;
use crate::error::CliError;

pub struct Session {
    pub hal: Hal,
    pub config: InterfaceConfig,
}

impl Session {
    pub fn open(target: &TargetArgs) -> Result<Self, CliError> {
        let config = target.interface_config()?;
        let hal = Hal::new(Arc::new(StdDelay));
        let hal = if target.simulate {
            simulated(hal, &config)
        } else {
            hardware(hal, target, &config)?
        };
        Ok(Self { hal, config })
    }

    /// Initializes the device, runs `f` and releases the bus again.
    pub fn with_device<R>(
        &mut self,
        f: impl FnOnce(&mut Device) -> AtcaResult<R>,
    ) -> Result<R, CliError> {
        let mut device = Device::init(&self.config, &mut self.hal)?;
        let result = f(&mut device);
        if let Err(e) = device.release(&mut self.hal) {
            warn!(error = %e, "release failed");
        }
        Ok(result?)
    }
}

/// One simulated device of the configured family, at the configured place.
fn simulated(hal: Hal, config: &InterfaceConfig) -> Hal {
    let chip = SimulatedChip::new(config.family);
    let i2c = SimI2cPlatform::new();
    let uart = SimUartPlatform::new();
    match config.interface {
        InterfaceKind::I2c { bus, address, .. } => i2c.attach(bus, address, chip),
        InterfaceKind::Swi { bus } => uart.attach(bus, chip),
    }
    debug!(family = %config.family, interface = ?config.interface, "using simulated device");
    hal.with_i2c(i2c).with_uart(uart)
}

#[cfg(feature = "serial")]
fn hardware(hal: Hal, target: &TargetArgs, config: &InterfaceConfig) -> Result<Hal, CliError> {
    use cryptoauth_hal::SerialUartPlatform;

    let Some(port) = target.port.as_deref() else {
        return Err(CliError::NoPlatform(
            "pass --port for a serial adapter or --simulate".to_string(),
        ));
    };
    if !matches!(config.interface, InterfaceKind::Swi { .. }) {
        return Err(CliError::InvalidConfiguration(
            "a serial port carries only single-wire interfaces; add --swi".to_string(),
        ));
    }
    debug!(port, bus = config.bus(), "using serial adapter");
    Ok(hal.with_uart(SerialUartPlatform::new([(config.bus(), port.to_string())])))
}

#[cfg(not(feature = "serial"))]
fn hardware(_hal: Hal, _target: &TargetArgs, _config: &InterfaceConfig) -> Result<Hal, CliError> {
    Err(CliError::NoPlatform(
        "built without the `serial` feature; pass --simulate".to_string(),
    ))
}
