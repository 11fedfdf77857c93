//! Single-device commands

use anyhow::Result;
use cryptoauth_protocol::{Zone, zone_size};

use crate::commands::TargetArgs;
use crate::output;
use crate::session::Session;

pub fn info(target: &TargetArgs, json: bool) -> Result<()> {
    let mut session = Session::open(target)?;
    let revision = session.with_device(|device| device.info())?;
    output::print_info(&session.config, &revision, json);
    Ok(())
}

pub fn random(target: &TargetArgs, json: bool) -> Result<()> {
    let mut session = Session::open(target)?;
    let bytes = session.with_device(|device| device.random())?;
    output::print_bytes("Random", "random", &bytes, json);
    Ok(())
}

pub fn serial(target: &TargetArgs, json: bool) -> Result<()> {
    let mut session = Session::open(target)?;
    let serial = session.with_device(|device| device.serial_number())?;
    output::print_bytes("Serial", "serial", &serial, json);
    Ok(())
}

pub fn read_config(target: &TargetArgs, json: bool) -> Result<()> {
    let mut session = Session::open(target)?;
    let zone = session.with_device(|device| {
        let size = zone_size(device.family(), Zone::Config, 0)?;
        device.read_bytes_zone(Zone::Config, 0, 0, size)
    })?;
    output::print_config_zone(&session.config, &zone, json);
    Ok(())
}
