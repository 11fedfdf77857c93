//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use cryptoauth_device::DiscoveryReport;
use cryptoauth_hal::{InterfaceConfig, InterfaceKind};
use serde_json::{Value, json};

use crate::error::CliError;

/// Uppercase hex without separators.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format output as JSON: {e}"),
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let kind = match error.downcast_ref::<CliError>() {
        Some(CliError::NoPlatform(_)) => "no_platform",
        Some(CliError::InvalidConfiguration(_) | CliError::Config(_)) => "configuration",
        Some(CliError::Device(_)) => "device",
        Some(CliError::JsonError(_)) => "json",
        None => "other",
    };
    print_json(&json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": kind
        }
    }));
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

fn describe_interface(config: &InterfaceConfig) -> String {
    match config.interface {
        InterfaceKind::I2c {
            bus,
            address,
            speed_hz,
        } => format!("i2c bus {bus} address {address:#04x} @ {} kHz", speed_hz / 1000),
        InterfaceKind::Swi { bus } => format!("swi bus {bus}"),
    }
}

pub fn print_discovery(report: &DiscoveryReport, json: bool) -> Result<(), CliError> {
    if json {
        let mut value = serde_json::to_value(report)?;
        if let Some(object) = value.as_object_mut() {
            object.insert("success".to_string(), Value::Bool(true));
            object.insert("found".to_string(), json!(report.found()));
        }
        print_json(&value);
        return Ok(());
    }

    if report.configs.is_empty() {
        println!("{}", "No devices found".yellow());
    } else {
        println!("{}", "Devices:".bold());
        for config in &report.configs {
            println!(
                "  {} {} ({})",
                "●".green(),
                config.family.name().bold(),
                describe_interface(config).dimmed()
            );
        }
    }

    let unlisted = report.found().saturating_sub(report.configs.len());
    if unlisted > 0 {
        println!(
            "{}",
            format!("{unlisted} more not listed (raise --max)").yellow()
        );
    }

    println!("{}", "Buses:".bold());
    for scan in &report.scans {
        println!("  {:<6} {}", scan.key.to_string(), scan.found);
    }
    Ok(())
}

pub fn print_info(config: &InterfaceConfig, revision: &[u8; 4], json: bool) {
    let identified = cryptoauth_protocol::classify_revision(revision);
    if json {
        print_json(&json!({
            "success": true,
            "configured_family": config.family,
            "identified_family": identified,
            "revision": hex(revision),
        }));
        return;
    }

    println!("{} {}", "Revision:".bold(), hex(revision));
    match identified {
        Some(family) if family == config.family => {
            println!("{} {}", "Family:".bold(), family.name().green());
        }
        Some(family) => println!(
            "{} {} {}",
            "Family:".bold(),
            family.name().yellow(),
            format!("(configured as {})", config.family).dimmed()
        ),
        None => println!("{} {}", "Family:".bold(), "unknown".red()),
    }
    println!("{} {}", "Interface:".bold(), describe_interface(config));
}

/// Prints one labelled byte string.
pub fn print_bytes(label: &str, key: &str, bytes: &[u8], json: bool) {
    if json {
        let mut value = json!({ "success": true });
        if let Some(object) = value.as_object_mut() {
            object.insert(key.to_string(), Value::String(hex(bytes)));
        }
        print_json(&value);
    } else {
        println!("{} {}", format!("{label}:").bold(), hex(bytes));
    }
}

/// Hex dump, 16 bytes per row with offsets.
pub fn print_config_zone(config: &InterfaceConfig, zone: &[u8], json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "family": config.family,
            "size": zone.len(),
            "data": hex(zone),
        }));
        return;
    }

    println!(
        "{} {} bytes",
        format!("{} config zone:", config.family).bold(),
        zone.len()
    );
    for (row, chunk) in zone.chunks(16).enumerate() {
        let bytes: Vec<String> = chunk.iter().map(|b| format!("{b:02X}")).collect();
        let offset = format!("{:04X}", row.saturating_mul(16));
        println!("  {} {}", offset.dimmed(), bytes.join(" "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[]), "");
        assert_eq!(hex(&[0x00, 0x0A, 0xFF]), "000AFF");
    }

    #[test]
    fn test_describe_interface() {
        assert_eq!(
            describe_interface(&InterfaceConfig::ecc608a_i2c_default()),
            "i2c bus 0 address 0x60 @ 400 kHz"
        );
        assert_eq!(
            describe_interface(&InterfaceConfig::ecc508a_swi_default()),
            "swi bus 0"
        );
    }
}
