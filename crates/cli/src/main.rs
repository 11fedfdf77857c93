//! atcactl - CryptoAuthentication secure element CLI
//!
//! Discovers devices on the available buses and runs the basic identity
//! commands (revision, random, serial number, config zone dump) against one
//! of them.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod completion;
mod error;
mod output;
mod session;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Commands, TargetArgs};
use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(name = "atcactl")]
#[command(about = "CryptoAuth Control CLI - Discover and query ATECC/ATSHA secure elements")]
#[command(version)]
#[command(long_about = "
atcactl talks to Microchip CryptoAuthentication secure elements (ATSHA204A,
ATECC108A, ATECC508A, ATECC608A) over I2C or the single-wire interface.

Pick the interface with --config <file.yaml> or with --family/--bus/--address
(--swi for single-wire). Use --simulate to run against a simulated device and
--json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(flatten)]
    target: TargetArgs,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "atcactl={log_level},cryptoauth_device={log_level},cryptoauth_hal={log_level}"
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Discover { max } => commands::discover::execute(&cli.target, *max, cli.json),
        Commands::Info => commands::device::info(&cli.target, cli.json),
        Commands::Random => commands::device::random(&cli.target, cli.json),
        Commands::Serial => commands::device::serial(&cli.target, cli.json),
        Commands::ReadConfig => commands::device::read_config(&cli.target, cli.json),
        Commands::Completion { shell } => {
            completion::generate_completion(*shell);
            Ok(())
        }
    }
}
