//! Bus discovery command

use anyhow::Result;
use cryptoauth_device::discover;

use crate::commands::TargetArgs;
use crate::output;
use crate::session::Session;

pub fn execute(target: &TargetArgs, max: usize, json: bool) -> Result<()> {
    let mut session = Session::open(target)?;
    let report = discover(&mut session.hal, max);
    output::print_discovery(&report, json)?;
    Ok(())
}
