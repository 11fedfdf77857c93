//! Device handles, command execution and discovery for CryptoAuthentication
//! secure elements.
//!
//! ```text
//! Device ── CommandBuilder (family, clock divider)
//!    └───── Transport ── shared bus slot in Hal
//! ```
//!
//! A [`Device`] is an explicit, caller-owned handle. Any number of them can
//! be live at once; commands on one never touch another's state.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]

pub mod device;
pub mod discovery;
pub mod execution;

pub use device::{Device, RANDOM_NUM_SIZE, SERIAL_NUMBER_SIZE};
pub use discovery::{BusScan, DiscoveryReport, discover, discover_buses};
pub use execution::{exchange, execute};

/// Version of the device layer.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
