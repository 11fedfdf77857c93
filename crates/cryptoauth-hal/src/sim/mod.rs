//! In-memory buses and a behavioural secure-element model.
//!
//! Used by the test suites and by `atcactl --simulate`. The model answers
//! wake, idle and sleep, checks frame CRCs, and implements Info, Random,
//! Read and Write against its own zones. Other supported commands answer
//! with a success status.

mod chip;
mod i2c;
mod uart;

pub use chip::{
    ChipCounters, DEFAULT_SERIAL, PowerState, STATUS_CRC_ERROR, STATUS_EXECUTION_ERROR,
    STATUS_PARSE_ERROR, SimulatedChip,
};
pub use i2c::SimI2cPlatform;
pub use uart::SimUartPlatform;

/// Traffic seen by one simulated bus.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Times the platform enabled the bus.
    pub opens: usize,
    pub disables: usize,
    pub wake_pulses: usize,
    /// Speeds (I2C Hz or UART baud) in the order they were applied.
    pub speeds: Vec<u32>,
    /// Writes accepted on the bus, oldest first.
    pub writes: Vec<Vec<u8>>,
}
