//! Command framing for Microchip CryptoAuthentication secure elements
//! (ATSHA204A, ATECC108A, ATECC508A, ATECC608A).
//!
//! This crate is I/O-free. It provides pure functions and types that can be
//! tested and fuzzed without hardware:
//!
//! - CRC-16 (polynomial 0x8005, LSB first) compute and verify
//! - Per-opcode frame sizing driven by mode bits
//! - Per-family, per-clock-divider execution time tables
//! - Status frame decoding
//! - Zone address encoding
//!
//! Transports live in `cryptoauth-hal`; the execution path that ties them
//! together lives in `cryptoauth-device`.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]

pub mod command;
pub mod crc;
pub mod error;
pub mod family;
pub mod mode;
pub mod opcode;
pub mod packet;
pub mod status;
pub mod timing;
pub mod zone;

pub use command::{
    BLOCK_SIZE, CMD_SIZE_MIN, Command, FrameSizes, KdfOutputSizes, PACKET_OVERHEAD, RSP_SIZE_MIN,
    WORD_SIZE,
};
pub use crc::{CRC_SIZE, crc16, verify_frame};
pub use error::{AtcaError, AtcaResult};
pub use family::{ClockDivider, DeviceFamily, TimingProfile, classify_revision};
pub use opcode::Opcode;
pub use packet::{CommandBuilder, MAX_FRAME_SIZE, Packet, Response};
pub use status::{SUCCESS_FRAME, WAKE_TOKEN, decode_status};
pub use timing::execution_time_ms;
pub use zone::{Zone, zone_address, zone_size};

/// Version of the command engine.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
