//! Decoding of the 4-byte status frames the device uses to report results.

use crate::error::{AtcaError, AtcaResult};

/// `{count = 4, status = 0, crc}`.
pub const SUCCESS_FRAME: [u8; 4] = [0x04, 0x00, 0x03, 0x40];

/// Acknowledgement returned after a successful wake pulse.
pub const WAKE_TOKEN: [u8; 4] = [0x04, 0x11, 0x33, 0x43];

pub const STATUS_FRAME_SIZE: usize = 4;
const STATUS_FRAME_COUNT: u8 = 0x04;

/// Maps a received frame to its device-reported result.
///
/// Only an exact 4-byte frame with count 0x04 carries a status. Anything
/// else, including a longer response whose count byte happens to be 0x04,
/// is a data response and passes through as `Ok`.
pub fn decode_status(frame: &[u8]) -> AtcaResult<()> {
    if frame.get(..STATUS_FRAME_SIZE) == Some(&SUCCESS_FRAME[..]) {
        return Ok(());
    }

    let [count, code, _, _] = frame else {
        return Ok(());
    };
    if *count != STATUS_FRAME_COUNT {
        return Ok(());
    }

    Err(match code {
        0x01 => AtcaError::CheckMacVerifyFailed,
        0x03 => AtcaError::ParseError,
        0x05 => AtcaError::EccFault,
        0x07 => AtcaError::SelfTestError,
        0x0F => AtcaError::ExecutionError,
        0x11 => AtcaError::WakeSuccess,
        0xFF => AtcaError::DeviceCrcError,
        other => AtcaError::GenFail(format!("unrecognized device status {other:#04x}")),
    })
}
