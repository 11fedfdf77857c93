//! CRC-16 frame check used on every command and response frame.
//!
//! Polynomial 0x8005, zero initial value, data bits consumed least
//! significant bit first, no final XOR. The register is emitted
//! little-endian and always occupies the last two bytes of a frame.

use crate::error::{AtcaError, AtcaResult};

pub const CRC_POLYNOMIAL: u16 = 0x8005;

/// Size of the CRC field at the end of every frame.
pub const CRC_SIZE: usize = 2;

/// Offset of the frame length (count) byte.
pub const COUNT_IDX: usize = 0;

/// Computes the CRC-16 over `data`, little-endian.
pub fn crc16(data: &[u8]) -> [u8; 2] {
    let mut crc_register: u16 = 0;

    for &byte in data {
        let mut shift_register: u8 = 0x01;
        while shift_register != 0 {
            let data_bit = u16::from(byte & shift_register != 0);
            let crc_bit = crc_register >> 15;
            crc_register <<= 1;
            if data_bit != crc_bit {
                crc_register ^= CRC_POLYNOMIAL;
            }
            shift_register <<= 1;
        }
    }

    crc_register.to_le_bytes()
}

/// Verifies a frame whose length is declared in its first byte.
///
/// The CRC is recomputed over everything before the trailing two bytes of
/// the declared length. Declared lengths that cannot hold a CRC, or that
/// overrun the buffer, are reported as CRC errors.
pub fn verify_frame(frame: &[u8]) -> AtcaResult<()> {
    let count = frame
        .get(COUNT_IDX)
        .map(|&c| usize::from(c))
        .ok_or(AtcaError::CrcError {
            expected: [0, 0],
            actual: [0, 0],
        })?;

    let (body, crc) = count
        .checked_sub(CRC_SIZE)
        .filter(|&body_len| body_len > COUNT_IDX)
        .and_then(|body_len| Some((frame.get(..body_len)?, frame.get(body_len..count)?)))
        .ok_or_else(|| {
            let actual = trailing_pair(frame);
            AtcaError::CrcError {
                expected: [0, 0],
                actual,
            }
        })?;

    let expected = crc16(body);
    let actual = [
        crc.first().copied().unwrap_or_default(),
        crc.get(1).copied().unwrap_or_default(),
    ];
    if expected == actual {
        Ok(())
    } else {
        Err(AtcaError::CrcError { expected, actual })
    }
}

/// Appends the CRC of `frame` to it.
pub fn append_crc(frame: &mut Vec<u8>) {
    let crc = crc16(frame);
    frame.extend_from_slice(&crc);
}

fn trailing_pair(frame: &[u8]) -> [u8; 2] {
    match frame {
        [.., a, b] => [*a, *b],
        _ => [0, 0],
    }
}
