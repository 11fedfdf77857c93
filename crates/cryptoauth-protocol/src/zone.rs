//! Memory zones and Read/Write address encoding.

use serde::{Deserialize, Serialize};

use crate::error::{AtcaError, AtcaResult};
use crate::family::DeviceFamily;
use crate::mode::READ_WRITE_32_FLAG;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Config,
    Otp,
    Data,
}

impl Zone {
    pub fn to_u8(self) -> u8 {
        match self {
            Zone::Config => 0x00,
            Zone::Otp => 0x01,
            Zone::Data => 0x02,
        }
    }

    /// Read/Write param1 for this zone; `block` selects a 32-byte access.
    pub fn param1(self, block: bool) -> u8 {
        if block {
            self.to_u8() | READ_WRITE_32_FLAG
        } else {
            self.to_u8()
        }
    }
}

/// Encodes param2 for Read/Write.
///
/// Config and OTP use `block << 3 | word`; data slots use
/// `block << 8 | slot << 3 | word`. `offset` is a word index within the
/// block and only its low three bits are kept.
pub fn zone_address(zone: Zone, slot: u16, block: u8, offset: u8) -> u16 {
    let word = u16::from(offset & 0x07);
    match zone {
        Zone::Config | Zone::Otp => (u16::from(block) << 3) | word,
        Zone::Data => (slot << 3) | word | (u16::from(block) << 8),
    }
}

/// Size in bytes of a zone, or of a data slot.
pub fn zone_size(family: DeviceFamily, zone: Zone, slot: u16) -> AtcaResult<usize> {
    match (family, zone) {
        (DeviceFamily::Sha204A, Zone::Config) => Ok(88),
        (DeviceFamily::Sha204A, Zone::Otp) => Ok(64),
        (DeviceFamily::Sha204A, Zone::Data) => Ok(32),
        (_, Zone::Config) => Ok(128),
        (_, Zone::Otp) => Ok(64),
        (_, Zone::Data) => match slot {
            0..=7 => Ok(36),
            8 => Ok(416),
            9..=15 => Ok(72),
            _ => Err(AtcaError::bad_param(format!("invalid slot {slot}"))),
        },
    }
}
