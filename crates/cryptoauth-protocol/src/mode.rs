//! Typed decoding of the mode (param1) byte for opcodes whose frame size
//! depends on it.

use crate::error::{AtcaError, AtcaResult};

pub const READ_WRITE_32_FLAG: u8 = 0x80;
pub const MAC_MODE_BLOCK2_TEMPKEY: u8 = 0x01;
pub const GENDIG_ZONE_SHARED_NONCE: u8 = 0x03;
pub const GENKEY_MODE_PUBKEY_DIGEST: u8 = 0x08;
pub const AES_MODE_OP_MASK: u8 = 0x07;
pub const AES_MODE_GFM: u8 = 0x03;

const NONCE_MODE_MASK: u8 = 0x03;
const NONCE_MODE_INPUT_LEN_64: u8 = 0x20;
const SHA_MODE_MASK: u8 = 0x07;
const VERIFY_MODE_MASK: u8 = 0x07;
const VERIFY_MODE_MAC_FLAG: u8 = 0x80;
const SECUREBOOT_MODE_MASK: u8 = 0x07;
const SECUREBOOT_ENC_MAC_FLAG: u8 = 0x80;
const KDF_MODE_ALG_MASK: u8 = 0x60;
const KDF_MODE_TARGET_MASK: u8 = 0x1C;

pub const KDF_DETAILS_PRF_TARGET_LEN_64: u32 = 0x0000_0100;
pub const KDF_DETAILS_PRF_AEAD_MASK: u32 = 0x0000_0600;
pub const KDF_DETAILS_PRF_AEAD_MODE3: u32 = 0x0000_0600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceMode {
    /// 20-byte NumIn mixed with the internal RNG; 32-byte response.
    Calculated { seed_update: bool },
    /// NumIn is loaded verbatim; status-only response.
    Passthrough { wide_input: bool },
}

impl NonceMode {
    pub fn decode(param1: u8) -> AtcaResult<Self> {
        match param1 & NONCE_MODE_MASK {
            0x00 => Ok(NonceMode::Calculated { seed_update: true }),
            0x01 => Ok(NonceMode::Calculated { seed_update: false }),
            0x03 => Ok(NonceMode::Passthrough {
                wide_input: param1 & NONCE_MODE_INPUT_LEN_64 != 0,
            }),
            other => Err(AtcaError::bad_param(format!(
                "invalid Nonce mode {other:#04x}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaMode {
    Start,
    Update,
    End,
    Public,
    HmacStart,
    HmacEnd,
    ReadContext,
    WriteContext,
}

impl ShaMode {
    pub fn decode(param1: u8) -> Self {
        match param1 & SHA_MODE_MASK {
            0x00 => ShaMode::Start,
            0x01 => ShaMode::Update,
            0x02 => ShaMode::End,
            0x03 => ShaMode::Public,
            0x04 => ShaMode::HmacStart,
            0x05 => ShaMode::HmacEnd,
            0x06 => ShaMode::ReadContext,
            _ => ShaMode::WriteContext,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyKind {
    Stored,
    ValidateExternal,
    External,
    Validate,
    Invalidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyMode {
    pub kind: VerifyKind,
    pub mac: bool,
}

impl VerifyMode {
    pub fn decode(param1: u8) -> AtcaResult<Self> {
        let kind = match param1 & VERIFY_MODE_MASK {
            0x00 => VerifyKind::Stored,
            0x01 => VerifyKind::ValidateExternal,
            0x02 => VerifyKind::External,
            0x03 => VerifyKind::Validate,
            0x07 => VerifyKind::Invalidate,
            other => {
                return Err(AtcaError::bad_param(format!(
                    "invalid Verify mode {other:#04x}"
                )));
            }
        };
        Ok(VerifyMode {
            kind,
            mac: param1 & VERIFY_MODE_MAC_FLAG != 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureBootKind {
    Full,
    FullStore,
    FullCopy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecureBootMode {
    pub kind: SecureBootKind,
    pub encrypted_mac: bool,
}

impl SecureBootMode {
    pub fn decode(param1: u8) -> AtcaResult<Self> {
        let kind = match param1 & SECUREBOOT_MODE_MASK {
            0x05 => SecureBootKind::Full,
            0x06 => SecureBootKind::FullStore,
            0x07 => SecureBootKind::FullCopy,
            other => {
                return Err(AtcaError::bad_param(format!(
                    "invalid SecureBoot mode {other:#04x}"
                )));
            }
        };
        Ok(SecureBootMode {
            kind,
            encrypted_mac: param1 & SECUREBOOT_ENC_MAC_FLAG != 0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfAlgorithm {
    Prf,
    Aes,
    Hkdf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfTarget {
    TempKey,
    TempKeyUpper,
    Slot,
    AltKeyBuf,
    Output,
    OutputEnc,
    Reserved(u8),
}

impl KdfTarget {
    pub fn returns_output(self) -> bool {
        matches!(self, KdfTarget::Output | KdfTarget::OutputEnc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfMode {
    pub algorithm: KdfAlgorithm,
    pub target: KdfTarget,
}

impl KdfMode {
    pub fn decode(param1: u8) -> AtcaResult<Self> {
        let algorithm = match param1 & KDF_MODE_ALG_MASK {
            0x00 => KdfAlgorithm::Prf,
            0x20 => KdfAlgorithm::Aes,
            0x40 => KdfAlgorithm::Hkdf,
            other => {
                return Err(AtcaError::bad_param(format!(
                    "invalid KDF algorithm {other:#04x}"
                )));
            }
        };
        let target = match param1 & KDF_MODE_TARGET_MASK {
            0x00 => KdfTarget::TempKey,
            0x04 => KdfTarget::TempKeyUpper,
            0x08 => KdfTarget::Slot,
            0x0C => KdfTarget::AltKeyBuf,
            0x10 => KdfTarget::Output,
            0x14 => KdfTarget::OutputEnc,
            other => KdfTarget::Reserved(other),
        };
        Ok(KdfMode { algorithm, target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_modes() -> AtcaResult<()> {
        assert_eq!(
            NonceMode::decode(0x00)?,
            NonceMode::Calculated { seed_update: true }
        );
        assert_eq!(
            NonceMode::decode(0x01)?,
            NonceMode::Calculated { seed_update: false }
        );
        assert_eq!(
            NonceMode::decode(0x03)?,
            NonceMode::Passthrough { wide_input: false }
        );
        assert_eq!(
            NonceMode::decode(0x23)?,
            NonceMode::Passthrough { wide_input: true }
        );
        assert!(NonceMode::decode(0x02).is_err());
        Ok(())
    }

    #[test]
    fn test_verify_rejects_reserved_modes() {
        for mode in [0x04, 0x05, 0x06, 0x84] {
            assert!(VerifyMode::decode(mode).is_err(), "mode {mode:#04x}");
        }
    }

    #[test]
    fn test_secure_boot_flags() -> AtcaResult<()> {
        let mode = SecureBootMode::decode(0x85)?;
        assert_eq!(mode.kind, SecureBootKind::Full);
        assert!(mode.encrypted_mac);
        assert!(SecureBootMode::decode(0x00).is_err());
        Ok(())
    }

    #[test]
    fn test_kdf_decode() -> AtcaResult<()> {
        let mode = KdfMode::decode(0x34)?;
        assert_eq!(mode.algorithm, KdfAlgorithm::Aes);
        assert_eq!(mode.target, KdfTarget::OutputEnc);
        assert!(mode.target.returns_output());
        assert!(KdfMode::decode(0x60).is_err());
        assert_eq!(KdfMode::decode(0x18)?.target, KdfTarget::Reserved(0x18));
        Ok(())
    }

    #[test]
    fn test_sha_decode_is_total() {
        assert_eq!(ShaMode::decode(0xF8), ShaMode::Start);
        assert_eq!(ShaMode::decode(0x07), ShaMode::WriteContext);
    }
}
