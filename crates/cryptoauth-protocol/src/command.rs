//! Command variants and their frame sizing rules.
//!
//! Each [`Command`] knows how large its transmit frame is and how many
//! response bytes to expect, given the mode byte (param1), param2 and the
//! payload. Sizes always include the count byte and the two CRC bytes.

use crate::error::{AtcaError, AtcaResult};
use crate::family::DeviceFamily;
use crate::mode::{
    AES_MODE_GFM, AES_MODE_OP_MASK, GENDIG_ZONE_SHARED_NONCE, GENKEY_MODE_PUBKEY_DIGEST,
    KDF_DETAILS_PRF_AEAD_MASK, KDF_DETAILS_PRF_AEAD_MODE3, KDF_DETAILS_PRF_TARGET_LEN_64,
    KdfAlgorithm, KdfMode, KdfTarget, MAC_MODE_BLOCK2_TEMPKEY, NonceMode, READ_WRITE_32_FLAG,
    SecureBootKind, SecureBootMode, ShaMode, VerifyKind, VerifyMode,
};
use crate::opcode::Opcode;

/// count + opcode + param1 + param2[2] + crc[2]
pub const CMD_SIZE_MIN: usize = 7;
/// Offset of the first payload byte in a command frame.
pub const PAYLOAD_IDX: usize = 5;
/// count + crc[2]
pub const PACKET_OVERHEAD: usize = 3;
/// Smallest valid response: a status frame.
pub const RSP_SIZE_MIN: usize = 4;
pub const RSP_SIZE_STATUS: usize = RSP_SIZE_MIN;
pub const RSP_SIZE_4: usize = 4 + PACKET_OVERHEAD;
pub const RSP_SIZE_16: usize = 16 + PACKET_OVERHEAD;
pub const RSP_SIZE_32: usize = 32 + PACKET_OVERHEAD;
pub const RSP_SIZE_64: usize = 64 + PACKET_OVERHEAD;
pub const SHA_CONTEXT_MAX_SIZE: usize = 99;

pub const WORD_SIZE: usize = 4;
pub const BLOCK_SIZE: usize = 32;
pub const KDF_DETAILS_SIZE: usize = 4;
pub const OUTNONCE_SIZE: usize = 32;

/// One variant per opcode. Flags that the frame itself cannot express are
/// carried on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Read,
    Mac,
    Hmac,
    Write { has_mac: bool },
    GenDig { no_mac_key: bool },
    Nonce,
    Lock,
    Random,
    DeriveKey { has_mac: bool },
    UpdateExtra,
    Counter,
    CheckMac,
    Info,
    GenKey,
    Sign,
    Ecdh,
    Verify,
    PrivWrite,
    Sha { write_context_size: u16 },
    Aes,
    Kdf,
    SelfTest,
    SecureBoot,
}

/// Output sizes reported alongside a KDF frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KdfOutputSizes {
    pub data: usize,
    pub nonce: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSizes {
    pub tx: usize,
    pub rx: usize,
    pub kdf: Option<KdfOutputSizes>,
}

impl FrameSizes {
    fn fixed(tx: usize, rx: usize) -> Self {
        FrameSizes { tx, rx, kdf: None }
    }

    /// Number of payload bytes between the header and the CRC.
    pub fn payload_len(&self) -> usize {
        self.tx.saturating_sub(CMD_SIZE_MIN)
    }
}

impl Command {
    pub fn opcode(self) -> Opcode {
        match self {
            Command::Pause => Opcode::Pause,
            Command::Read => Opcode::Read,
            Command::Mac => Opcode::Mac,
            Command::Hmac => Opcode::Hmac,
            Command::Write { .. } => Opcode::Write,
            Command::GenDig { .. } => Opcode::GenDig,
            Command::Nonce => Opcode::Nonce,
            Command::Lock => Opcode::Lock,
            Command::Random => Opcode::Random,
            Command::DeriveKey { .. } => Opcode::DeriveKey,
            Command::UpdateExtra => Opcode::UpdateExtra,
            Command::Counter => Opcode::Counter,
            Command::CheckMac => Opcode::CheckMac,
            Command::Info => Opcode::Info,
            Command::GenKey => Opcode::GenKey,
            Command::Sign => Opcode::Sign,
            Command::Ecdh => Opcode::Ecdh,
            Command::Verify => Opcode::Verify,
            Command::PrivWrite => Opcode::PrivWrite,
            Command::Sha { .. } => Opcode::Sha,
            Command::Aes => Opcode::Aes,
            Command::Kdf => Opcode::Kdf,
            Command::SelfTest => Opcode::SelfTest,
            Command::SecureBoot => Opcode::SecureBoot,
        }
    }

    /// The command for `opcode` with every side flag cleared.
    pub fn from_opcode(opcode: Opcode) -> Self {
        match opcode {
            Opcode::Pause => Command::Pause,
            Opcode::Read => Command::Read,
            Opcode::Mac => Command::Mac,
            Opcode::Hmac => Command::Hmac,
            Opcode::Write => Command::Write { has_mac: false },
            Opcode::GenDig => Command::GenDig { no_mac_key: false },
            Opcode::Nonce => Command::Nonce,
            Opcode::Lock => Command::Lock,
            Opcode::Random => Command::Random,
            Opcode::DeriveKey => Command::DeriveKey { has_mac: false },
            Opcode::UpdateExtra => Command::UpdateExtra,
            Opcode::Counter => Command::Counter,
            Opcode::CheckMac => Command::CheckMac,
            Opcode::Info => Command::Info,
            Opcode::GenKey => Command::GenKey,
            Opcode::Sign => Command::Sign,
            Opcode::Ecdh => Command::Ecdh,
            Opcode::Verify => Command::Verify,
            Opcode::PrivWrite => Command::PrivWrite,
            Opcode::Sha => Command::Sha {
                write_context_size: 0,
            },
            Opcode::Aes => Command::Aes,
            Opcode::Kdf => Command::Kdf,
            Opcode::SelfTest => Command::SelfTest,
            Opcode::SecureBoot => Command::SecureBoot,
        }
    }

    /// Derives transmit and receive sizes.
    ///
    /// `family` only matters for SHA update, whose response differs on
    /// ATSHA204A. KDF reads its details word from the first four payload
    /// bytes.
    pub fn sizes(
        self,
        family: DeviceFamily,
        param1: u8,
        param2: u16,
        data: &[u8],
    ) -> AtcaResult<FrameSizes> {
        let sizes = match self {
            Command::Pause => FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_STATUS),
            Command::Read => {
                let rx = if param1 & READ_WRITE_32_FLAG == 0 {
                    RSP_SIZE_4
                } else {
                    RSP_SIZE_32
                };
                FrameSizes::fixed(CMD_SIZE_MIN, rx)
            }
            Command::Mac => {
                let tx = if param1 & MAC_MODE_BLOCK2_TEMPKEY == 0 {
                    CMD_SIZE_MIN + BLOCK_SIZE
                } else {
                    CMD_SIZE_MIN
                };
                FrameSizes::fixed(tx, RSP_SIZE_32)
            }
            Command::Hmac => FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_32),
            Command::Write { has_mac } => {
                let value = if param1 & READ_WRITE_32_FLAG == 0 {
                    WORD_SIZE
                } else {
                    BLOCK_SIZE
                };
                let mac = if has_mac { BLOCK_SIZE } else { 0 };
                FrameSizes::fixed(CMD_SIZE_MIN + value + mac, RSP_SIZE_STATUS)
            }
            Command::GenDig { no_mac_key } => {
                let other = if param1 == GENDIG_ZONE_SHARED_NONCE {
                    BLOCK_SIZE
                } else if no_mac_key {
                    WORD_SIZE
                } else {
                    0
                };
                FrameSizes::fixed(CMD_SIZE_MIN + other, RSP_SIZE_STATUS)
            }
            Command::Nonce => match NonceMode::decode(param1)? {
                NonceMode::Calculated { .. } => FrameSizes::fixed(CMD_SIZE_MIN + 20, RSP_SIZE_32),
                NonceMode::Passthrough { wide_input } => {
                    let input = if wide_input { 64 } else { 32 };
                    FrameSizes::fixed(CMD_SIZE_MIN + input, RSP_SIZE_STATUS)
                }
            },
            Command::Lock => FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_STATUS),
            Command::Random => FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_32),
            Command::DeriveKey { has_mac } => {
                let mac = if has_mac { BLOCK_SIZE } else { 0 };
                FrameSizes::fixed(CMD_SIZE_MIN + mac, RSP_SIZE_STATUS)
            }
            Command::UpdateExtra => FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_STATUS),
            Command::Counter => FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_4),
            // ClientChal[32] + ClientResp[32] + OtherData[13]
            Command::CheckMac => FrameSizes::fixed(CMD_SIZE_MIN + 77, RSP_SIZE_STATUS),
            Command::Info => FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_4),
            Command::GenKey => {
                if param1 & GENKEY_MODE_PUBKEY_DIGEST != 0 {
                    FrameSizes::fixed(CMD_SIZE_MIN + 3, RSP_SIZE_STATUS)
                } else {
                    FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_64)
                }
            }
            Command::Sign => FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_64),
            Command::Ecdh => FrameSizes::fixed(CMD_SIZE_MIN + 64, RSP_SIZE_64),
            Command::Verify => verify_sizes(VerifyMode::decode(param1)?),
            Command::PrivWrite => FrameSizes::fixed(CMD_SIZE_MIN + 68, RSP_SIZE_STATUS),
            Command::Sha { write_context_size } => sha_sizes(
                ShaMode::decode(param1),
                family,
                usize::from(param2),
                usize::from(write_context_size),
            ),
            Command::Aes => {
                let input = if param1 & AES_MODE_OP_MASK == AES_MODE_GFM {
                    BLOCK_SIZE
                } else {
                    16
                };
                FrameSizes::fixed(CMD_SIZE_MIN + input, RSP_SIZE_16)
            }
            Command::Kdf => kdf_sizes(KdfMode::decode(param1)?, data)?,
            Command::SelfTest => FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_STATUS),
            Command::SecureBoot => {
                let mode = SecureBootMode::decode(param1)?;
                let input = match mode.kind {
                    SecureBootKind::Full | SecureBootKind::FullCopy => BLOCK_SIZE + 64,
                    SecureBootKind::FullStore => BLOCK_SIZE,
                };
                let rx = if mode.encrypted_mac {
                    RSP_SIZE_32
                } else {
                    RSP_SIZE_STATUS
                };
                FrameSizes::fixed(CMD_SIZE_MIN + input, rx)
            }
        };

        Ok(sizes)
    }
}

fn verify_sizes(mode: VerifyMode) -> FrameSizes {
    let mac_rx = if mode.mac {
        RSP_SIZE_32
    } else {
        RSP_SIZE_STATUS
    };
    match mode.kind {
        // Signature[64]
        VerifyKind::Stored => FrameSizes::fixed(CMD_SIZE_MIN + 64, mac_rx),
        // Signature[64] + PublicKey[64]
        VerifyKind::External => FrameSizes::fixed(CMD_SIZE_MIN + 128, mac_rx),
        VerifyKind::ValidateExternal => FrameSizes::fixed(CMD_SIZE_MIN + 128, RSP_SIZE_STATUS),
        // Signature[64] + OtherData[19]
        VerifyKind::Validate | VerifyKind::Invalidate => {
            FrameSizes::fixed(CMD_SIZE_MIN + 83, RSP_SIZE_STATUS)
        }
    }
}

fn sha_sizes(
    mode: ShaMode,
    family: DeviceFamily,
    message_len: usize,
    context_len: usize,
) -> FrameSizes {
    match mode {
        ShaMode::Start | ShaMode::HmacStart | ShaMode::Public => {
            FrameSizes::fixed(CMD_SIZE_MIN, RSP_SIZE_STATUS)
        }
        ShaMode::Update => {
            // ATSHA204A answers an update with the running digest.
            let rx = match family {
                DeviceFamily::Sha204A => RSP_SIZE_32,
                DeviceFamily::Ecc108A | DeviceFamily::Ecc508A | DeviceFamily::Ecc608A => {
                    RSP_SIZE_STATUS
                }
            };
            FrameSizes::fixed(CMD_SIZE_MIN + message_len, rx)
        }
        ShaMode::End | ShaMode::HmacEnd => {
            FrameSizes::fixed(CMD_SIZE_MIN + message_len, RSP_SIZE_32)
        }
        ShaMode::ReadContext => {
            FrameSizes::fixed(CMD_SIZE_MIN, SHA_CONTEXT_MAX_SIZE + PACKET_OVERHEAD)
        }
        ShaMode::WriteContext => FrameSizes::fixed(CMD_SIZE_MIN + context_len, RSP_SIZE_STATUS),
    }
}

fn kdf_sizes(mode: KdfMode, data: &[u8]) -> AtcaResult<FrameSizes> {
    let details_bytes: [u8; KDF_DETAILS_SIZE] = data
        .get(..KDF_DETAILS_SIZE)
        .and_then(|d| d.try_into().ok())
        .ok_or_else(|| AtcaError::bad_param("KDF payload must start with a 4-byte details word"))?;
    let details = u32::from_le_bytes(details_bytes);

    let message_len = match mode.algorithm {
        KdfAlgorithm::Aes => 16,
        // Message length lives in the last details byte.
        KdfAlgorithm::Prf | KdfAlgorithm::Hkdf => usize::from(details_bytes[3]),
    };
    let tx = CMD_SIZE_MIN + KDF_DETAILS_SIZE + message_len;

    let output = match mode.algorithm {
        KdfAlgorithm::Prf if mode.target.returns_output() => {
            if details & KDF_DETAILS_PRF_TARGET_LEN_64 != 0 {
                64
            } else {
                32
            }
        }
        KdfAlgorithm::Prf if details & KDF_DETAILS_PRF_AEAD_MASK == KDF_DETAILS_PRF_AEAD_MODE3 => 32,
        KdfAlgorithm::Aes | KdfAlgorithm::Hkdf if mode.target.returns_output() => 32,
        KdfAlgorithm::Prf | KdfAlgorithm::Aes | KdfAlgorithm::Hkdf => 1,
    };

    let mut rx = PACKET_OVERHEAD + output;
    let data_size = if rx > RSP_SIZE_MIN {
        rx - PACKET_OVERHEAD
    } else {
        0
    };
    let nonce_size = if mode.target == KdfTarget::OutputEnc {
        rx += OUTNONCE_SIZE;
        OUTNONCE_SIZE
    } else {
        0
    };

    Ok(FrameSizes {
        tx,
        rx,
        kdf: Some(KdfOutputSizes {
            data: data_size,
            nonce: nonce_size,
        }),
    })
}
