//! Command opcodes understood by the CryptoAuthentication family.

use serde::{Deserialize, Serialize};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Opcode {
    Pause = 0x01,
    Read = 0x02,
    Mac = 0x08,
    Hmac = 0x11,
    Write = 0x12,
    GenDig = 0x15,
    Nonce = 0x16,
    Lock = 0x17,
    Random = 0x1B,
    DeriveKey = 0x1C,
    UpdateExtra = 0x20,
    Counter = 0x24,
    CheckMac = 0x28,
    Info = 0x30,
    GenKey = 0x40,
    Sign = 0x41,
    Ecdh = 0x43,
    Verify = 0x45,
    PrivWrite = 0x46,
    Sha = 0x47,
    Aes = 0x51,
    Kdf = 0x56,
    SelfTest = 0x77,
    SecureBoot = 0x80,
}

impl Opcode {
    pub const ALL: [Opcode; 24] = [
        Opcode::Pause,
        Opcode::Read,
        Opcode::Mac,
        Opcode::Hmac,
        Opcode::Write,
        Opcode::GenDig,
        Opcode::Nonce,
        Opcode::Lock,
        Opcode::Random,
        Opcode::DeriveKey,
        Opcode::UpdateExtra,
        Opcode::Counter,
        Opcode::CheckMac,
        Opcode::Info,
        Opcode::GenKey,
        Opcode::Sign,
        Opcode::Ecdh,
        Opcode::Verify,
        Opcode::PrivWrite,
        Opcode::Sha,
        Opcode::Aes,
        Opcode::Kdf,
        Opcode::SelfTest,
        Opcode::SecureBoot,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.to_u8() == value)
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Pause => "Pause",
            Opcode::Read => "Read",
            Opcode::Mac => "MAC",
            Opcode::Hmac => "HMAC",
            Opcode::Write => "Write",
            Opcode::GenDig => "GenDig",
            Opcode::Nonce => "Nonce",
            Opcode::Lock => "Lock",
            Opcode::Random => "Random",
            Opcode::DeriveKey => "DeriveKey",
            Opcode::UpdateExtra => "UpdateExtra",
            Opcode::Counter => "Counter",
            Opcode::CheckMac => "CheckMac",
            Opcode::Info => "Info",
            Opcode::GenKey => "GenKey",
            Opcode::Sign => "Sign",
            Opcode::Ecdh => "ECDH",
            Opcode::Verify => "Verify",
            Opcode::PrivWrite => "PrivWrite",
            Opcode::Sha => "SHA",
            Opcode::Aes => "AES",
            Opcode::Kdf => "KDF",
            Opcode::SelfTest => "SelfTest",
            Opcode::SecureBoot => "SecureBoot",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
