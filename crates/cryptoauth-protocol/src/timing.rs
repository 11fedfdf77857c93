//! Per-family execution time tables.
//!
//! Every table matches all opcodes explicitly. `None` means the family does
//! not implement the opcode, which doubles as the opcode/family
//! compatibility check performed before any I/O.

use crate::error::{AtcaError, AtcaResult};
use crate::family::{ClockDivider, TimingProfile};
use crate::opcode::Opcode;

/// Execution time in milliseconds for `opcode`, or `BadOpcode` when the
/// profile's family does not support it.
pub fn execution_time_ms(profile: TimingProfile, opcode: Opcode) -> AtcaResult<u32> {
    let ms = match profile {
        TimingProfile::Sha204A => sha204a(opcode),
        TimingProfile::Ecc108A => ecc108a(opcode),
        TimingProfile::Ecc508A => ecc508a(opcode),
        TimingProfile::Ecc608A(divider) => ecc608a(divider, opcode),
    };

    ms.map(u32::from).ok_or(AtcaError::BadOpcode {
        opcode,
        family: profile.family().name(),
    })
}

/// True when the profile's family implements `opcode`.
pub fn supports(profile: TimingProfile, opcode: Opcode) -> bool {
    execution_time_ms(profile, opcode).is_ok()
}

fn sha204a(opcode: Opcode) -> Option<u16> {
    match opcode {
        Opcode::CheckMac => Some(38),
        Opcode::DeriveKey => Some(62),
        Opcode::GenDig => Some(43),
        Opcode::Hmac => Some(69),
        Opcode::Info => Some(2),
        Opcode::Lock => Some(24),
        Opcode::Mac => Some(35),
        Opcode::Nonce => Some(60),
        Opcode::Pause => Some(2),
        Opcode::Random => Some(50),
        Opcode::Read => Some(5),
        Opcode::Sha => Some(22),
        Opcode::UpdateExtra => Some(12),
        Opcode::Write => Some(42),
        Opcode::Counter
        | Opcode::GenKey
        | Opcode::PrivWrite
        | Opcode::Sign
        | Opcode::Verify
        | Opcode::Ecdh
        | Opcode::Aes
        | Opcode::Kdf
        | Opcode::SecureBoot
        | Opcode::SelfTest => None,
    }
}

fn ecc108a(opcode: Opcode) -> Option<u16> {
    match opcode {
        Opcode::CheckMac => Some(13),
        Opcode::Counter => Some(20),
        Opcode::DeriveKey => Some(50),
        Opcode::GenDig => Some(11),
        Opcode::GenKey => Some(115),
        Opcode::Hmac => Some(23),
        Opcode::Info => Some(2),
        Opcode::Lock => Some(32),
        Opcode::Mac => Some(14),
        Opcode::Nonce => Some(29),
        Opcode::Pause => Some(3),
        Opcode::PrivWrite => Some(48),
        Opcode::Random => Some(23),
        Opcode::Read => Some(5),
        Opcode::Sha => Some(9),
        Opcode::Sign => Some(60),
        Opcode::UpdateExtra => Some(10),
        Opcode::Verify => Some(72),
        Opcode::Write => Some(26),
        Opcode::Ecdh | Opcode::Aes | Opcode::Kdf | Opcode::SecureBoot | Opcode::SelfTest => None,
    }
}

fn ecc508a(opcode: Opcode) -> Option<u16> {
    match opcode {
        Opcode::Ecdh => Some(58),
        Opcode::CheckMac
        | Opcode::Counter
        | Opcode::DeriveKey
        | Opcode::GenDig
        | Opcode::GenKey
        | Opcode::Hmac
        | Opcode::Info
        | Opcode::Lock
        | Opcode::Mac
        | Opcode::Nonce
        | Opcode::Pause
        | Opcode::PrivWrite
        | Opcode::Random
        | Opcode::Read
        | Opcode::Sha
        | Opcode::Sign
        | Opcode::UpdateExtra
        | Opcode::Verify
        | Opcode::Write
        | Opcode::Aes
        | Opcode::Kdf
        | Opcode::SecureBoot
        | Opcode::SelfTest => ecc108a(opcode),
    }
}

fn ecc608a(divider: ClockDivider, opcode: Opcode) -> Option<u16> {
    // (M0, M1, M2)
    let (m0, m1, m2) = match opcode {
        Opcode::Aes => (27, 27, 27),
        Opcode::CheckMac => (40, 40, 40),
        Opcode::Counter => (25, 25, 25),
        Opcode::DeriveKey => (50, 50, 50),
        Opcode::Ecdh => (60, 140, 455),
        Opcode::GenDig => (25, 35, 35),
        Opcode::GenKey => (115, 215, 630),
        Opcode::Info => (5, 5, 5),
        Opcode::Kdf => (165, 165, 165),
        Opcode::Lock => (35, 35, 35),
        Opcode::Mac => (55, 55, 55),
        Opcode::Nonce => (20, 20, 20),
        Opcode::PrivWrite => (50, 50, 50),
        Opcode::Random => (23, 23, 23),
        Opcode::Read => (5, 5, 5),
        Opcode::SecureBoot => (80, 151, 451),
        Opcode::SelfTest => (250, 590, 2200),
        Opcode::Sha => (36, 42, 75),
        Opcode::Sign => (115, 220, 665),
        Opcode::UpdateExtra => (10, 10, 10),
        Opcode::Verify => (105, 295, 1085),
        Opcode::Write => (45, 45, 45),
        Opcode::Hmac | Opcode::Pause => return None,
    };

    Some(match divider {
        ClockDivider::M0 => m0,
        ClockDivider::M1 => m1,
        ClockDivider::M2 => m2,
    })
}
