//! Device families, ATECC608A clock-divider variants and revision
//! classification.

use serde::{Deserialize, Serialize};

/// Config zone byte holding the ATECC608A ChipMode register.
pub const CHIPMODE_OFFSET: u16 = 19;

/// ChipMode bits that select the clock divider.
pub const CHIPMODE_CLOCK_DIV_MASK: u8 = 0xF8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceFamily {
    #[serde(rename = "atsha204a")]
    Sha204A,
    #[serde(rename = "atecc108a")]
    Ecc108A,
    #[default]
    #[serde(rename = "atecc508a")]
    Ecc508A,
    #[serde(rename = "atecc608a")]
    Ecc608A,
}

impl DeviceFamily {
    pub const ALL: [DeviceFamily; 4] = [
        DeviceFamily::Sha204A,
        DeviceFamily::Ecc108A,
        DeviceFamily::Ecc508A,
        DeviceFamily::Ecc608A,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DeviceFamily::Sha204A => "ATSHA204A",
            DeviceFamily::Ecc108A => "ATECC108A",
            DeviceFamily::Ecc508A => "ATECC508A",
            DeviceFamily::Ecc608A => "ATECC608A",
        }
    }

    pub fn is_ecc(self) -> bool {
        !matches!(self, DeviceFamily::Sha204A)
    }

    /// Revision words reported by the Info command for this family.
    pub fn revisions(self) -> &'static [[u8; 4]] {
        match self {
            DeviceFamily::Sha204A => &SHA204A_REVISIONS,
            DeviceFamily::Ecc108A => &ECC108A_REVISIONS,
            DeviceFamily::Ecc508A => &ECC508A_REVISIONS,
            DeviceFamily::Ecc608A => &ECC608A_REVISIONS,
        }
    }
}

impl std::fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for DeviceFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceFamily::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown device family: {s}"))
    }
}

const SHA204A_REVISIONS: [[u8; 4]; 3] = [
    [0x00, 0x02, 0x00, 0x08],
    [0x00, 0x02, 0x00, 0x09],
    [0x00, 0x04, 0x05, 0x00],
];
const ECC108A_REVISIONS: [[u8; 4]; 1] = [[0x80, 0x00, 0x10, 0x01]];
const ECC508A_REVISIONS: [[u8; 4]; 1] = [[0x00, 0x00, 0x50, 0x00]];
const ECC608A_REVISIONS: [[u8; 4]; 1] = [[0x00, 0x00, 0x60, 0x01]];

/// Maps an Info revision word to a family. Only exact matches classify.
pub fn classify_revision(revision: &[u8]) -> Option<DeviceFamily> {
    let word: [u8; 4] = revision.get(..4)?.try_into().ok()?;
    DeviceFamily::ALL
        .iter()
        .copied()
        .find(|family| family.revisions().contains(&word))
}

/// ATECC608A clock divider. Slower dividers stretch execution times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClockDivider {
    #[default]
    M0,
    M1,
    M2,
}

impl ClockDivider {
    /// Decodes the ChipMode config byte. Unlisted divider values run with
    /// M0 timing.
    pub fn from_chip_mode(chip_mode: u8) -> Self {
        match chip_mode & CHIPMODE_CLOCK_DIV_MASK {
            0x28 => ClockDivider::M1,
            0x68 => ClockDivider::M2,
            _ => ClockDivider::M0,
        }
    }

    pub fn chip_mode_bits(self) -> u8 {
        match self {
            ClockDivider::M0 => 0x00,
            ClockDivider::M1 => 0x28,
            ClockDivider::M2 => 0x68,
        }
    }
}

/// Selects the execution time table. Only ATECC608A has sub-variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingProfile {
    Sha204A,
    Ecc108A,
    Ecc508A,
    Ecc608A(ClockDivider),
}

impl TimingProfile {
    pub fn new(family: DeviceFamily, divider: ClockDivider) -> Self {
        match family {
            DeviceFamily::Sha204A => TimingProfile::Sha204A,
            DeviceFamily::Ecc108A => TimingProfile::Ecc108A,
            DeviceFamily::Ecc508A => TimingProfile::Ecc508A,
            DeviceFamily::Ecc608A => TimingProfile::Ecc608A(divider),
        }
    }

    pub fn family(self) -> DeviceFamily {
        match self {
            TimingProfile::Sha204A => DeviceFamily::Sha204A,
            TimingProfile::Ecc108A => DeviceFamily::Ecc108A,
            TimingProfile::Ecc508A => DeviceFamily::Ecc508A,
            TimingProfile::Ecc608A(_) => DeviceFamily::Ecc608A,
        }
    }
}

impl From<DeviceFamily> for TimingProfile {
    fn from(family: DeviceFamily) -> Self {
        TimingProfile::new(family, ClockDivider::M0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_revisions() {
        assert_eq!(
            classify_revision(&[0x00, 0x00, 0x60, 0x01]),
            Some(DeviceFamily::Ecc608A)
        );
        assert_eq!(
            classify_revision(&[0x00, 0x00, 0x50, 0x00]),
            Some(DeviceFamily::Ecc508A)
        );
        assert_eq!(
            classify_revision(&[0x80, 0x00, 0x10, 0x01]),
            Some(DeviceFamily::Ecc108A)
        );
        for rev in SHA204A_REVISIONS {
            assert_eq!(classify_revision(&rev), Some(DeviceFamily::Sha204A));
        }
    }

    #[test]
    fn test_classify_unknown_or_short() {
        assert_eq!(classify_revision(&[0x00, 0x00, 0x60, 0x02]), None);
        assert_eq!(classify_revision(&[0x00, 0x00, 0x60]), None);
        assert_eq!(classify_revision(&[]), None);
    }

    #[test]
    fn test_clock_divider_decode() {
        assert_eq!(ClockDivider::from_chip_mode(0x00), ClockDivider::M0);
        assert_eq!(ClockDivider::from_chip_mode(0x28), ClockDivider::M1);
        assert_eq!(ClockDivider::from_chip_mode(0x6D), ClockDivider::M2);
        assert_eq!(ClockDivider::from_chip_mode(0x07), ClockDivider::M0);
        assert_eq!(ClockDivider::from_chip_mode(0x10), ClockDivider::M0);
    }

    #[test]
    fn test_family_parse_and_display() -> Result<(), String> {
        let family: DeviceFamily = "atecc608a".parse()?;
        assert_eq!(family, DeviceFamily::Ecc608A);
        assert_eq!(family.to_string(), "ATECC608A");
        assert!("atecc999".parse::<DeviceFamily>().is_err());
        Ok(())
    }

    #[test]
    fn test_profile_family() {
        let profile = TimingProfile::new(DeviceFamily::Ecc608A, ClockDivider::M2);
        assert_eq!(profile, TimingProfile::Ecc608A(ClockDivider::M2));
        assert_eq!(profile.family(), DeviceFamily::Ecc608A);
        assert_eq!(
            TimingProfile::new(DeviceFamily::Sha204A, ClockDivider::M2),
            TimingProfile::Sha204A
        );
    }
}
