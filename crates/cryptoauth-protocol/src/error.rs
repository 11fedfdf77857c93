//! Result taxonomy shared by the protocol, transport and device layers.
//!
//! Every operation in the engine returns [`AtcaResult`]. Local failures
//! (bad arguments, bus faults, CRC mismatches) and faults reported by the
//! secure element itself live in the same enum so the execution path can
//! propagate any of them with `?`.

use thiserror::Error;

use crate::opcode::Opcode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtcaError {
    #[error("Bad parameter: {0}")]
    BadParam(String),

    #[error("Opcode {opcode:?} is not supported by {family}")]
    BadOpcode { opcode: Opcode, family: &'static str },

    #[error("Communication failure: {0}")]
    CommFail(String),

    #[error("No response received from device")]
    RxNoResponse,

    #[error("Response too short: got {received} bytes")]
    RxFail { received: usize },

    #[error("CRC mismatch: expected {expected:02X?}, got {actual:02X?}")]
    CrcError { expected: [u8; 2], actual: [u8; 2] },

    #[error("Device reported a CRC or communication error")]
    DeviceCrcError,

    #[error("Device reported a parse error (bad length, opcode or parameter)")]
    ParseError,

    #[error("Device could not execute the command")]
    ExecutionError,

    #[error("Device is in self-test failure mode")]
    SelfTestError,

    #[error("Device reported an ECC computation fault")]
    EccFault,

    #[error("CheckMac or Verify comparison failed")]
    CheckMacVerifyFailed,

    #[error("Device reported wake success instead of a command result")]
    WakeSuccess,

    #[error("General failure: {0}")]
    GenFail(String),
}

pub type AtcaResult<T> = Result<T, AtcaError>;

impl AtcaError {
    pub fn bad_param(msg: impl Into<String>) -> Self {
        AtcaError::BadParam(msg.into())
    }

    pub fn comm_fail(msg: impl Into<String>) -> Self {
        AtcaError::CommFail(msg.into())
    }

    /// True for faults the secure element reported in a status frame.
    pub fn is_device_status(&self) -> bool {
        matches!(
            self,
            AtcaError::DeviceCrcError
                | AtcaError::ParseError
                | AtcaError::ExecutionError
                | AtcaError::SelfTestError
                | AtcaError::EccFault
                | AtcaError::CheckMacVerifyFailed
                | AtcaError::WakeSuccess
        )
    }

    /// True for failures of the physical exchange rather than the command.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AtcaError::CommFail(_)
                | AtcaError::RxNoResponse
                | AtcaError::RxFail { .. }
                | AtcaError::CrcError { .. }
        )
    }
}

impl From<std::io::Error> for AtcaError {
    fn from(e: std::io::Error) -> Self {
        AtcaError::CommFail(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AtcaError::RxFail { received: 2 };
        assert_eq!(err.to_string(), "Response too short: got 2 bytes");

        let err = AtcaError::CrcError {
            expected: [0x03, 0x40],
            actual: [0x00, 0x00],
        };
        assert_eq!(
            err.to_string(),
            "CRC mismatch: expected [03, 40], got [00, 00]"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::TimedOut, "bus stuck");
        let err: AtcaError = io_err.into();
        assert!(matches!(err, AtcaError::CommFail(_)));
        assert!(err.is_transport());
    }

    #[test]
    fn test_classification() {
        assert!(AtcaError::ParseError.is_device_status());
        assert!(AtcaError::WakeSuccess.is_device_status());
        assert!(!AtcaError::RxNoResponse.is_device_status());
        assert!(!AtcaError::bad_param("x").is_transport());
    }
}
