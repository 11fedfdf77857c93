//! Command frame construction and response framing.

use tracing::trace;

use crate::command::{Command, FrameSizes, KdfOutputSizes, CMD_SIZE_MIN, PAYLOAD_IDX};
use crate::crc::{append_crc, verify_frame, COUNT_IDX, CRC_SIZE};
use crate::error::{AtcaError, AtcaResult};
use crate::family::{DeviceFamily, TimingProfile};
use crate::opcode::Opcode;
use crate::timing;

/// Largest frame the device accepts or returns.
pub const MAX_FRAME_SIZE: usize = 192;

/// A finalized command frame.
///
/// Layout: `count, opcode, param1, param2 (LE), payload.., crc (LE)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    opcode: Opcode,
    param1: u8,
    param2: u16,
    sizes: FrameSizes,
    frame: Vec<u8>,
}

impl Packet {
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn param1(&self) -> u8 {
        self.param1
    }

    pub fn param2(&self) -> u16 {
        self.param2
    }

    pub fn tx_size(&self) -> usize {
        self.sizes.tx
    }

    /// Expected response length including count and CRC bytes.
    pub fn rx_size(&self) -> usize {
        self.sizes.rx
    }

    /// OutData/OutNonce sizes, only present for KDF.
    pub fn kdf_output(&self) -> Option<KdfOutputSizes> {
        self.sizes.kdf
    }

    pub fn payload(&self) -> &[u8] {
        let end = self.frame.len().saturating_sub(CRC_SIZE);
        self.frame.get(PAYLOAD_IDX..end).unwrap_or_default()
    }

    /// The complete wire frame, CRC included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.frame
    }
}

/// Builds frames for one device family and clock configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandBuilder {
    profile: TimingProfile,
}

impl CommandBuilder {
    pub fn new(profile: TimingProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> TimingProfile {
        self.profile
    }

    pub fn family(&self) -> DeviceFamily {
        self.profile.family()
    }

    pub fn set_profile(&mut self, profile: TimingProfile) {
        self.profile = profile;
    }

    /// Execution time for `opcode`, `BadOpcode` when the family lacks it.
    pub fn execution_time_ms(&self, opcode: Opcode) -> AtcaResult<u32> {
        timing::execution_time_ms(self.profile, opcode)
    }

    /// Validates and sizes a command, then appends its CRC.
    ///
    /// # Errors
    ///
    /// `BadOpcode` when the family does not implement the opcode,
    /// `BadParam` for invalid mode bits or when `data` does not have the
    /// exact payload length the mode requires.
    pub fn build(
        &self,
        command: Command,
        param1: u8,
        param2: u16,
        data: &[u8],
    ) -> AtcaResult<Packet> {
        let opcode = command.opcode();
        self.execution_time_ms(opcode)?;

        let sizes = command.sizes(self.family(), param1, param2, data)?;
        if sizes.tx > MAX_FRAME_SIZE {
            return Err(AtcaError::bad_param(format!(
                "{opcode} frame of {} bytes exceeds {MAX_FRAME_SIZE}",
                sizes.tx
            )));
        }
        if data.len() != sizes.payload_len() {
            return Err(AtcaError::bad_param(format!(
                "{opcode} expects {} payload bytes, got {}",
                sizes.payload_len(),
                data.len()
            )));
        }

        let count = u8::try_from(sizes.tx)
            .map_err(|e| AtcaError::bad_param(format!("{opcode} frame too large: {e}")))?;
        let mut frame = Vec::with_capacity(sizes.tx);
        frame.push(count);
        frame.push(opcode.to_u8());
        frame.push(param1);
        frame.extend_from_slice(&param2.to_le_bytes());
        frame.extend_from_slice(data);
        append_crc(&mut frame);

        trace!(
            opcode = %opcode,
            param1,
            param2,
            tx = sizes.tx,
            rx = sizes.rx,
            "built command frame"
        );

        Ok(Packet {
            opcode,
            param1,
            param2,
            sizes,
            frame,
        })
    }
}

/// Bytes read back from the device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    bytes: Vec<u8>,
}

impl Response {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Declared frame length from the count byte.
    pub fn count(&self) -> Option<usize> {
        self.bytes.get(COUNT_IDX).map(|&c| usize::from(c))
    }

    /// Payload between the count byte and the CRC.
    pub fn data(&self) -> &[u8] {
        let end = self
            .count()
            .unwrap_or_default()
            .min(self.bytes.len())
            .saturating_sub(CRC_SIZE);
        self.bytes.get(1..end).unwrap_or_default()
    }

    pub fn verify_crc(&self) -> AtcaResult<()> {
        verify_frame(&self.bytes)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl From<Vec<u8>> for Response {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

const _: () = assert!(CMD_SIZE_MIN == PAYLOAD_IDX + CRC_SIZE);
