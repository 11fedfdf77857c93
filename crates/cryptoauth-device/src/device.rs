//! The device handle.
//!
//! A [`Device`] pairs one command builder (family and clock divider) with one
//! transport. Callers own it explicitly and may hold several at once, on the
//! same bus or on different ones.

use std::sync::Arc;

use cryptoauth_hal::{BusKey, Delay, Hal, InterfaceConfig, Release, Transport};
use cryptoauth_protocol::family::CHIPMODE_OFFSET;
use cryptoauth_protocol::{
    AtcaError, AtcaResult, BLOCK_SIZE, ClockDivider, Command, CommandBuilder, DeviceFamily,
    Opcode, Response, TimingProfile, WORD_SIZE, Zone, zone_address, zone_size,
};
use tracing::{debug, info};

use crate::execution;

/// Info mode that returns the revision word.
pub const INFO_MODE_REVISION: u8 = 0x00;

/// Random mode that refreshes the seed first.
pub const RANDOM_SEED_UPDATE: u8 = 0x00;

pub const SERIAL_NUMBER_SIZE: usize = 9;
pub const RANDOM_NUM_SIZE: usize = 32;

pub struct Device {
    builder: CommandBuilder,
    transport: Box<dyn Transport>,
    delay: Arc<dyn Delay>,
}

impl Device {
    /// Opens the interface described by `config` and prepares the device.
    ///
    /// For ATECC608A the ChipMode byte is read so that execution waits match
    /// the configured clock divider. If that read fails the interface is
    /// released again and the error returned.
    ///
    /// # Errors
    ///
    /// Anything [`Hal::open`] returns, or the error from the ChipMode read.
    pub fn init(config: &InterfaceConfig, hal: &mut Hal) -> AtcaResult<Self> {
        let transport = hal.open(config)?;
        let mut device = Self::with_transport(transport, hal.delay());

        if config.family == DeviceFamily::Ecc608A {
            match device.read_clock_divider() {
                Ok(divider) => {
                    device
                        .builder
                        .set_profile(TimingProfile::new(DeviceFamily::Ecc608A, divider));
                }
                Err(e) => {
                    hal.release(device.transport)?;
                    return Err(e);
                }
            }
        }

        info!(
            family = %device.family(),
            bus = %device.bus_key(),
            profile = ?device.profile(),
            "device initialized"
        );
        Ok(device)
    }

    /// Wraps an open transport without touching the device.
    ///
    /// Timing follows the family in the transport's config with the default
    /// clock divider.
    pub fn with_transport(transport: Box<dyn Transport>, delay: Arc<dyn Delay>) -> Self {
        let builder = CommandBuilder::new(TimingProfile::from(transport.config().family));
        Self {
            builder,
            transport,
            delay,
        }
    }

    /// Releases the interface's bus reference.
    pub fn release(self, hal: &mut Hal) -> AtcaResult<Release> {
        debug!(bus = %self.bus_key(), "releasing device");
        hal.release(self.transport)
    }

    pub fn family(&self) -> DeviceFamily {
        self.builder.family()
    }

    pub fn profile(&self) -> TimingProfile {
        self.builder.profile()
    }

    pub fn config(&self) -> &InterfaceConfig {
        self.transport.config()
    }

    pub fn bus_key(&self) -> BusKey {
        self.transport.bus_key()
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    /// Runs one command: wake, send, wait, receive, check, idle.
    pub fn execute(
        &mut self,
        command: Command,
        param1: u8,
        param2: u16,
        data: &[u8],
    ) -> AtcaResult<Response> {
        execution::execute(
            &self.builder,
            self.transport.as_mut(),
            self.delay.as_ref(),
            command,
            param1,
            param2,
            data,
        )
    }

    pub fn wake(&mut self) -> AtcaResult<()> {
        self.transport.wake()
    }

    pub fn idle(&mut self) -> AtcaResult<()> {
        self.transport.idle()
    }

    pub fn sleep(&mut self) -> AtcaResult<()> {
        self.transport.sleep()
    }

    /// Revision word reported by Info.
    pub fn info(&mut self) -> AtcaResult<[u8; 4]> {
        let response = self.execute(Command::Info, INFO_MODE_REVISION, 0, &[])?;
        fixed(&response)
    }

    pub fn random(&mut self) -> AtcaResult<[u8; RANDOM_NUM_SIZE]> {
        let response = self.execute(Command::Random, RANDOM_SEED_UPDATE, 0, &[])?;
        fixed(&response)
    }

    /// The 9-byte serial number: config bytes 0..4 followed by 8..13.
    pub fn serial_number(&mut self) -> AtcaResult<[u8; SERIAL_NUMBER_SIZE]> {
        let block = self.read_zone(Zone::Config, 0, 0, 0, BLOCK_SIZE)?;
        let (Some(head), Some(tail)) = (block.get(0..4), block.get(8..13)) else {
            return Err(AtcaError::RxFail {
                received: block.len(),
            });
        };
        let mut serial = [0u8; SERIAL_NUMBER_SIZE];
        let (dst_head, dst_tail) = serial.split_at_mut(4);
        dst_head.copy_from_slice(head);
        dst_tail.copy_from_slice(tail);
        Ok(serial)
    }

    /// One Read command of a word (`len` 4) or a block (`len` 32).
    ///
    /// # Errors
    ///
    /// `BadParam` for any other length.
    pub fn read_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        block: u8,
        offset: u8,
        len: usize,
    ) -> AtcaResult<Vec<u8>> {
        let is_block = access_size(len)?;
        let address = zone_address(zone, slot, block, offset);
        let response = self.execute(Command::Read, zone.param1(is_block), address, &[])?;
        let data = response.data();
        if data.len() != len {
            return Err(AtcaError::RxFail {
                received: response.len(),
            });
        }
        Ok(data.to_vec())
    }

    /// One Write command of a word or a block, without MAC.
    ///
    /// # Errors
    ///
    /// `BadParam` unless `data` is 4 or 32 bytes.
    pub fn write_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        block: u8,
        offset: u8,
        data: &[u8],
    ) -> AtcaResult<()> {
        let is_block = access_size(data.len())?;
        let address = zone_address(zone, slot, block, offset);
        self.execute(
            Command::Write { has_mac: false },
            zone.param1(is_block),
            address,
            data,
        )?;
        Ok(())
    }

    /// Reads `len` bytes starting at byte `offset` of a zone or data slot.
    ///
    /// Block-aligned stretches of at least 32 bytes are read a block at a
    /// time, everything else a word at a time.
    ///
    /// # Errors
    ///
    /// `BadParam` when the range runs past the end of the zone.
    pub fn read_bytes_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        offset: usize,
        len: usize,
    ) -> AtcaResult<Vec<u8>> {
        let end = self.checked_range(zone, slot, offset, len)?;
        let mut out = Vec::with_capacity(len);
        let mut pos = offset;

        while pos < end {
            let (block, word) = split_offset(pos)?;
            let remaining = end.saturating_sub(pos);
            let (chunk_start, chunk) = if pos % BLOCK_SIZE == 0 && remaining >= BLOCK_SIZE {
                (pos, self.read_zone(zone, slot, block, 0, BLOCK_SIZE)?)
            } else {
                let word_start = pos - pos % WORD_SIZE;
                (word_start, self.read_zone(zone, slot, block, word, WORD_SIZE)?)
            };

            let skip = pos.saturating_sub(chunk_start);
            let take = remaining.min(chunk.len().saturating_sub(skip));
            let bytes = chunk
                .get(skip..skip.saturating_add(take))
                .ok_or_else(|| AtcaError::RxFail {
                    received: chunk.len(),
                })?;
            out.extend_from_slice(bytes);
            pos = pos.saturating_add(take);
        }

        Ok(out)
    }

    /// Writes `data` starting at byte `offset`, in blocks where aligned and
    /// words elsewhere.
    ///
    /// # Errors
    ///
    /// `BadParam` unless offset and length are multiples of 4 and the range
    /// lies inside the zone.
    pub fn write_bytes_zone(
        &mut self,
        zone: Zone,
        slot: u16,
        offset: usize,
        data: &[u8],
    ) -> AtcaResult<()> {
        if offset % WORD_SIZE != 0 || data.len() % WORD_SIZE != 0 {
            return Err(AtcaError::bad_param(format!(
                "write of {} bytes at {offset} is not word aligned",
                data.len()
            )));
        }
        self.checked_range(zone, slot, offset, data.len())?;

        let mut written = 0;
        while let Some(rest) = data.get(written..).filter(|rest| !rest.is_empty()) {
            let pos = offset.saturating_add(written);
            let (block, word) = split_offset(pos)?;
            let chunk_len = if pos % BLOCK_SIZE == 0 && rest.len() >= BLOCK_SIZE {
                BLOCK_SIZE
            } else {
                WORD_SIZE
            };
            let chunk = rest
                .get(..chunk_len)
                .ok_or_else(|| AtcaError::bad_param("truncated write chunk"))?;
            let word = if chunk_len == BLOCK_SIZE { 0 } else { word };
            self.write_zone(zone, slot, block, word, chunk)?;
            written = written.saturating_add(chunk_len);
        }
        Ok(())
    }

    fn checked_range(&self, zone: Zone, slot: u16, offset: usize, len: usize) -> AtcaResult<usize> {
        let size = zone_size(self.family(), zone, slot)?;
        offset
            .checked_add(len)
            .filter(|&end| end <= size)
            .ok_or_else(|| {
                AtcaError::bad_param(format!(
                    "{len} bytes at {offset} exceed {zone:?} size {size}"
                ))
            })
    }

    fn read_clock_divider(&mut self) -> AtcaResult<ClockDivider> {
        let chip_mode = self.read_bytes_zone(Zone::Config, 0, usize::from(CHIPMODE_OFFSET), 1)?;
        let mode = chip_mode.first().copied().ok_or(AtcaError::RxFail { received: 0 })?;
        let divider = ClockDivider::from_chip_mode(mode);
        debug!(chip_mode = mode, ?divider, "read clock divider");
        Ok(divider)
    }

    /// True when the device's family implements `opcode`.
    pub fn supports(&self, opcode: Opcode) -> bool {
        self.builder.execution_time_ms(opcode).is_ok()
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("profile", &self.profile())
            .field("bus", &self.bus_key())
            .finish_non_exhaustive()
    }
}

fn access_size(len: usize) -> AtcaResult<bool> {
    match len {
        WORD_SIZE => Ok(false),
        BLOCK_SIZE => Ok(true),
        other => Err(AtcaError::bad_param(format!(
            "zone access must be {WORD_SIZE} or {BLOCK_SIZE} bytes, got {other}"
        ))),
    }
}

/// Block index and word index of a byte offset.
fn split_offset(pos: usize) -> AtcaResult<(u8, u8)> {
    let block = u8::try_from(pos / BLOCK_SIZE)
        .map_err(|e| AtcaError::bad_param(format!("offset {pos} out of range: {e}")))?;
    let word = u8::try_from((pos % BLOCK_SIZE) / WORD_SIZE)
        .map_err(|e| AtcaError::bad_param(format!("offset {pos} out of range: {e}")))?;
    Ok((block, word))
}

fn fixed<const N: usize>(response: &Response) -> AtcaResult<[u8; N]> {
    response
        .data()
        .try_into()
        .map_err(|e| AtcaError::GenFail(format!("expected {N} data bytes: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_offset() -> AtcaResult<()> {
        assert_eq!(split_offset(0)?, (0, 0));
        assert_eq!(split_offset(19)?, (0, 4));
        assert_eq!(split_offset(36)?, (1, 1));
        assert_eq!(split_offset(415)?, (12, 7));
        Ok(())
    }

    #[test]
    fn test_access_size() {
        assert_eq!(access_size(4), Ok(false));
        assert_eq!(access_size(32), Ok(true));
        assert!(matches!(access_size(8), Err(AtcaError::BadParam(_))));
    }
}
