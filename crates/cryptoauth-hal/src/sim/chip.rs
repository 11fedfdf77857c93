//! A behavioural model of one secure element.

use std::collections::VecDeque;
use std::sync::Arc;

use cryptoauth_protocol::crc::append_crc;
use cryptoauth_protocol::mode::READ_WRITE_32_FLAG;
use cryptoauth_protocol::{
    BLOCK_SIZE, ClockDivider, DeviceFamily, Opcode, SUCCESS_FRAME, TimingProfile, WAKE_TOKEN,
    WORD_SIZE, Zone, timing, verify_frame, zone_size,
};
use parking_lot::Mutex;
use tracing::trace;

/// Status codes the model can answer with.
pub const STATUS_PARSE_ERROR: u8 = 0x03;
pub const STATUS_EXECUTION_ERROR: u8 = 0x0F;
pub const STATUS_CRC_ERROR: u8 = 0xFF;

/// Serial number programmed into a fresh model.
pub const DEFAULT_SERIAL: [u8; 9] = [0x01, 0x23, 0x5A, 0x1E, 0xC4, 0x09, 0x22, 0x71, 0xEE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Asleep,
    Idle,
    Awake,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChipCounters {
    pub wakes: usize,
    pub idles: usize,
    pub sleeps: usize,
}

#[derive(Debug)]
struct ChipState {
    family: DeviceFamily,
    revision: [u8; 4],
    power: PowerState,
    config: Vec<u8>,
    otp: Vec<u8>,
    slots: Vec<Vec<u8>>,
    output: Option<Vec<u8>>,
    scripted: VecDeque<Vec<u8>>,
    commands: Vec<Vec<u8>>,
    counters: ChipCounters,
    random_seed: u8,
    wake_enabled: bool,
    silent: bool,
}

/// Simulated CryptoAuthentication device.
///
/// Clones share state, so a test can keep one handle while a simulated bus
/// owns another.
#[derive(Debug, Clone)]
pub struct SimulatedChip {
    state: Arc<Mutex<ChipState>>,
}

impl SimulatedChip {
    pub fn new(family: DeviceFamily) -> Self {
        let config_len = zone_size(family, Zone::Config, 0).unwrap_or(128);
        let mut config = vec![0u8; config_len];
        for (byte, i) in config.iter_mut().zip(0u8..) {
            *byte = i.wrapping_mul(3);
        }
        let (head, tail) = DEFAULT_SERIAL.split_at(4);
        if let Some(dst) = config.get_mut(0..4) {
            dst.copy_from_slice(head);
        }
        if let Some(dst) = config.get_mut(8..13) {
            dst.copy_from_slice(tail);
        }
        if let Some(chip_mode) = config.get_mut(19) {
            *chip_mode = 0;
        }

        let otp_len = zone_size(family, Zone::Otp, 0).unwrap_or(64);
        let slots = (0u16..16)
            .map(|slot| vec![0u8; zone_size(family, Zone::Data, slot).unwrap_or(32)])
            .collect();

        let revision = family.revisions().first().copied().unwrap_or_default();

        Self {
            state: Arc::new(Mutex::new(ChipState {
                family,
                revision,
                power: PowerState::Asleep,
                config,
                otp: vec![0u8; otp_len],
                slots,
                output: None,
                scripted: VecDeque::new(),
                commands: Vec::new(),
                counters: ChipCounters::default(),
                random_seed: 0,
                wake_enabled: true,
                silent: false,
            })),
        }
    }

    /// Programs the ChipMode clock divider bits (config byte 19).
    pub fn with_clock_divider(self, divider: ClockDivider) -> Self {
        if let Some(chip_mode) = self.state.lock().config.get_mut(19) {
            *chip_mode = (*chip_mode & 0x07) | divider.chip_mode_bits();
        }
        self
    }

    /// Overrides the Info revision word.
    pub fn with_revision(self, revision: [u8; 4]) -> Self {
        self.state.lock().revision = revision;
        self
    }

    pub fn family(&self) -> DeviceFamily {
        self.state.lock().family
    }

    pub fn power_state(&self) -> PowerState {
        self.state.lock().power
    }

    pub fn counters(&self) -> ChipCounters {
        self.state.lock().counters.clone()
    }

    /// Every command frame received, oldest first.
    pub fn commands(&self) -> Vec<Vec<u8>> {
        self.state.lock().commands.clone()
    }

    pub fn config_zone(&self) -> Vec<u8> {
        self.state.lock().config.clone()
    }

    pub fn slot(&self, slot: usize) -> Option<Vec<u8>> {
        self.state.lock().slots.get(slot).cloned()
    }

    /// Replies to the next command with `bytes` verbatim.
    pub fn script_response(&self, bytes: Vec<u8>) {
        self.state.lock().scripted.push_back(bytes);
    }

    /// A chip that ignores the wake pulse never leaves sleep.
    pub fn set_wake_enabled(&self, enabled: bool) {
        self.state.lock().wake_enabled = enabled;
    }

    /// A silent chip accepts commands but never produces a response.
    pub fn set_silent(&self, silent: bool) {
        self.state.lock().silent = silent;
    }

    pub(crate) fn is_asleep(&self) -> bool {
        self.state.lock().power == PowerState::Asleep
    }

    pub(crate) fn wake(&self) {
        let mut state = self.state.lock();
        if !state.wake_enabled {
            return;
        }
        state.counters.wakes = state.counters.wakes.saturating_add(1);
        state.power = PowerState::Awake;
        state.output = Some(WAKE_TOKEN.to_vec());
    }

    pub(crate) fn idle(&self) {
        let mut state = self.state.lock();
        state.counters.idles = state.counters.idles.saturating_add(1);
        state.power = PowerState::Idle;
        state.output = None;
    }

    pub(crate) fn sleep(&self) {
        let mut state = self.state.lock();
        state.counters.sleeps = state.counters.sleeps.saturating_add(1);
        state.power = PowerState::Asleep;
        state.output = None;
    }

    pub(crate) fn reset_io(&self) {
        self.state.lock().output = None;
    }

    /// Runs one command frame and queues its response.
    pub(crate) fn execute(&self, frame: &[u8]) {
        let mut state = self.state.lock();
        state.commands.push(frame.to_vec());
        let response = match state.scripted.pop_front() {
            Some(bytes) => Some(bytes),
            None if state.silent => None,
            None => Some(state.respond(frame)),
        };
        trace!(len = frame.len(), "simulated chip executed command");
        state.output = response;
    }

    pub(crate) fn take_output(&self) -> Option<Vec<u8>> {
        self.state.lock().output.take()
    }
}

impl ChipState {
    fn profile(&self) -> TimingProfile {
        let divider = self
            .config
            .get(19)
            .map_or(ClockDivider::M0, |&mode| ClockDivider::from_chip_mode(mode));
        TimingProfile::new(self.family, divider)
    }

    fn respond(&mut self, frame: &[u8]) -> Vec<u8> {
        if verify_frame(frame).is_err() {
            return status(STATUS_CRC_ERROR);
        }
        let (Some(&opcode), Some(&param1), Some(p2)) =
            (frame.get(1), frame.get(2), frame.get(3..5))
        else {
            return status(STATUS_PARSE_ERROR);
        };
        let param2 = u16::from_le_bytes([
            p2.first().copied().unwrap_or_default(),
            p2.get(1).copied().unwrap_or_default(),
        ]);
        let data = frame.get(5..frame.len().saturating_sub(2)).unwrap_or_default();

        let Some(opcode) = Opcode::from_u8(opcode) else {
            return status(STATUS_PARSE_ERROR);
        };
        if !timing::supports(self.profile(), opcode) {
            return status(STATUS_PARSE_ERROR);
        }

        match opcode {
            Opcode::Info => response(&self.revision),
            Opcode::Random => {
                self.random_seed = self.random_seed.wrapping_add(1);
                let seed = self.random_seed;
                let bytes: Vec<u8> = (0u8..32)
                    .map(|i| i.wrapping_mul(37).wrapping_add(seed.wrapping_mul(101)))
                    .collect();
                response(&bytes)
            }
            Opcode::Read => match memory(param1, param2) {
                Some((zone, offset, len)) => match self.zone_bytes(zone, param2, offset, len) {
                    Some(bytes) => response(&bytes),
                    None => status(STATUS_EXECUTION_ERROR),
                },
                None => status(STATUS_PARSE_ERROR),
            },
            Opcode::Write => match memory(param1, param2) {
                Some((zone, offset, len)) if data.len() >= len => {
                    let src = data.get(..len).unwrap_or_default();
                    match self.zone_bytes_mut(zone, param2, offset, len) {
                        Some(dst) => {
                            dst.copy_from_slice(src);
                            SUCCESS_FRAME.to_vec()
                        }
                        None => status(STATUS_EXECUTION_ERROR),
                    }
                }
                _ => status(STATUS_PARSE_ERROR),
            },
            _ => SUCCESS_FRAME.to_vec(),
        }
    }

    fn zone_buffer(&mut self, zone: Zone, param2: u16) -> Option<&mut Vec<u8>> {
        match zone {
            Zone::Config => Some(&mut self.config),
            Zone::Otp => Some(&mut self.otp),
            Zone::Data => self.slots.get_mut(usize::from((param2 >> 3) & 0x0F)),
        }
    }

    fn zone_bytes(&mut self, zone: Zone, param2: u16, offset: usize, len: usize) -> Option<Vec<u8>> {
        self.zone_bytes_mut(zone, param2, offset, len)
            .map(|bytes| bytes.to_vec())
    }

    fn zone_bytes_mut(
        &mut self,
        zone: Zone,
        param2: u16,
        offset: usize,
        len: usize,
    ) -> Option<&mut [u8]> {
        let end = offset.checked_add(len)?;
        self.zone_buffer(zone, param2)?.get_mut(offset..end)
    }
}

/// Zone, byte offset and length addressed by a Read/Write.
fn memory(param1: u8, param2: u16) -> Option<(Zone, usize, usize)> {
    let zone = match param1 & 0x03 {
        0 => Zone::Config,
        1 => Zone::Otp,
        2 => Zone::Data,
        _ => return None,
    };
    let len = if param1 & READ_WRITE_32_FLAG != 0 {
        BLOCK_SIZE
    } else {
        WORD_SIZE
    };
    let word = usize::from(param2 & 0x07);
    let block = match zone {
        Zone::Config | Zone::Otp => usize::from((param2 >> 3) & 0x1F),
        Zone::Data => usize::from((param2 >> 8) & 0xFF),
    };
    let offset = block * BLOCK_SIZE + word * WORD_SIZE;
    Some((zone, offset, len))
}

fn response(data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len() + 3);
    frame.push(u8::try_from(data.len() + 3).unwrap_or(u8::MAX));
    frame.extend_from_slice(data);
    append_crc(&mut frame);
    frame
}

fn status(code: u8) -> Vec<u8> {
    response(&[code])
}
