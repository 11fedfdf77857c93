//! The transport seam between the execution path and a physical bus.

use cryptoauth_protocol::AtcaResult;

use crate::config::InterfaceConfig;
use crate::registry::BusKey;

/// One logical interface to one secure element.
///
/// Implementations share their physical bus with any other interface opened
/// on the same bus number; see [`crate::Hal`].
pub trait Transport: Send {
    fn config(&self) -> &InterfaceConfig;

    fn bus_key(&self) -> BusKey;

    /// Transmits a finished command frame (count byte through CRC).
    fn send(&mut self, frame: &[u8]) -> AtcaResult<()>;

    /// Reads one response into `buf` and returns its length.
    ///
    /// Polls up to `rx_retries` times, retrying through bus errors, and
    /// stops at the first read that yields data. `Ok(0)` means the device
    /// never answered; an error is the last bus failure when no attempt
    /// yielded data.
    fn receive(&mut self, buf: &mut [u8]) -> AtcaResult<usize>;

    /// Brings the device out of sleep and checks its wake token.
    fn wake(&mut self) -> AtcaResult<()>;

    /// Puts the device in idle, keeping volatile state.
    fn idle(&mut self) -> AtcaResult<()>;

    /// Puts the device in sleep, clearing volatile state.
    fn sleep(&mut self) -> AtcaResult<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn config(&self) -> &InterfaceConfig {
        (**self).config()
    }

    fn bus_key(&self) -> BusKey {
        (**self).bus_key()
    }

    fn send(&mut self, frame: &[u8]) -> AtcaResult<()> {
        (**self).send(frame)
    }

    fn receive(&mut self, buf: &mut [u8]) -> AtcaResult<usize> {
        (**self).receive(buf)
    }

    fn wake(&mut self) -> AtcaResult<()> {
        (**self).wake()
    }

    fn idle(&mut self) -> AtcaResult<()> {
        (**self).idle()
    }

    fn sleep(&mut self) -> AtcaResult<()> {
        (**self).sleep()
    }
}

/// Length a response claims for itself, clamped to what was actually read.
pub(crate) fn declared_len(buf: &[u8], read: usize) -> usize {
    match buf.first() {
        Some(&count) if count > 0 && usize::from(count) <= read => usize::from(count),
        _ => read,
    }
}
