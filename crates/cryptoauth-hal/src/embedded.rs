//! I2C platform over any `embedded-hal` 1.0 bus.
//!
//! Buses are opened through a caller-supplied function, so the same platform
//! drives a Linux `/dev/i2c-N` handle or a microcontroller peripheral. The
//! `embedded-hal` traits have no speed control: a requested speed is only
//! recorded, and the wake pulse needs the master to already run at
//! [`crate::i2c::WAKE_SPEED_HZ`] or below.

use std::marker::PhantomData;

use cryptoauth_protocol::{AtcaError, AtcaResult};
use embedded_hal::i2c::{Error as _, I2c};
use tracing::{debug, trace};

use crate::bus::{BusResource, I2cBus, I2cPlatform};

/// Hands out [`EmbeddedI2cBus`]es for a fixed set of bus numbers.
pub struct EmbeddedI2cPlatform<F, I> {
    buses: Vec<u8>,
    open: F,
    _bus: PhantomData<fn() -> I>,
}

impl<F, I> EmbeddedI2cPlatform<F, I>
where
    F: FnMut(u8) -> AtcaResult<I>,
{
    /// `open` is called once per enable of a bus number from `buses`.
    pub fn new(buses: impl IntoIterator<Item = u8>, open: F) -> Self {
        let mut buses: Vec<u8> = buses.into_iter().collect();
        buses.sort_unstable();
        buses.dedup();
        Self {
            buses,
            open,
            _bus: PhantomData,
        }
    }
}

impl<F, I> I2cPlatform for EmbeddedI2cPlatform<F, I>
where
    F: FnMut(u8) -> AtcaResult<I> + Send,
    I: I2c + Send + 'static,
{
    fn buses(&self) -> Vec<u8> {
        self.buses.clone()
    }

    fn open(&mut self, bus: u8, speed_hz: u32) -> AtcaResult<Box<dyn I2cBus>> {
        if !self.buses.contains(&bus) {
            return Err(AtcaError::comm_fail(format!("no I2C bus {bus} on this platform")));
        }
        let i2c = (self.open)(bus)?;
        debug!(bus, speed_hz, "embedded-hal I2C bus opened");
        Ok(Box::new(EmbeddedI2cBus::new(i2c, speed_hz)))
    }
}

/// One enabled `embedded-hal` I2C master.
pub struct EmbeddedI2cBus<I> {
    i2c: Option<I>,
    speed_hz: u32,
}

impl<I: I2c> EmbeddedI2cBus<I> {
    pub fn new(i2c: I, speed_hz: u32) -> Self {
        Self {
            i2c: Some(i2c),
            speed_hz,
        }
    }

    /// The underlying master, or `None` once disabled.
    pub fn into_inner(self) -> Option<I> {
        self.i2c
    }

    fn i2c(&mut self) -> AtcaResult<&mut I> {
        self.i2c
            .as_mut()
            .ok_or_else(|| AtcaError::comm_fail("I2C bus already disabled"))
    }
}

fn bus_error<E: embedded_hal::i2c::Error>(address: u8, e: &E) -> AtcaError {
    AtcaError::comm_fail(format!("i2c {address:#04x}: {:?}", e.kind()))
}

impl<I: I2c + Send> BusResource for EmbeddedI2cBus<I> {
    fn disable(&mut self) -> AtcaResult<()> {
        self.i2c = None;
        Ok(())
    }
}

impl<I: I2c + Send> I2cBus for EmbeddedI2cBus<I> {
    fn set_speed(&mut self, speed_hz: u32) -> AtcaResult<()> {
        if speed_hz != self.speed_hz {
            trace!(from = self.speed_hz, to = speed_hz, "speed change recorded only");
        }
        self.speed_hz = speed_hz;
        Ok(())
    }

    fn speed(&self) -> u32 {
        self.speed_hz
    }

    fn write(&mut self, address: u8, data: &[u8]) -> AtcaResult<()> {
        self.i2c()?
            .write(address, data)
            .map_err(|e| bus_error(address, &e))
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> AtcaResult<usize> {
        self.i2c()?
            .read(address, buf)
            .map_err(|e| bus_error(address, &e))?;
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cryptoauth_protocol::WAKE_TOKEN;
    use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};
    use parking_lot::Mutex;

    use super::*;
    use crate::i2c::{GENERAL_CALL_ADDRESS, WORD_ADDRESS_IDLE};
    use crate::{Hal, InterfaceConfig, RecordingDelay};

    #[derive(Debug, Default)]
    struct Line {
        awake: bool,
        nacks_after_wake: u32,
        writes: Vec<(u8, Vec<u8>)>,
    }

    /// A master with one device at 0x60 that NACKs a few polls after waking.
    #[derive(Clone, Default)]
    struct FakeMaster {
        line: Arc<Mutex<Line>>,
    }

    impl ErrorType for FakeMaster {
        type Error = ErrorKind;
    }

    impl I2c for FakeMaster {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            let mut line = self.line.lock();
            for op in operations {
                match op {
                    Operation::Write(data) => {
                        line.writes.push((address, data.to_vec()));
                        if address == GENERAL_CALL_ADDRESS {
                            line.awake = true;
                            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                        }
                    }
                    Operation::Read(buf) => {
                        if address != 0x60 || !line.awake {
                            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                        }
                        if line.nacks_after_wake > 0 {
                            line.nacks_after_wake = line.nacks_after_wake.saturating_sub(1);
                            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                        }
                        for (dst, src) in buf.iter_mut().zip(WAKE_TOKEN.iter()) {
                            *dst = *src;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    fn hal_over(master: &FakeMaster) -> Hal {
        let master = master.clone();
        let platform = EmbeddedI2cPlatform::new([1], move |_| Ok(master.clone()));
        Hal::new(Arc::new(RecordingDelay::new())).with_i2c(platform)
    }

    fn config_on_bus_1() -> InterfaceConfig {
        let mut config = InterfaceConfig::ecc508a_i2c_default().with_rx_retries(3);
        config.interface = crate::InterfaceKind::I2c {
            bus: 1,
            address: 0x60,
            speed_hz: 100_000,
        };
        config
    }

    #[test]
    fn test_wake_and_idle_over_embedded_hal() -> AtcaResult<()> {
        let master = FakeMaster::default();
        master.line.lock().nacks_after_wake = 2;
        let mut hal = hal_over(&master);

        let mut transport = hal.open(&config_on_bus_1())?;
        transport.wake()?;
        transport.idle()?;
        hal.release(transport)?;

        let writes = master.line.lock().writes.clone();
        assert_eq!(
            writes,
            vec![
                (GENERAL_CALL_ADDRESS, vec![0x00]),
                (0x60, vec![WORD_ADDRESS_IDLE]),
            ]
        );
        assert_eq!(master.line.lock().nacks_after_wake, 0);
        Ok(())
    }

    #[test]
    fn test_unknown_bus_is_rejected() {
        let master = FakeMaster::default();
        let mut platform = EmbeddedI2cPlatform::new([3, 1, 3], move |_| Ok(master.clone()));
        assert_eq!(platform.buses(), vec![1, 3]);
        assert!(matches!(platform.open(0, 400_000), Err(AtcaError::CommFail(_))));
    }

    #[test]
    fn test_disabled_bus_refuses_io() -> AtcaResult<()> {
        let mut bus = EmbeddedI2cBus::new(FakeMaster::default(), 400_000);
        bus.set_speed(100_000)?;
        assert_eq!(bus.speed(), 100_000);
        bus.disable()?;
        assert!(matches!(bus.write(0x60, &[0x02]), Err(AtcaError::CommFail(_))));
        assert!(bus.into_inner().is_none());
        Ok(())
    }
}
