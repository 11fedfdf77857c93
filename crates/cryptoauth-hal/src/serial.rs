//! UART driver on top of `serialport`, for single-wire adapters.

use std::collections::BTreeMap;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use cryptoauth_protocol::{AtcaError, AtcaResult};
use tracing::debug;

use crate::bus::{BusResource, UartPlatform, UartPort};

/// Read timeout per UART read; one receive retry waits at most this long.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Maps logical bus numbers to serial port names.
#[derive(Debug, Clone)]
pub struct SerialUartPlatform {
    ports: BTreeMap<u8, String>,
    timeout: Duration,
}

impl SerialUartPlatform {
    pub fn new(ports: impl IntoIterator<Item = (u8, String)>) -> Self {
        Self {
            ports: ports.into_iter().collect(),
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Numbers every serial port the OS reports, in enumeration order.
    pub fn available() -> AtcaResult<Self> {
        let ports = serialport::available_ports()
            .map_err(|e| AtcaError::comm_fail(format!("cannot list serial ports: {e}")))?;
        Ok(Self::numbered(ports.into_iter().map(|p| p.port_name)))
    }

    /// Numbers `names` from bus 0. Names past bus 255 are dropped.
    pub fn numbered(names: impl IntoIterator<Item = String>) -> Self {
        Self::new((0..=u8::MAX).zip(names))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn port_name(&self, bus: u8) -> Option<&str> {
        self.ports.get(&bus).map(String::as_str)
    }
}

impl UartPlatform for SerialUartPlatform {
    fn buses(&self) -> Vec<u8> {
        self.ports.keys().copied().collect()
    }

    fn open(&mut self, bus: u8, baud: u32) -> AtcaResult<Box<dyn UartPort>> {
        let name = self
            .ports
            .get(&bus)
            .ok_or_else(|| AtcaError::comm_fail(format!("no serial port mapped to bus {bus}")))?;
        let port = serialport::new(name, baud)
            .timeout(self.timeout)
            .open()
            .map_err(|e| AtcaError::comm_fail(format!("cannot open {name}: {e}")))?;
        debug!(bus, port = %name, baud, "serial port opened");
        Ok(Box::new(SerialUartPort { port: Some(port) }))
    }
}

struct SerialUartPort {
    port: Option<Box<dyn serialport::SerialPort>>,
}

impl SerialUartPort {
    fn port(&mut self) -> AtcaResult<&mut Box<dyn serialport::SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| AtcaError::comm_fail("serial port already closed"))
    }
}

impl BusResource for SerialUartPort {
    fn disable(&mut self) -> AtcaResult<()> {
        self.port = None;
        Ok(())
    }
}

impl UartPort for SerialUartPort {
    fn set_baud(&mut self, baud: u32) -> AtcaResult<()> {
        self.port()?
            .set_baud_rate(baud)
            .map_err(|e| AtcaError::comm_fail(format!("cannot set baud {baud}: {e}")))
    }

    fn write(&mut self, data: &[u8]) -> AtcaResult<()> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> AtcaResult<usize> {
        match self.port()?.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_bus_fails() {
        let mut platform = SerialUartPlatform::new([(0, "/dev/ttyCRYPTO0".to_string())]);
        assert_eq!(platform.buses(), vec![0]);
        assert_eq!(platform.port_name(0), Some("/dev/ttyCRYPTO0"));
        assert!(matches!(platform.open(3, 230_400), Err(AtcaError::CommFail(_))));
    }

    #[test]
    fn test_numbering_stops_at_last_bus() {
        let platform = SerialUartPlatform::numbered((0..300).map(|i| format!("/dev/ttyS{i}")));
        let buses = platform.buses();
        assert_eq!(buses.len(), 256);
        assert_eq!(buses.last(), Some(&u8::MAX));
        assert_eq!(platform.port_name(255), Some("/dev/ttyS255"));
    }
}
