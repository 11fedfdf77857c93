//! Blocking delays.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

pub trait Delay: Send + Sync {
    fn delay_us(&self, us: u32);

    fn delay_ms(&self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

/// Sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_us(&self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }
}

/// Records requested delays without sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    calls: Arc<Mutex<Vec<u32>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested delays in microseconds, oldest first.
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().clone()
    }

    pub fn total(&self) -> Duration {
        let us: u64 = self.calls.lock().iter().map(|&us| u64::from(us)).sum();
        Duration::from_micros(us)
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl Delay for RecordingDelay {
    fn delay_us(&self, us: u32) {
        self.calls.lock().push(us);
    }
}
