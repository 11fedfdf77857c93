//! Reference-counted ownership of physical buses.
//!
//! One [`BusSlot`] exists per physical bus number no matter how many logical
//! interfaces use it. The resource is enabled when the count goes 0 → 1 and
//! disabled when it goes 1 → 0. The first interface to open a bus fixes its
//! configuration; later opens share it as-is.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use cryptoauth_protocol::AtcaResult;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bus::BusResource;

/// Shared handle to an enabled bus.
pub type Shared<T> = Arc<Mutex<Box<T>>>;

/// Identifies a physical bus across transport kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "bus", rename_all = "snake_case")]
pub enum BusKey {
    I2c(u8),
    Swi(u8),
}

impl BusKey {
    pub fn bus(self) -> u8 {
        match self {
            BusKey::I2c(bus) | BusKey::Swi(bus) => bus,
        }
    }
}

impl fmt::Display for BusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusKey::I2c(bus) => write!(f, "i2c{bus}"),
            BusKey::Swi(bus) => write!(f, "swi{bus}"),
        }
    }
}

pub struct BusSlot<T: ?Sized> {
    resource: Shared<T>,
    ref_count: usize,
}

impl<T: ?Sized> BusSlot<T> {
    pub fn ref_count(&self) -> usize {
        self.ref_count
    }

    pub fn resource(&self) -> Shared<T> {
        Arc::clone(&self.resource)
    }
}

/// What a release did to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Other interfaces still hold the bus.
    Shared { remaining: usize },
    /// Last reference dropped; the resource was disabled.
    Disabled,
    /// No slot existed for the bus.
    Unknown,
}

pub struct BusRegistry<T: ?Sized> {
    slots: BTreeMap<u8, BusSlot<T>>,
}

impl<T: ?Sized> Default for BusRegistry<T> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for BusRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(bus, slot)| (bus, slot.ref_count)))
            .finish()
    }
}

impl<T: BusResource + ?Sized> BusRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a reference on `bus`, calling `enable` only for the first one.
    ///
    /// # Errors
    ///
    /// Propagates the error from `enable`; the count is left unchanged.
    pub fn acquire<F>(&mut self, bus: u8, enable: F) -> AtcaResult<Shared<T>>
    where
        F: FnOnce() -> AtcaResult<Box<T>>,
    {
        if let Some(slot) = self.slots.get_mut(&bus) {
            slot.ref_count = slot.ref_count.saturating_add(1);
            debug!(bus, ref_count = slot.ref_count, "sharing enabled bus");
            return Ok(Arc::clone(&slot.resource));
        }

        let resource = Arc::new(Mutex::new(enable()?));
        debug!(bus, "bus enabled");
        self.slots.insert(
            bus,
            BusSlot {
                resource: Arc::clone(&resource),
                ref_count: 1,
            },
        );
        Ok(resource)
    }

    /// Drops one reference on `bus`, disabling it when none remain.
    ///
    /// Releasing a bus that was never acquired is a no-op. The slot is
    /// removed even if disabling the hardware fails.
    pub fn release(&mut self, bus: u8) -> AtcaResult<Release> {
        let Some(slot) = self.slots.get_mut(&bus) else {
            warn!(bus, "release of a bus with no references");
            return Ok(Release::Unknown);
        };

        slot.ref_count = slot.ref_count.saturating_sub(1);
        if slot.ref_count > 0 {
            debug!(bus, ref_count = slot.ref_count, "bus still shared");
            return Ok(Release::Shared {
                remaining: slot.ref_count,
            });
        }

        let Some(slot) = self.slots.remove(&bus) else {
            return Ok(Release::Unknown);
        };
        slot.resource.lock().disable()?;
        debug!(bus, "bus disabled");
        Ok(Release::Disabled)
    }

    pub fn ref_count(&self, bus: u8) -> usize {
        self.slots.get(&bus).map_or(0, BusSlot::ref_count)
    }

    pub fn is_enabled(&self, bus: u8) -> bool {
        self.slots.contains_key(&bus)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
