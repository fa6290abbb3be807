//! Driver registry
//!
//! A static table mapping USB ids to driver constructors. The host looks a
//! device up here and gets back a boxed [`ImageDevice`].

use focaltech_types::{DriverInfo, UsbId};
use tracing::debug;

use crate::c652::{self, FocaltechC652};
use crate::device::ImageDevice;
use crate::error::{Error, Result};
use crate::host::Host;

/// Builds a device for a matched USB id
pub type Constructor = fn(UsbId, Host) -> Box<dyn ImageDevice>;

/// One registered driver
#[derive(Debug, Clone, Copy)]
pub struct DriverEntry {
    pub info: &'static DriverInfo,
    pub create: Constructor,
}

fn create_c652(id: UsbId, host: Host) -> Box<dyn ImageDevice> {
    Box::new(FocaltechC652::usb_id(id, host))
}

/// Drivers built into this crate
pub static DRIVERS: &[DriverEntry] = &[DriverEntry {
    info: &c652::INFO,
    create: create_c652,
}];

/// Lookup table handed to the host
#[derive(Debug, Clone, Copy)]
pub struct Registry {
    drivers: &'static [DriverEntry],
}

impl Registry {
    pub const fn new(drivers: &'static [DriverEntry]) -> Self {
        Self { drivers }
    }

    pub fn drivers(&self) -> &'static [DriverEntry] {
        self.drivers
    }

    /// Find the driver handling `id`
    pub fn find(&self, id: UsbId) -> Option<&'static DriverEntry> {
        self.drivers.iter().find(|entry| entry.info.supports(id))
    }

    /// Find the driver for `id` and construct a device with it
    pub fn create(&self, id: UsbId, host: Host) -> Result<Box<dyn ImageDevice>> {
        let entry = self.find(id).ok_or(Error::NoDriver(id))?;
        entry.info.validate()?;

        debug!("Using driver {} for {}", entry.info.id, id);
        Ok((entry.create)(id, host))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(DRIVERS)
    }
}
