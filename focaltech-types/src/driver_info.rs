//! Driver metadata structures

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// USB vendor/product pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UsbId {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl UsbId {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Parse `vvvv:pppp` (hex, as printed by lsusb)
impl FromStr for UsbId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (vid, pid) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| Error::Parse(format!("expected vid:pid, got {:?}", s)))?;

        let parse = |part: &str| {
            u16::from_str_radix(part, 16)
                .map_err(|e| Error::Parse(format!("invalid USB id part {:?}: {}", part, e)))
        };

        Ok(Self::new(parse(vid)?, parse(pid)?))
    }
}

/// How the finger is presented to the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanType {
    /// Finger rests on an area sensor
    Press,

    /// Finger is swiped across a strip sensor
    Swipe,
}

/// Static driver description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverInfo {
    /// Short driver id
    pub id: &'static str,

    /// Human-readable name
    pub full_name: &'static str,

    pub scan_type: ScanType,

    /// Devices this driver handles
    pub id_table: &'static [UsbId],

    /// Minimum score for a bozorth3 match
    pub bz3_threshold: u32,
}

impl DriverInfo {
    /// Validate a static description before registering it
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::Validation("driver id is empty".into()));
        }
        if self.id_table.is_empty() {
            return Err(Error::Validation(format!("driver {} has no USB ids", self.id)));
        }
        Ok(())
    }

    /// Check whether this driver handles `id`
    pub fn supports(&self, id: UsbId) -> bool {
        self.id_table.contains(&id)
    }
}

impl fmt::Display for DriverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Driver[{}: {}, {:?}]", self.id, self.full_name, self.scan_type)
    }
}
