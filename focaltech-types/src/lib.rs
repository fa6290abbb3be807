//! Type definitions for focaltech

pub mod driver_info;
pub mod error;

pub use driver_info::{DriverInfo, ScanType, UsbId};
pub use error::{Error, Result};
