//! Transport layer for the C652 protocol
//!
//! Provides USB bulk communication with the sensor, plus a scripted
//! transport that replays canned responses.

pub mod error;
pub mod scripted;
pub mod usb;

pub use error::{Error, Result};
pub use scripted::ScriptedTransport;
pub use usb::UsbTransport;

use async_trait::async_trait;
use focaltech_core::{Transfer, TransferResult};

/// Transport trait for different communication methods
#[async_trait]
pub trait Transport: Send + Sync {
    /// Claim the device
    async fn open(&mut self) -> Result<()>;
    
    /// Release the device
    async fn close(&mut self) -> Result<()>;
    
    /// Check if open
    fn is_open(&self) -> bool;
    
    /// Perform one bulk transfer
    ///
    /// Reads may complete with fewer bytes than requested.
    async fn submit(&mut self, transfer: &Transfer) -> TransferResult;
    
    /// Human-readable device location
    fn description(&self) -> String;
}
