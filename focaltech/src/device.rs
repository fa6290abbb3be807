//! Image device interface
//!
//! The host drives every imaging driver through [`ImageDevice`]. Lifecycle
//! calls return once the device has acknowledged them; the matching
//! [`HostSignal`](crate::HostSignal) is sent before the call returns.

use async_trait::async_trait;
use focaltech_types::DriverInfo;

use crate::error::Result;

/// State the host asks an active device to enter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDeviceState {
    Inactive,
    AwaitFingerOn,
    Capture,
    AwaitFingerOff,
}

/// Image-producing fingerprint device
#[async_trait]
pub trait ImageDevice: Send {
    /// Static description of the driver behind this device
    fn info(&self) -> &'static DriverInfo;

    /// Claim the device
    async fn open(&mut self) -> Result<()>;

    /// Release the device
    async fn close(&mut self) -> Result<()>;

    /// Allow scanning
    async fn activate(&mut self) -> Result<()>;

    /// Stop scanning; any scan in flight is abandoned
    async fn deactivate(&mut self) -> Result<()>;

    /// Enter `state`
    ///
    /// Results are delivered as host signals. For states that run a scan the
    /// future completes when the scan ends, successfully or not; dropping
    /// it cancels the scan.
    async fn change_state(&mut self, state: ImageDeviceState) -> Result<()>;
}
