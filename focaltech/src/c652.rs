//! FocalTech C652 press sensor

use std::collections::VecDeque;

use async_trait::async_trait;
use focaltech_core::{Action, Controller, Endpoints, Event, ScanPhase, Session, Timing};
use focaltech_transport::{Transport, UsbTransport};
use focaltech_types::{DriverInfo, ScanType, UsbId};
use tracing::{debug, info, trace, warn};

use crate::device::{ImageDevice, ImageDeviceState};
use crate::error::{Error, Result};
use crate::host::{Host, HostSignal};

const ID_TABLE: &[UsbId] = &[UsbId::new(0x2808, 0xC652)];

/// Driver description registered for the C652
pub const INFO: DriverInfo = DriverInfo {
    id: "focaltech_c652",
    full_name: "FocalTech c652",
    scan_type: ScanType::Press,
    id_table: ID_TABLE,
    bz3_threshold: 9,
};

/// C652 device
///
/// Owns the transport and the scan controller. Scans run inside
/// [`change_state`](ImageDevice::change_state); the controller decides what
/// to submit and when to wait, this type only performs the I/O.
///
/// # Examples
///
/// ```no_run
/// use focaltech::{FocaltechC652, Host, ImageDevice, ImageDeviceState};
///
/// #[tokio::main]
/// async fn main() -> focaltech::Result<()> {
///     let (host, mut signals) = Host::channel();
///     let mut device = FocaltechC652::usb(host);
///
///     device.open().await?;
///     device.activate().await?;
///     device.change_state(ImageDeviceState::AwaitFingerOn).await?;
///
///     while let Ok(signal) = signals.try_recv() {
///         println!("{:?}", signal);
///     }
///
///     device.deactivate().await?;
///     device.close().await?;
///     Ok(())
/// }
/// ```
pub struct FocaltechC652 {
    transport: Box<dyn Transport>,
    session: Session,
    controller: Controller,
    host: Host,
}

impl FocaltechC652 {
    /// Create a device on top of any transport
    pub fn new(transport: Box<dyn Transport>, host: Host) -> Self {
        let session = Session::new(Endpoints::default());
        let controller = Controller::new(session.clone(), Timing::default());

        Self {
            transport,
            session,
            controller,
            host,
        }
    }

    /// Create a device for the first C652 found on the USB bus
    pub fn usb(host: Host) -> Self {
        Self::new(Box::new(UsbTransport::default()), host)
    }

    /// Create a device for a specific USB id
    pub fn usb_id(id: UsbId, host: Host) -> Self {
        Self::new(Box::new(UsbTransport::new(id.vendor_id, id.product_id)), host)
    }

    /// Set poll cadence and transfer timeout
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.controller = Controller::new(self.session.clone(), timing);
        self
    }

    /// Session handle; clones observe the live state
    pub fn session(&self) -> Session {
        self.session.clone()
    }

    pub fn phase(&self) -> ScanPhase {
        self.session.phase()
    }

    /// Run one scan: wait for a finger, capture, wait for the lift
    ///
    /// Returns once the scan has ended. A failed transfer ends the scan with
    /// [`HostSignal::SessionError`] and is not an error of this call.
    pub async fn scan(&mut self) -> Result<()> {
        if !self.transport.is_open() {
            return Err(Error::NotOpen);
        }

        let actions = self.controller.await_finger()?;
        self.drive(actions).await
    }

    async fn drive(&mut self, actions: Vec<Action>) -> Result<()> {
        let mut queue: VecDeque<Action> = actions.into();

        while let Some(action) = queue.pop_front() {
            let event = match action {
                Action::Submit(transfer) => {
                    let result = self.transport.submit(&transfer).await;
                    trace!(ok = result.is_ok(), "Transfer finished");
                    Event::TransferComplete(result)
                }
                Action::StartTimer(delay) => {
                    tokio::time::sleep(delay).await;
                    Event::TimerExpired
                }
                Action::Report(report) => {
                    self.host.report(report);
                    continue;
                }
            };

            queue.extend(self.controller.handle(event)?);
        }

        debug!(phase = ?self.phase(), "Scan finished");
        Ok(())
    }
}

#[async_trait]
impl ImageDevice for FocaltechC652 {
    fn info(&self) -> &'static DriverInfo {
        &INFO
    }

    async fn open(&mut self) -> Result<()> {
        info!("Opening {}...", self.transport.description());

        self.session.open()?;
        if let Err(e) = self.transport.open().await {
            self.session.close();
            return Err(e.into());
        }

        self.host.report(HostSignal::OpenComplete);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.session.is_open() {
            return Ok(());
        }

        info!("Closing {}...", self.transport.description());

        self.controller.reset();
        self.transport.close().await?;
        self.session.close();

        self.host.report(HostSignal::CloseComplete);
        Ok(())
    }

    async fn activate(&mut self) -> Result<()> {
        self.session.activate()?;
        debug!("Activated");

        self.host.report(HostSignal::ActivateComplete);
        Ok(())
    }

    async fn deactivate(&mut self) -> Result<()> {
        self.controller.reset();
        self.session.deactivate()?;
        debug!("Deactivated");

        self.host.report(HostSignal::DeactivateComplete);
        Ok(())
    }

    async fn change_state(&mut self, state: ImageDeviceState) -> Result<()> {
        match state {
            ImageDeviceState::AwaitFingerOn => self.scan().await,
            other => {
                // The scan chains capture and lift detection itself
                debug!(state = ?other, "Ignoring state change");
                Ok(())
            }
        }
    }
}

impl Drop for FocaltechC652 {
    fn drop(&mut self) {
        if self.session.is_open() {
            warn!("Device dropped while still open");
        }
    }
}
