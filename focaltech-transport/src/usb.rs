//! USB bulk transport
//!
//! libusb calls block, so every one of them runs on tokio's blocking pool.
//! A blocking transfer cannot be cancelled: when the caller drops a submit
//! future, the transfer keeps running until libusb returns. The next submit
//! or close waits for it first, so at most one transfer touches the
//! endpoints at any time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use focaltech_core::constants::usb;
use focaltech_core::{Completion, Direction, Transfer, TransferError, TransferResult};
use rusb::{Context, DeviceHandle, UsbContext};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, trace, warn};

use crate::{error::*, Transport};

/// USB transport for the C652
pub struct UsbTransport {
    vendor_id: u16,
    product_id: u16,
    interface: u8,
    handle: Option<Arc<DeviceHandle<Context>>>,
    kernel_driver_detached: bool,
    location: Option<String>,
    reset_on_open: bool,
    in_flight: InFlight<rusb::Result<Completion>>,
}

/// The one blocking task allowed to run at a time
#[derive(Debug)]
struct InFlight<T> {
    task: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> InFlight<T> {
    fn is_pending(&self) -> bool {
        self.task.is_some()
    }

    /// Wait for a task abandoned by a dropped caller
    async fn settle(&mut self) {
        if let Some(task) = self.task.as_mut() {
            debug!("Waiting for abandoned transfer to finish");
            if let Err(e) = task.await {
                warn!("Abandoned transfer task failed: {}", e);
            }
            self.task = None;
        }
    }

    /// Run `f` on the blocking pool once any earlier task has finished
    ///
    /// If the returned future is dropped, the task stays recorded here until
    /// the next `settle` or `run`.
    async fn run<F>(&mut self, f: F) -> std::result::Result<T, JoinError>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        self.settle().await;

        let result = self.task.insert(tokio::task::spawn_blocking(f)).await;
        self.task = None;
        result
    }
}

impl<T> Default for InFlight<T> {
    fn default() -> Self {
        Self { task: None }
    }
}

impl UsbTransport {
    /// Create new USB transport for the given vendor/product id
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            interface: usb::INTERFACE,
            handle: None,
            kernel_driver_detached: false,
            location: None,
            reset_on_open: true,
            in_flight: InFlight::default(),
        }
    }

    /// Set the interface to claim (default: 0)
    pub fn with_interface(mut self, interface: u8) -> Self {
        self.interface = interface;
        self
    }

    /// Reset the device before claiming it (default: on)
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset_on_open = reset;
        self
    }

    fn open_blocking(
        vendor_id: u16,
        product_id: u16,
        interface: u8,
        reset: bool,
    ) -> Result<(DeviceHandle<Context>, bool, String)> {
        let context = Context::new()?;

        for device in context.devices()?.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(d) => d,
                Err(_) => continue,
            };

            if descriptor.vendor_id() != vendor_id || descriptor.product_id() != product_id {
                continue;
            }

            let location = format!(
                "bus {:03} device {:03} ({:04x}:{:04x})",
                device.bus_number(),
                device.address(),
                vendor_id,
                product_id
            );
            debug!("Opening {}...", location);

            let mut handle = device.open()?;

            if reset {
                if let Err(e) = handle.reset() {
                    warn!("Device reset failed: {}", e);
                }
            }

            let detached = match handle.kernel_driver_active(interface) {
                Ok(true) => {
                    handle.detach_kernel_driver(interface)?;
                    debug!("Detached kernel driver from interface {}", interface);
                    true
                }
                _ => false,
            };

            handle.claim_interface(interface)?;

            return Ok((handle, detached, location));
        }

        Err(Error::DeviceNotFound {
            vendor_id,
            product_id,
        })
    }
}

impl Default for UsbTransport {
    fn default() -> Self {
        Self::new(usb::VENDOR_ID, usb::PRODUCT_ID)
    }
}

#[async_trait]
impl Transport for UsbTransport {
    async fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(Error::AlreadyOpen);
        }

        let (vendor_id, product_id, interface, reset) =
            (self.vendor_id, self.product_id, self.interface, self.reset_on_open);

        let (handle, detached, location) = tokio::task::spawn_blocking(move || {
            Self::open_blocking(vendor_id, product_id, interface, reset)
        })
        .await??;

        debug!("Claimed interface {} on {}", interface, location);

        self.handle = Some(Arc::new(handle));
        self.kernel_driver_detached = detached;
        self.location = Some(location);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.in_flight.settle().await;

        if let Some(handle) = self.handle.take() {
            debug!("Releasing {}...", self.description());

            match Arc::try_unwrap(handle) {
                Ok(mut handle) => {
                    if let Err(e) = handle.release_interface(self.interface) {
                        warn!("Failed to release interface {}: {}", self.interface, e);
                    }

                    if self.kernel_driver_detached {
                        if let Err(e) = handle.attach_kernel_driver(self.interface) {
                            warn!("Failed to reattach kernel driver: {}", e);
                        }
                    }
                }
                Err(_) => warn!("Device handle still shared, interface released on drop"),
            }
        }

        self.kernel_driver_detached = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    async fn submit(&mut self, transfer: &Transfer) -> TransferResult {
        let handle = self.handle.clone().ok_or(TransferError::NoDevice)?;
        let transfer = transfer.clone();

        trace!(
            "Submitting {:?} on 0x{:02X}: {} bytes",
            transfer.direction,
            transfer.endpoint,
            transfer.length
        );

        let result = self
            .in_flight
            .run(move || bulk(&handle, &transfer))
            .await
            .map_err(|e| TransferError::Other(e.to_string()))?;

        result.map_err(transfer_error)
    }

    fn description(&self) -> String {
        self.location
            .clone()
            .unwrap_or_else(|| format!("{:04x}:{:04x}", self.vendor_id, self.product_id))
    }
}

fn bulk(handle: &DeviceHandle<Context>, transfer: &Transfer) -> rusb::Result<Completion> {
    let timeout: Duration = transfer.timeout;

    match transfer.direction {
        Direction::Out => handle
            .write_bulk(transfer.endpoint, &transfer.data, timeout)
            .map(Completion::written),
        Direction::In => {
            let mut buf = vec![0u8; transfer.length];
            let n = handle.read_bulk(transfer.endpoint, &mut buf, timeout)?;
            buf.truncate(n);
            Ok(Completion::read(buf))
        }
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("USB transport dropped while still open");
        }
        if self.in_flight.is_pending() {
            warn!("USB transport dropped with a transfer in flight");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_usb_transport_create() {
        let transport = UsbTransport::default();
        assert!(!transport.is_open());
        assert_eq!(transport.description(), "2808:c652");
    }

    #[tokio::test]
    async fn test_usb_transport_submit_when_closed() {
        let mut transport = UsbTransport::default();
        let transfer = Transfer::bulk_in(0x82, 7, Duration::from_millis(10));

        assert_eq!(transport.submit(&transfer).await, Err(TransferError::NoDevice));
    }

    #[tokio::test]
    async fn test_abandoned_task_finishes_before_next_starts() {
        let mut in_flight = InFlight::default();
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (release, released) = std::sync::mpsc::channel::<()>();

        let first = {
            let log = log.clone();
            move || {
                let _ = released.recv();
                log.lock().push("first");
                1
            }
        };

        // caller gives up while the first task is still blocked
        let abandoned = tokio::time::timeout(Duration::from_millis(10), in_flight.run(first)).await;
        assert!(abandoned.is_err());
        assert!(in_flight.is_pending());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = release.send(());
        });

        let second = {
            let log = log.clone();
            move || {
                log.lock().push("second");
                2
            }
        };

        assert_eq!(in_flight.run(second).await.unwrap(), 2);
        assert!(!in_flight.is_pending());
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_settle_without_task() {
        let mut in_flight: InFlight<()> = InFlight::default();
        in_flight.settle().await;
        assert!(!in_flight.is_pending());
    }

    // Note: This test requires a real sensor
    // #[tokio::test]
    // async fn test_usb_transport_open() {
    //     let mut transport = UsbTransport::default();
    //     transport.open().await.unwrap();
    //     assert!(transport.is_open());
    //     transport.close().await.unwrap();
    //     assert!(!transport.is_open());
    // }
}
