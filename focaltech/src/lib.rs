//! # focaltech
//!
//! Driver for the FocalTech C652 USB fingerprint sensor (2808:c652).
//!
//! ## Features
//!
//! - Waits for a finger, captures a 64×80 grayscale image, waits for lift
//! - Async/await API using Tokio
//! - I/O-free protocol core, USB transport via libusb
//! - Static driver registry keyed by USB id
//!
//! ## Quick Start
//!
//! ```no_run
//! use focaltech::{Host, HostSignal, ImageDeviceState, Registry, UsbId};
//!
//! #[tokio::main]
//! async fn main() -> focaltech::Result<()> {
//!     let (host, mut signals) = Host::channel();
//!     let mut device = Registry::default().create(UsbId::new(0x2808, 0xC652), host)?;
//!
//!     device.open().await?;
//!     device.activate().await?;
//!     device.change_state(ImageDeviceState::AwaitFingerOn).await?;
//!
//!     while let Ok(signal) = signals.try_recv() {
//!         if let HostSignal::ImageCaptured(image) = signal {
//!             println!("{}x{} image", image.width(), image.height());
//!         }
//!     }
//!
//!     device.deactivate().await?;
//!     device.close().await?;
//!     Ok(())
//! }
//! ```

pub mod c652;
pub mod device;
pub mod error;
pub mod host;
pub mod registry;

// Re-exports
pub use c652::FocaltechC652;
pub use device::{ImageDevice, ImageDeviceState};
pub use error::{Error, Result};
pub use host::{Host, HostSignal, HostSignals};
pub use registry::{DriverEntry, Registry};

// Re-export types
pub use focaltech_core::{Image, ScanPhase, Timing};
pub use focaltech_types::{DriverInfo, ScanType, UsbId};
