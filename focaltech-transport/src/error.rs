//! Transport errors

use focaltech_core::TransferError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Already open")]
    AlreadyOpen,
    
    #[error("No USB device {vendor_id:04x}:{product_id:04x} found")]
    DeviceNotFound {
        vendor_id: u16,
        product_id: u16,
    },
    
    #[error("USB error: {0}")]
    Usb(#[from] rusb::Error),
    
    #[error("Blocking USB task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Map a libusb failure onto the transfer error taxonomy
pub fn transfer_error(error: rusb::Error) -> TransferError {
    match error {
        rusb::Error::Timeout => TransferError::Timeout,
        rusb::Error::Pipe => TransferError::Stall,
        rusb::Error::NoDevice => TransferError::NoDevice,
        rusb::Error::Overflow => TransferError::Overflow,
        rusb::Error::Interrupted => TransferError::Cancelled,
        other => TransferError::Other(other.to_string()),
    }
}
