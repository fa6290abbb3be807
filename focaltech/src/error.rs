//! High-level error types

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] focaltech_core::Error),
    
    #[error("Transport error: {0}")]
    Transport(#[from] focaltech_transport::Error),
    
    #[error("Type error: {0}")]
    Types(#[from] focaltech_types::Error),
    
    #[error("Device not open")]
    NotOpen,
    
    #[error("No driver for USB device {0}")]
    NoDriver(focaltech_types::UsbId),
}
