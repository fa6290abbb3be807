//! USB bulk transfer descriptions
//!
//! A [`Transfer`] is what a state machine asks the transport to do; a
//! [`Completion`] is what comes back. Neither side touches the USB stack
//! directly, which keeps every machine testable without hardware.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host to device (command write)
    Out,

    /// Device to host (response read)
    In,
}

/// Bulk transfer request
#[derive(Clone, PartialEq, Eq)]
pub struct Transfer {
    /// Endpoint address
    pub endpoint: u8,

    /// Transfer direction
    pub direction: Direction,

    /// Bytes to write (empty for reads)
    pub data: Bytes,

    /// Number of bytes expected (write length or read buffer size)
    pub length: usize,

    /// Per-transfer timeout
    pub timeout: Duration,
}

impl Transfer {
    /// Bulk write of `data` to `endpoint`
    pub fn bulk_out(endpoint: u8, data: impl Into<Bytes>, timeout: Duration) -> Self {
        let data = data.into();
        Self {
            endpoint,
            direction: Direction::Out,
            length: data.len(),
            data,
            timeout,
        }
    }

    /// Bulk read of up to `length` bytes from `endpoint`
    pub fn bulk_in(endpoint: u8, length: usize, timeout: Duration) -> Self {
        Self {
            endpoint,
            direction: Direction::In,
            data: Bytes::new(),
            length,
            timeout,
        }
    }

    pub fn is_out(&self) -> bool {
        self.direction == Direction::Out
    }

    pub fn is_in(&self) -> bool {
        self.direction == Direction::In
    }
}

impl fmt::Debug for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transfer")
            .field("endpoint", &format!("0x{:02X}", self.endpoint))
            .field("direction", &self.direction)
            .field("length", &self.length)
            .field("timeout_ms", &self.timeout.as_millis())
            .finish()
    }
}

/// Successful transfer completion
///
/// For reads, `data` holds what the device actually sent, which may be
/// shorter than requested. For writes, `data` is empty and `actual_length`
/// is the number of bytes accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub actual_length: usize,
    pub data: Bytes,
}

impl Completion {
    /// Completion of a write
    pub fn written(actual_length: usize) -> Self {
        Self {
            actual_length,
            data: Bytes::new(),
        }
    }

    /// Completion of a read
    pub fn read(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            actual_length: data.len(),
            data,
        }
    }

    /// Bounds-checked access into the received bytes
    pub fn byte(&self, index: usize) -> Option<u8> {
        self.data.get(index).copied()
    }
}

/// Transport-level transfer failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("transfer timed out")]
    Timeout,

    #[error("endpoint stalled")]
    Stall,

    #[error("device disconnected")]
    NoDevice,

    #[error("device sent more data than requested")]
    Overflow,

    #[error("transfer cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Outcome of a submitted transfer
pub type TransferResult = std::result::Result<Completion, TransferError>;
