//! Error types for focaltech-core

use crate::transfer::TransferError;

/// Result type alias for focaltech operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
///
/// Clone + PartialEq so a failure can be handed to the host as a session error
/// and still be compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Frame is too short to be valid
    #[error("Frame too short: expected at least {expected} bytes, got {actual} bytes")]
    FrameTooShort {
        expected: usize,
        actual: usize,
    },

    /// Frame does not start with the 0x02 0x00 marker
    #[error("Invalid frame header: {0:02X?}")]
    InvalidHeader([u8; 2]),

    /// LEN byte disagrees with the number of bytes in the frame
    #[error("Frame length mismatch: LEN says {declared} bytes, frame carries {actual}")]
    LengthMismatch {
        declared: usize,
        actual: usize,
    },

    /// BCC verification failed
    #[error("BCC mismatch: expected 0x{expected:02X}, received 0x{received:02X}")]
    BccMismatch {
        expected: u8,
        received: u8,
    },

    /// Unknown opcode
    #[error("Unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// Payload does not fit in the one-byte LEN field
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// Event delivered to a state machine that cannot accept it
    #[error("Invalid machine state: {0}")]
    InvalidMachineState(String),

    /// State machine already reached a terminal outcome
    #[error("State machine {0} already finished")]
    MachineFinished(&'static str),

    /// USB transfer failed
    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),
}
