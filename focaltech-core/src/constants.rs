//! Protocol constants

use std::time::Duration;

/// Frame start marker
pub const FRAME_MARKER: [u8; 2] = [0x02, 0x00];

/// Acknowledgement length for every command except image requests
pub const ACK_LENGTH: usize = 7;

/// Raw image response length (6 header bytes + 5120 two-byte samples)
pub const IMAGE_DATA_LENGTH: usize = 10246;

/// Index of the finger presence flag in a poll response
pub const FINGER_FLAG_INDEX: usize = 4;

/// Finger presence flag value meaning "finger on sensor"
pub const FINGER_PRESENT: u8 = 1;

/// Default per-transfer timeout (milliseconds)
pub const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 1000;

/// Default finger poll interval (milliseconds)
pub const DEFAULT_POLL_DELAY_MS: u64 = 50;

/// Sensor geometry
pub mod image {
    pub const WIDTH: usize = 64;
    pub const HEIGHT: usize = 80;
    pub const PIXELS: usize = WIDTH * HEIGHT;

    /// Bytes before the first sample in the raw response
    pub const HEADER_OFFSET: usize = 4;

    /// Bytes per raw sample
    pub const PIXEL_STRIDE: usize = 2;
}

/// USB identity
pub mod usb {
    pub const VENDOR_ID: u16 = 0x2808;
    pub const PRODUCT_ID: u16 = 0xC652;
    pub const INTERFACE: u8 = 0;
    pub const BULK_IN: u8 = 0x82;
    pub const BULK_OUT: u8 = 0x01;
}

/// Bulk endpoint pair used by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoints {
    pub bulk_in: u8,
    pub bulk_out: u8,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            bulk_in: usb::BULK_IN,
            bulk_out: usb::BULK_OUT,
        }
    }
}

/// Timing knobs shared by all state machines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Delay before the first poll and between polls
    pub poll_delay: Duration,

    /// Timeout handed to every transfer
    pub transfer_timeout: Duration,
}

impl Timing {
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_millis(DEFAULT_POLL_DELAY_MS),
            transfer_timeout: Duration::from_millis(DEFAULT_TRANSFER_TIMEOUT_MS),
        }
    }
}
