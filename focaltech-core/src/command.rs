//! C652 protocol command definitions

use std::fmt;

use crate::constants::{ACK_LENGTH, IMAGE_DATA_LENGTH};
use crate::error::{Error, Result};

/// Protocol opcodes
///
/// The opcode is the first byte of every framed payload.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    StatusCheck = 0x37,

    /// Sensor mode control; the argument selects prepare or finger polling
    SensorControl = 0x80,

    RequestImage = 0x81,
    TriggerCapture = 0x82,
}

impl Opcode {
    /// Get opcode name
    pub fn name(self) -> &'static str {
        match self {
            Self::StatusCheck => "CMD_STATUS_CHECK",
            Self::SensorControl => "CMD_SENSOR_CONTROL",
            Self::RequestImage => "CMD_REQUEST_IMAGE",
            Self::TriggerCapture => "CMD_TRIGGER_CAPTURE",
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> u8 {
        opcode as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x37 => Ok(Self::StatusCheck),
            0x80 => Ok(Self::SensorControl),
            0x81 => Ok(Self::RequestImage),
            0x82 => Ok(Self::TriggerCapture),
            _ => Err(Error::UnknownOpcode(value)),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// A fixed device command: opcode, constant arguments and the size of the
/// response the device sends back.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: &'static str,
    pub opcode: Opcode,
    pub args: &'static [u8],
    pub response_length: usize,
}

impl Command {
    pub const STATUS_CHECK: Self = Self {
        name: "status check",
        opcode: Opcode::StatusCheck,
        args: &[0x01, 0x01, 0x01],
        response_length: ACK_LENGTH,
    };

    pub const PREPARE_SENSOR: Self = Self {
        name: "prepare sensor",
        opcode: Opcode::SensorControl,
        args: &[0x02, 0x01],
        response_length: ACK_LENGTH,
    };

    /// Finger presence poll; byte 4 of the response is the presence flag
    pub const WAIT_FINGER: Self = Self {
        name: "wait finger",
        opcode: Opcode::SensorControl,
        args: &[0x02],
        response_length: ACK_LENGTH,
    };

    pub const TRIGGER_CAPTURE: Self = Self {
        name: "trigger capture",
        opcode: Opcode::TriggerCapture,
        args: &[0x73, 0x01],
        response_length: ACK_LENGTH,
    };

    pub const REQUEST_IMAGE: Self = Self {
        name: "request image",
        opcode: Opcode::RequestImage,
        args: &[],
        response_length: IMAGE_DATA_LENGTH,
    };
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.opcode)
    }
}
