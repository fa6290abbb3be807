//! C652 command frame structure and encoding/decoding

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::{Command, Opcode},
    constants::FRAME_MARKER,
    error::{Error, Result},
};

/// C652 command frame
///
/// # Frame Structure
///
/// ```text
/// ┌──────┬──────┬──────┬──────────┬─────────────┬──────┐
/// │ 0x02 │ 0x00 │ LEN  │  Opcode  │  Arguments  │ BCC  │
/// │  1   │  1   │  1   │    1     │  LEN-1      │  1   │
/// └──────┴──────┴──────┴──────────┴─────────────┴──────┘
/// ```
///
/// LEN counts the opcode plus arguments. BCC is LEN xor every payload byte.
///
/// Only the four opcodes the C652 understands can be framed. Decoding a
/// frame with any other opcode byte fails with [`Error::UnknownOpcode`],
/// after the marker, LEN and BCC have been checked.
///
/// # Examples
///
/// ```
/// use focaltech_core::{Command, Frame};
///
/// let frame = Frame::from_command(&Command::STATUS_CHECK);
/// let encoded = frame.encode().unwrap();
/// assert_eq!(&encoded[..], &[0x02, 0x00, 0x04, 0x37, 0x01, 0x01, 0x01, 0x32]);
///
/// let decoded = Frame::decode(&encoded).unwrap();
/// assert_eq!(frame, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Command opcode
    pub opcode: Opcode,

    /// Command arguments following the opcode
    pub args: Bytes,
}

impl Frame {
    /// Marker + LEN + BCC
    pub const OVERHEAD: usize = 4;

    /// Maximum payload (opcode + arguments) representable by LEN
    pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize;

    /// Create a frame with no arguments
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            args: Bytes::new(),
        }
    }

    /// Create a frame with arguments
    ///
    /// # Examples
    ///
    /// ```
    /// use focaltech_core::{Frame, Opcode};
    ///
    /// let frame = Frame::with_args(Opcode::SensorControl, vec![0x02]);
    /// assert_eq!(frame.payload_len(), 2);
    /// ```
    pub fn with_args(opcode: Opcode, args: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            args: args.into(),
        }
    }

    /// Frame for one of the fixed device commands
    pub fn from_command(command: &Command) -> Self {
        Self::with_args(command.opcode, Bytes::from_static(command.args))
    }

    /// Opcode plus arguments
    pub fn payload_len(&self) -> usize {
        1 + self.args.len()
    }

    /// Total encoded size
    pub fn size(&self) -> usize {
        Self::OVERHEAD + self.payload_len()
    }

    fn payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(self.payload_len());
        payload.push(self.opcode.into());
        payload.extend_from_slice(&self.args);
        payload
    }

    /// Calculate BCC for this frame
    ///
    /// LEN is truncated to one byte here; [`Frame::encode`] refuses frames
    /// where that truncation would lose information.
    pub fn bcc(&self) -> u8 {
        checksum::calculate(self.payload_len() as u8, &self.payload())
    }

    /// Encode frame to bytes
    ///
    /// # Errors
    ///
    /// Returns [`Error::PayloadTooLarge`] if opcode plus arguments exceed 255 bytes.
    pub fn encode(&self) -> Result<BytesMut> {
        let payload_len = self.payload_len();
        if payload_len > Self::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: payload_len,
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_slice(&FRAME_MARKER);
        buf.put_u8(payload_len as u8);
        buf.put_u8(self.opcode.into());
        buf.put_slice(&self.args);
        buf.put_u8(self.bcc());

        Ok(buf)
    }

    /// Decode frame from bytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than marker + LEN + opcode + BCC
    /// - Marker is not `02 00`
    /// - LEN disagrees with the buffer length
    /// - Opcode is unknown
    /// - BCC verification fails
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::OVERHEAD + 1 {
            return Err(Error::FrameTooShort {
                expected: Self::OVERHEAD + 1,
                actual: buf.len(),
            });
        }

        let marker = [buf[0], buf[1]];
        if marker != FRAME_MARKER {
            return Err(Error::InvalidHeader(marker));
        }

        let declared = buf[2] as usize;
        let actual = buf.len() - Self::OVERHEAD;
        if declared != actual {
            return Err(Error::LengthMismatch { declared, actual });
        }

        let payload = &buf[3..3 + declared];
        let received = buf[3 + declared];
        if !checksum::verify(buf[2], payload, received) {
            return Err(Error::BccMismatch {
                expected: checksum::calculate(buf[2], payload),
                received,
            });
        }

        let opcode = Opcode::try_from(payload[0])?;

        Ok(Self::with_args(opcode, Bytes::copy_from_slice(&payload[1..])))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("opcode", &self.opcode)
            .field("args", &hex::encode(&self.args))
            .field("bcc", &format!("0x{:02X}", self.bcc()))
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame[{}](args={})", self.opcode, hex::encode(&self.args))
    }
}
