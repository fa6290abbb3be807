//! C652 block check character
//!
//! Every command frame ends with a single BCC byte:
//! 1. Start from the LEN byte
//! 2. XOR in every payload byte (opcode included)
//! 3. Append the result after the payload

use tracing::trace;

/// Calculate the BCC for a frame
///
/// # Algorithm
///
/// ```text
/// bcc = LEN ^ payload[0] ^ payload[1] ^ ... ^ payload[LEN - 1]
/// ```
///
/// # Examples
///
/// ```
/// use focaltech_core::checksum;
///
/// // status check: opcode 0x37, arguments 01 01 01
/// let bcc = checksum::calculate(4, &[0x37, 0x01, 0x01, 0x01]);
/// assert_eq!(bcc, 0x32);
/// ```
pub fn calculate(len: u8, payload: &[u8]) -> u8 {
    let bcc = payload.iter().fold(len, |acc, byte| acc ^ byte);

    trace!(
        len = len,
        payload_len = payload.len(),
        bcc = format!("0x{:02X}", bcc),
        "Calculated BCC"
    );

    bcc
}

/// Verify BCC
pub fn verify(len: u8, payload: &[u8], expected: u8) -> bool {
    calculate(len, payload) == expected
}
