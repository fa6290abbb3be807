//! Fingerprint image reconstruction
//!
//! The sensor answers an image request with a 4-byte header followed by
//! two bytes per pixel. Only the first byte of every pair is kept. The
//! device is known to return short buffers, so any pixel whose source byte
//! never arrived is filled with zero instead of failing the capture.

use std::fmt;
use std::io::{self, Write};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::constants::image::{HEADER_OFFSET, HEIGHT, PIXELS, PIXEL_STRIDE, WIDTH};
use crate::constants::IMAGE_DATA_LENGTH;

/// 64x80 8-bit grayscale image, row-major
///
/// An image rebuilt from a capture keeps the raw response alongside the
/// pixels, so the full 16-bit samples stay available for export.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    data: Bytes,
    raw: Bytes,
}

impl Image {
    pub const WIDTH: usize = WIDTH;
    pub const HEIGHT: usize = HEIGHT;

    /// Rebuild an image from a raw capture response
    ///
    /// # Examples
    ///
    /// ```
    /// use focaltech_core::Image;
    ///
    /// // Truncated transfer: everything past the received bytes is black
    /// let image = Image::reconstruct(&[0xAA; 8]);
    /// assert_eq!(image.pixel(0, 0), Some(0xAA));
    /// assert_eq!(image.pixel(1, 0), Some(0xAA));
    /// assert_eq!(image.pixel(2, 0), Some(0x00));
    /// ```
    pub fn reconstruct(raw: &[u8]) -> Self {
        let data: Vec<u8> = (0..PIXELS)
            .map(|i| sample(raw, HEADER_OFFSET + i * PIXEL_STRIDE).unwrap_or(0))
            .collect();

        if raw.len() < IMAGE_DATA_LENGTH {
            warn!(
                received = raw.len(),
                expected = IMAGE_DATA_LENGTH,
                "Short image transfer, missing pixels zero-filled"
            );
        } else {
            debug!(received = raw.len(), "Image reconstructed");
        }

        Self {
            data: data.into(),
            raw: Bytes::copy_from_slice(raw),
        }
    }

    /// Wrap an already reconstructed pixel buffer
    ///
    /// Returns `None` unless `pixels` holds exactly 64x80 bytes. The result
    /// carries no raw capture.
    pub fn from_pixels(pixels: impl Into<Bytes>) -> Option<Self> {
        let data = pixels.into();
        (data.len() == PIXELS).then_some(Self {
            data,
            raw: Bytes::new(),
        })
    }

    pub fn width(&self) -> usize {
        WIDTH
    }

    pub fn height(&self) -> usize {
        HEIGHT
    }

    /// Row-major pixel bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Raw capture response this image was rebuilt from, as received
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Bounds-checked pixel lookup
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= WIDTH || y >= HEIGHT {
            return None;
        }
        self.data.get(y * WIDTH + x).copied()
    }

    /// Write the image as binary PGM (P5, maxval 255)
    pub fn write_pgm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "P5\n{} {}\n255\n", WIDTH, HEIGHT)?;
        out.write_all(&self.data)?;
        out.flush()
    }

    /// Write the raw capture as a 16-bit PGM, see [`write_raw_pgm16`]
    pub fn write_raw_pgm16<W: Write>(&self, out: W) -> io::Result<()> {
        write_raw_pgm16(&self.raw, out)
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("width", &WIDTH)
            .field("height", &HEIGHT)
            .field("len", &self.data.len())
            .field("raw_len", &self.raw.len())
            .finish()
    }
}

/// Bounds-checked raw byte access
pub fn sample(raw: &[u8], offset: usize) -> Option<u8> {
    raw.get(offset).copied()
}

/// Write both bytes of every raw sample as a 16-bit PGM (maxval 65535)
///
/// Used for sensor bring-up where the low byte still matters. A sample
/// whose pair is not fully present is written as zero.
pub fn write_raw_pgm16<W: Write>(raw: &[u8], mut out: W) -> io::Result<()> {
    write!(out, "P5\n{} {}\n65535\n", WIDTH, HEIGHT)?;

    for i in 0..PIXELS {
        let offset = HEADER_OFFSET + i * PIXEL_STRIDE;
        let pair = match (sample(raw, offset), sample(raw, offset + 1)) {
            (Some(hi), Some(lo)) => [hi, lo],
            _ => [0, 0],
        };
        out.write_all(&pair)?;
    }

    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn full_capture() -> Vec<u8> {
        let mut raw = vec![0xEE; IMAGE_DATA_LENGTH];
        for i in 0..PIXELS {
            raw[HEADER_OFFSET + 2 * i] = (i % 256) as u8;
        }
        raw
    }

    #[test]
    fn test_reconstruct_full_data() {
        let image = Image::reconstruct(&full_capture());

        assert_eq!(image.data().len(), 5120);
        for (i, pixel) in image.data().iter().enumerate() {
            assert_eq!(*pixel, (i % 256) as u8, "pixel {}", i);
        }
    }

    #[test]
    fn test_reconstruct_ignores_second_byte_of_pair() {
        // 0xEE filler sits in every odd slot and must never show up
        let image = Image::reconstruct(&full_capture());
        assert_eq!(image.pixel(0x0E, 3), Some(((3 * WIDTH + 0x0E) % 256) as u8));
    }

    #[test]
    fn test_reconstruct_truncated() {
        let raw: Vec<u8> = (0..100u32).map(|b| b as u8 ^ 0x5A).collect();
        let image = Image::reconstruct(&raw);

        for (i, pixel) in image.data().iter().enumerate() {
            let offset = HEADER_OFFSET + 2 * i;
            let expected = if offset < raw.len() { raw[offset] } else { 0 };
            assert_eq!(*pixel, expected, "pixel {}", i);
        }
        // offsets 4, 6, ..., 98 are present
        assert_ne!(image.data()[47], 0);
        assert_eq!(image.data()[48], 0);
    }

    #[test]
    fn test_reconstruct_empty() {
        let image = Image::reconstruct(&[]);
        assert_eq!(image.data().len(), PIXELS);
        assert!(image.data().iter().all(|p| *p == 0));
    }

    #[test]
    fn test_pixel_out_of_range() {
        let image = Image::reconstruct(&full_capture());
        assert_eq!(image.pixel(WIDTH, 0), None);
        assert_eq!(image.pixel(0, HEIGHT), None);
        assert_eq!(image.pixel(WIDTH - 1, HEIGHT - 1), Some((5119 % 256) as u8));
    }

    #[test]
    fn test_from_pixels_requires_exact_size() {
        assert!(Image::from_pixels(vec![0u8; PIXELS]).is_some());
        assert!(Image::from_pixels(vec![0u8; PIXELS - 1]).is_none());
        assert!(Image::from_pixels(vec![0u8; PIXELS]).unwrap().raw().is_empty());
    }

    #[test]
    fn test_reconstruct_keeps_raw_capture() {
        let raw = full_capture();
        let image = Image::reconstruct(&raw);
        assert_eq!(image.raw(), raw.as_slice());

        let truncated = Image::reconstruct(&raw[..100]);
        assert_eq!(truncated.raw().len(), 100);
    }

    #[test]
    fn test_image_write_raw_pgm16_uses_both_bytes() {
        let image = Image::reconstruct(&full_capture());
        let mut out = Vec::new();
        image.write_raw_pgm16(&mut out).unwrap();

        let header = b"P5\n64 80\n65535\n";
        assert_eq!(&out[..header.len()], header);

        let body = &out[header.len()..];
        assert_eq!(body.len(), PIXELS * 2);
        // high byte is the pixel, low byte the 0xEE filler
        assert_eq!(&body[..4], &[0x00, 0xEE, 0x01, 0xEE]);
    }

    #[test]
    fn test_write_pgm() {
        let image = Image::reconstruct(&full_capture());
        let mut out = Vec::new();
        image.write_pgm(&mut out).unwrap();

        let header = b"P5\n64 80\n255\n";
        assert_eq!(&out[..header.len()], header);
        assert_eq!(&out[header.len()..], image.data());
    }

    #[test]
    fn test_write_raw_pgm16_zero_fills_partial_pair() {
        // header + one full pair + one dangling byte
        let raw = [0, 0, 0, 0, 0x12, 0x34, 0x56];
        let mut out = Vec::new();
        write_raw_pgm16(&raw, &mut out).unwrap();

        let header = b"P5\n64 80\n65535\n";
        let body = &out[header.len()..];
        assert_eq!(body.len(), PIXELS * 2);
        assert_eq!(&body[..4], &[0x12, 0x34, 0x00, 0x00]);
    }

    proptest! {
        #[test]
        fn prop_reconstruct_never_reads_past_buffer(len in 0usize..=IMAGE_DATA_LENGTH + 16) {
            let raw = vec![0xFFu8; len];
            let image = Image::reconstruct(&raw);

            let filled = image.data().iter().filter(|p| **p == 0xFF).count();
            let expected = (0..PIXELS).filter(|i| HEADER_OFFSET + 2 * i < len).count();
            prop_assert_eq!(filled, expected);
        }
    }
}
