//! Hide one RGBA image inside the low-order bit-planes of another.
//!
//! The top `n` bits of every payload channel are written into the bottom `n`
//! bits of the matching cover channel. The payload's dimensions are stored as
//! two ratio bytes at the start of the cover, overwriting pixel (0, 0)
//! channels 0 and 1. Recovery is lossy whenever `n < 8`, and extracting with
//! a different `n` than was used to hide silently yields garbage: the format
//! carries nothing that would detect the mismatch.

pub mod decoder;
pub mod encoder;
pub mod io;
pub mod resample;
pub mod session;

pub use byte_encodings::{extract_byte, merge_byte};

use std::convert::TryFrom;
use thiserror::Error;

/// Every buffer the codec touches is RGBA.
pub const CHANNELS: usize = 4;

const HEADER_LENGTH: usize = 2;
const RATIO_SCALE: f64 = 255.0;

#[derive(Debug, Error)]
pub enum Error {
    #[error("bits per channel must be between 0 and 8, got {0}")]
    InvalidBitCount(i64),

    #[error("payload of {payload:?} does not fit into cover of {cover:?}")]
    PayloadTooLarge {
        payload: (u32, u32),
        cover: (u32, u32),
    },

    #[error("payload of {payload:?} is too small to record inside cover of {cover:?}")]
    PayloadTooSmall {
        payload: (u32, u32),
        cover: (u32, u32),
    },

    #[error("{len} bytes is not a valid RGBA buffer for {width}x{height}")]
    BufferSize { width: u32, height: u32, len: usize },

    #[error("cover image does not describe a hidden image")]
    NoPayload,

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Number of low-order cover bits given over to the payload, always in `0..=8`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BitsPerChannel(u8);

impl BitsPerChannel {
    pub const MAX: u8 = 8;

    pub fn new(bits: u8) -> Result<Self> {
        Self::try_from(bits)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Mask selecting the low `n` bits.
    fn mask(self) -> u8 {
        ((1u16 << self.0) - 1) as u8
    }
}

impl Default for BitsPerChannel {
    fn default() -> Self {
        BitsPerChannel(4)
    }
}

impl TryFrom<u8> for BitsPerChannel {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self> {
        if v <= Self::MAX {
            Ok(BitsPerChannel(v))
        } else {
            Err(Error::InvalidBitCount(v as i64))
        }
    }
}

impl TryFrom<i32> for BitsPerChannel {
    type Error = Error;

    fn try_from(v: i32) -> Result<Self> {
        match u8::try_from(v) {
            Ok(bits) => BitsPerChannel::try_from(bits),
            Err(_) => Err(Error::InvalidBitCount(v as i64)),
        }
    }
}

impl From<BitsPerChannel> for u8 {
    fn from(bits: BitsPerChannel) -> u8 {
        bits.0
    }
}

/// An RGBA8 raster, row-major with the channel index varying fastest.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// A zero-filled buffer. Both dimensions must be positive.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let len = width as usize * height as usize * CHANNELS;
        Self::from_raw(width, height, vec![0; len])
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width as usize * height as usize * CHANNELS
        {
            return Err(Error::BufferSize {
                width,
                height,
                len: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Byte offset of channel `ch` of the pixel at (`row`, `col`).
    pub fn offset(&self, row: u32, col: u32, ch: usize) -> usize {
        (row as usize * self.width as usize + col as usize) * CHANNELS + ch
    }

    pub fn pixel(&self, row: u32, col: u32) -> [u8; CHANNELS] {
        let start = self.offset(row, col, 0);
        let mut px = [0; CHANNELS];
        px.copy_from_slice(&self.data[start..start + CHANNELS]);
        px
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * CHANNELS
    }

    /// Mirror the buffer top to bottom, swapping row `r` with `height - 1 - r`.
    pub fn flip_vertical(&mut self) {
        let stride = self.row_bytes();
        let height = self.height as usize;

        for row in 0..height / 2 {
            let mirror = height - 1 - row;
            let (upper, lower) = self.data.split_at_mut(mirror * stride);
            upper[row * stride..(row + 1) * stride].swap_with_slice(&mut lower[..stride]);
        }
    }
}

impl TryFrom<image::RgbaImage> for PixelBuffer {
    type Error = Error;

    fn try_from(img: image::RgbaImage) -> Result<Self> {
        let (width, height) = img.dimensions();
        PixelBuffer::from_raw(width, height, img.into_raw())
    }
}

impl TryFrom<PixelBuffer> for image::RgbaImage {
    type Error = Error;

    fn try_from(buffer: PixelBuffer) -> Result<Self> {
        let (width, height) = buffer.dimensions();
        let len = buffer.data.len();
        image::RgbaImage::from_raw(width, height, buffer.data)
            .ok_or(Error::BufferSize { width, height, len })
    }
}

/// Payload size stored as fractions of the cover size, one byte per axis.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DimensionHeader {
    width_ratio: u8,
    height_ratio: u8,
}

impl DimensionHeader {
    pub fn new(payload: (u32, u32), cover: (u32, u32)) -> Self {
        Self {
            width_ratio: encode_ratio(payload.0, cover.0),
            height_ratio: encode_ratio(payload.1, cover.1),
        }
    }

    pub fn read_from(cover: &PixelBuffer) -> Self {
        Self {
            width_ratio: cover.data[0],
            height_ratio: cover.data[1],
        }
    }

    pub fn write_into(self, cover: &mut PixelBuffer) {
        let raw: [u8; HEADER_LENGTH] = self.into();
        cover.data[..HEADER_LENGTH].copy_from_slice(&raw);
    }

    /// Payload dimensions this header describes inside a cover of `cover` size.
    pub fn payload_dimensions(self, cover: (u32, u32)) -> (u32, u32) {
        (
            decode_ratio(self.width_ratio, cover.0),
            decode_ratio(self.height_ratio, cover.1),
        )
    }
}

impl From<DimensionHeader> for [u8; HEADER_LENGTH] {
    fn from(header: DimensionHeader) -> Self {
        [header.width_ratio, header.height_ratio]
    }
}

// part <= whole, so the ratio never exceeds one byte
fn encode_ratio(part: u32, whole: u32) -> u8 {
    ((part as f64 / whole as f64) * RATIO_SCALE).round().min(RATIO_SCALE) as u8
}

fn decode_ratio(ratio: u8, whole: u32) -> u32 {
    ((ratio as f64 / RATIO_SCALE) * whole as f64).round() as u32
}

pub mod byte_encodings {
    use super::BitsPerChannel;

    /// Keep the top `8 - n` bits of `cover` and fill the bottom `n` with the
    /// top `n` bits of `payload`.
    pub fn merge_byte(cover: u8, payload: u8, bits: BitsPerChannel) -> u8 {
        let mask = bits.mask();
        let high = ((payload as u16) >> (8 - bits.get())) as u8;
        (cover & !mask) | (high & mask)
    }

    /// Move the bottom `n` bits of `merged` back to the top, zero-filling below.
    pub fn extract_byte(merged: u8, bits: BitsPerChannel) -> u8 {
        (((merged & bits.mask()) as u16) << (8 - bits.get())) as u8
    }

    pub struct BytesZipper {}

    impl BytesZipper {
        pub fn merge_into(dest: &mut [u8], src: &[u8], bits: BitsPerChannel) {
            dest.iter_mut().zip(src).for_each(|(left, right)| {
                *left = merge_byte(*left, *right, bits);
            });
        }

        pub fn extract_into(dest: &mut [u8], src: &[u8], bits: BitsPerChannel) {
            dest.iter_mut().zip(src).for_each(|(out, merged)| {
                *out = extract_byte(*merged, bits);
            });
        }
    }

}

#[cfg(test)]
mod tests {
    use super::decoder::*;
    use super::encoder::*;
    use super::{BitsPerChannel, DimensionHeader, Error, PixelBuffer};
    use std::convert::TryFrom;
    use std::io::{BufReader, Cursor};

    fn gradient(width: u32, height: u32) -> PixelBuffer {
        let mut buf = PixelBuffer::new(width, height).unwrap();
        for row in 0..height {
            for col in 0..width {
                let at = buf.offset(row, col, 0);
                let px = [(col * 7) as u8, (row * 11) as u8, (row + col) as u8, 0xFF];
                buf.as_raw_mut()[at..at + 4].copy_from_slice(&px);
            }
        }
        buf
    }

    fn png_bytes(buffer: &PixelBuffer) -> Vec<u8> {
        let mut out = Vec::new();
        let img = image::RgbaImage::try_from(buffer.clone()).unwrap();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_bits_per_channel_range() {
        for n in 0..=8u8 {
            assert_eq!(n, BitsPerChannel::try_from(n).unwrap().get());
            assert_eq!(n, u8::from(BitsPerChannel::try_from(n as i32).unwrap()));
        }
        assert!(matches!(
            BitsPerChannel::try_from(9u8),
            Err(Error::InvalidBitCount(9))
        ));
        assert!(matches!(
            BitsPerChannel::try_from(-1i32),
            Err(Error::InvalidBitCount(-1))
        ));
        assert!(matches!(
            BitsPerChannel::try_from(9i32),
            Err(Error::InvalidBitCount(9))
        ));
    }

    #[test]
    fn test_from_raw_validates_length() {
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            PixelBuffer::from_raw(2, 2, vec![0; 15]),
            Err(Error::BufferSize { len: 15, .. })
        ));
        assert!(PixelBuffer::from_raw(0, 2, Vec::new()).is_err());
    }

    #[test]
    fn test_zero_sized_buffers_rejected() {
        assert!(matches!(
            PixelBuffer::new(0, 5),
            Err(Error::BufferSize {
                width: 0,
                height: 5,
                ..
            })
        ));
        assert!(PixelBuffer::new(5, 0).is_err());
        assert!(PixelBuffer::new(0, 0).is_err());

        let empty = image::RgbaImage::new(0, 5);
        assert!(matches!(
            PixelBuffer::try_from(empty),
            Err(Error::BufferSize { width: 0, .. })
        ));
    }

    #[test]
    fn test_raw_round_trip() {
        let buf = gradient(3, 2);
        let (width, height) = buf.dimensions();
        let raw = buf.clone().into_raw();

        assert_eq!(24, raw.len());
        assert_eq!(buf, PixelBuffer::from_raw(width, height, raw).unwrap());
    }

    #[test]
    fn test_flip_vertical_first_and_last_row() {
        let mut buf = gradient(3, 5);
        let original = buf.clone();
        buf.flip_vertical();

        for col in 0..3 {
            assert_eq!(original.pixel(4, col), buf.pixel(0, col));
            assert_eq!(original.pixel(0, col), buf.pixel(4, col));
            assert_eq!(original.pixel(2, col), buf.pixel(2, col));
        }

        buf.flip_vertical();
        assert_eq!(original, buf);
    }

    #[test]
    fn test_flip_vertical_single_row() {
        let mut buf = gradient(4, 1);
        let original = buf.clone();
        buf.flip_vertical();
        assert_eq!(original, buf);
    }

    #[test]
    fn test_dimension_header_half() {
        let header = DimensionHeader::new((50, 50), (100, 100));
        let raw: [u8; 2] = header.into();
        assert_eq!([128, 128], raw);
        assert_eq!((50, 50), header.payload_dimensions((100, 100)));
    }

    #[test]
    fn test_dimension_header_full() {
        let header = DimensionHeader::new((640, 480), (640, 480));
        let raw: [u8; 2] = header.into();
        assert_eq!([255, 255], raw);
        assert_eq!((640, 480), header.payload_dimensions((640, 480)));
    }

    #[test]
    fn test_encode_decode() {
        let cover = gradient(32, 24);
        let payload = gradient(16, 12);

        let mut cover_input = BufReader::new(Cursor::new(png_bytes(&cover)));
        let mut payload_input = BufReader::new(Cursor::new(png_bytes(&payload)));
        let mut encode_output: Vec<u8> = Vec::new();

        let encoder = Encoder::new(BitsPerChannel::new(8).unwrap());

        encoder
            .encode(&mut cover_input, &mut payload_input, &mut encode_output)
            .expect("no error");

        let mut decode_input = BufReader::new(Cursor::new(encode_output));
        let mut decode_output: Vec<u8> = Vec::new();

        let decoder = Decoder::new(BitsPerChannel::new(8).unwrap());

        decoder
            .decode(&mut decode_input, &mut decode_output)
            .expect("no error");

        let recovered = image::load_from_memory(&decode_output)
            .expect("png output")
            .to_rgba8();
        let recovered = PixelBuffer::try_from(recovered).unwrap();

        assert_eq!((16, 12), recovered.dimensions());

        // The file-level API stores rows bottom to top, so the metadata bytes
        // land on the payload's last row, first pixel.
        for row in 0..12 {
            for col in 0..16 {
                if row == 11 && col == 0 {
                    continue;
                }
                assert_eq!(payload.pixel(row, col), recovered.pixel(row, col));
            }
        }
    }
}
