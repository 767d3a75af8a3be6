use crate::byte_encodings::BytesZipper;
use crate::{io, BitsPerChannel, DimensionHeader, Error, PixelBuffer, Result, CHANNELS};
use log::debug;
use std::io::{BufRead, Seek, Write};

pub struct Decoder {
    bits: BitsPerChannel,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(BitsPerChannel::default())
    }
}

impl Decoder {
    /// `bits` must match the value the image was hidden with. A mismatch is
    /// not detectable and produces a wrong image.
    pub fn new(bits: BitsPerChannel) -> Self {
        Self { bits }
    }

    pub fn decode<R: BufRead + Seek, W: Write>(&self, input_image: R, output: &mut W) -> Result<()> {
        let cover = io::read_from(input_image)?;
        let payload = self.extract(&cover)?;
        io::write_to(payload, output, image::ImageFormat::Png)
    }

    /// Recover the hidden image into a new buffer. `cover` is not modified.
    pub fn extract(&self, cover: &PixelBuffer) -> Result<PixelBuffer> {
        let header = DimensionHeader::read_from(cover);
        let (width, height) = header.payload_dimensions(cover.dimensions());

        debug!(
            "decoded header: {:?}, hidden image {}x{}",
            header, width, height
        );

        if width == 0 || height == 0 {
            return Err(Error::NoPayload);
        }

        let mut payload = PixelBuffer::new(width, height)?;
        let cover_stride = cover.width() as usize * CHANNELS;
        let payload_stride = width as usize * CHANNELS;

        for (row, dest) in payload
            .as_raw_mut()
            .chunks_exact_mut(payload_stride)
            .enumerate()
        {
            let start = row * cover_stride;
            BytesZipper::extract_into(
                dest,
                &cover.as_raw()[start..start + payload_stride],
                self.bits,
            );
        }

        Ok(payload)
    }
}
