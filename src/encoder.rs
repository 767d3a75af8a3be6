use crate::byte_encodings::BytesZipper;
use crate::resample::{fit_within, resample};
use crate::*;
use log::debug;
use std::borrow::Cow;
use std::io::{BufRead, Seek, Write};

pub struct Encoder {
    bits: BitsPerChannel,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(BitsPerChannel::default())
    }
}

impl Encoder {
    pub fn new(bits: BitsPerChannel) -> Self {
        Self { bits }
    }

    /// Read a cover and a payload image, hide the payload and write the
    /// result to `output` as PNG.
    pub fn encode<R1: BufRead + Seek, R2: BufRead + Seek, W: Write>(
        &self,
        cover_image: R1,
        payload_image: R2,
        output: &mut W,
    ) -> Result<()> {
        let mut cover = io::read_from(cover_image)?;
        let payload = io::read_from(payload_image)?;

        self.hide(&mut cover, &payload)?;

        io::write_to(cover, output, image::ImageFormat::Png)
    }

    /// Hide `payload` in the low bits of `cover`, top-left aligned.
    ///
    /// A payload larger than the cover on either axis is first scaled down to
    /// fit, keeping its aspect ratio; the caller's buffer is left as is.
    /// Afterwards the first two bytes of the cover hold the payload's size
    /// relative to the cover, replacing whatever was merged there.
    ///
    /// Returns the dimensions of the hidden footprint. Fails without touching
    /// the cover if the payload does not fit, or is so small next to the cover
    /// that its size rounds to zero in the header.
    pub fn hide(&self, cover: &mut PixelBuffer, payload: &PixelBuffer) -> Result<(u32, u32)> {
        let payload = self.fit_payload(cover, payload)?;
        self.check_utilisation(cover, &payload)?;
        let header = self.check_header(cover, &payload)?;

        let (cover_w, _) = cover.dimensions();
        let (payload_w, payload_h) = payload.dimensions();
        let cover_stride = cover_w as usize * CHANNELS;
        let payload_stride = payload_w as usize * CHANNELS;

        for (row, src) in payload
            .as_raw()
            .chunks_exact(payload_stride)
            .enumerate()
            .take(payload_h as usize)
        {
            let start = row * cover_stride;
            BytesZipper::merge_into(
                &mut cover.as_raw_mut()[start..start + payload_stride],
                src,
                self.bits,
            );
        }

        // must follow the merge: it overwrites two merged bytes
        header.write_into(cover);

        Ok(payload.dimensions())
    }

    fn check_header(&self, cover: &PixelBuffer, payload: &PixelBuffer) -> Result<DimensionHeader> {
        let header = DimensionHeader::new(payload.dimensions(), cover.dimensions());
        let (w, h) = header.payload_dimensions(cover.dimensions());
        debug!("encode header: {:?}, records {}x{}", header, w, h);

        if w == 0 || h == 0 {
            return Err(Error::PayloadTooSmall {
                payload: payload.dimensions(),
                cover: cover.dimensions(),
            });
        }

        Ok(header)
    }

    fn fit_payload<'a>(
        &self,
        cover: &PixelBuffer,
        payload: &'a PixelBuffer,
    ) -> Result<Cow<'a, PixelBuffer>> {
        let (cover_w, cover_h) = cover.dimensions();
        let (payload_w, payload_h) = payload.dimensions();

        if payload_w <= cover_w && payload_h <= cover_h {
            return Ok(Cow::Borrowed(payload));
        }

        let (w, h) = fit_within(payload.dimensions(), cover.dimensions());
        debug!(
            "payload {}x{} exceeds cover {}x{}, scaling to {}x{}",
            payload_w, payload_h, cover_w, cover_h, w, h
        );

        Ok(Cow::Owned(resample(payload, w, h)?))
    }

    // Make sure that the payload fits into the cover image
    fn check_utilisation(&self, cover: &PixelBuffer, payload: &PixelBuffer) -> Result<()> {
        let (cover_w, cover_h) = cover.dimensions();
        let (payload_w, payload_h) = payload.dimensions();

        let cover_utilisation =
            ((payload_w as f64 * payload_h as f64) / (cover_w as f64 * cover_h as f64)) * 100.0;

        debug!(
            "cover image size: {}x{}, payload size: {}x{}, bits per channel: {}, cover image utilisation: {:.4}%",
            cover_w,
            cover_h,
            payload_w,
            payload_h,
            self.bits.get(),
            cover_utilisation,
        );

        if payload_w <= cover_w && payload_h <= cover_h {
            Ok(())
        } else {
            Err(Error::PayloadTooLarge {
                payload: payload.dimensions(),
                cover: cover.dimensions(),
            })
        }
    }
}
