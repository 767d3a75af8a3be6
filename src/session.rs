use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::{io, BitsPerChannel, PixelBuffer, Result};
use log::info;
use std::path::Path;

/// The image a caller is working on, plus the one it started from.
///
/// Every operation acts on `current`; `original` is never touched and is what
/// [`Session::revert`] goes back to.
#[derive(Debug, Clone)]
pub struct Session {
    original: PixelBuffer,
    current: PixelBuffer,
}

impl Session {
    pub fn new(image: PixelBuffer) -> Self {
        Self {
            current: image.clone(),
            original: image,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(io::load(path)?))
    }

    pub fn original(&self) -> &PixelBuffer {
        &self.original
    }

    pub fn current(&self) -> &PixelBuffer {
        &self.current
    }

    /// Hide `payload` in the current image. Returns the hidden footprint.
    pub fn hide(&mut self, payload: &PixelBuffer, bits: BitsPerChannel) -> Result<(u32, u32)> {
        let footprint = Encoder::new(bits).hide(&mut self.current, payload)?;
        info!(
            "hid {}x{} image using {} bits per channel",
            footprint.0,
            footprint.1,
            bits.get()
        );
        Ok(footprint)
    }

    pub fn hide_file<P: AsRef<Path>>(&mut self, path: P, bits: BitsPerChannel) -> Result<(u32, u32)> {
        let payload = io::load(path)?;
        self.hide(&payload, bits)
    }

    /// Replace the current image with the one hidden inside it.
    pub fn extract(&mut self, bits: BitsPerChannel) -> Result<&PixelBuffer> {
        self.current = Decoder::new(bits).extract(&self.current)?;
        info!(
            "extracted {}x{} hidden image",
            self.current.width(),
            self.current.height()
        );
        Ok(&self.current)
    }

    pub fn revert(&mut self) {
        self.current = self.original.clone();
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        io::save(&self.current, path)
    }
}
