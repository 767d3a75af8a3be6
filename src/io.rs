//! Loading and saving cover and payload images.
//!
//! Buffers in memory keep rows bottom to top. Everything read through this
//! module is flipped on the way in and flipped back on the way out, so the
//! two header bytes sit in the first pixel of the bottom row of a saved file.

use crate::{PixelBuffer, Result};
use log::info;
use std::convert::TryFrom;
use std::io::{BufRead, Seek, Write};
use std::path::Path;

/// Decode an image of any supported format, converted to RGBA.
///
/// Gray sources are replicated across RGB; sources without alpha get 255.
pub fn read_from<R: BufRead + Seek>(reader: R) -> Result<PixelBuffer> {
    let img = image::io::Reader::new(reader)
        .with_guessed_format()?
        .decode()?;
    into_buffer(img)
}

pub fn load<P: AsRef<Path>>(path: P) -> Result<PixelBuffer> {
    let path = path.as_ref();
    let img = image::open(path)?;
    let buffer = into_buffer(img)?;

    info!(
        "read image file {}: {}x{}",
        path.display(),
        buffer.width(),
        buffer.height()
    );

    Ok(buffer)
}

pub fn write_to<W: Write>(
    buffer: PixelBuffer,
    writer: &mut W,
    format: image::ImageFormat,
) -> Result<()> {
    let img = from_buffer(buffer)?;
    image::DynamicImage::ImageRgba8(img).write_to(writer, format)?;
    Ok(())
}

/// Save with the format picked from the file extension.
pub fn save<P: AsRef<Path>>(buffer: &PixelBuffer, path: P) -> Result<()> {
    let path = path.as_ref();
    let img = from_buffer(buffer.clone())?;
    img.save(path)?;

    info!(
        "wrote image file {}: {}x{}",
        path.display(),
        img.width(),
        img.height()
    );

    Ok(())
}

fn into_buffer(img: image::DynamicImage) -> Result<PixelBuffer> {
    let mut buffer = PixelBuffer::try_from(img.to_rgba8())?;
    buffer.flip_vertical();
    Ok(buffer)
}

fn from_buffer(mut buffer: PixelBuffer) -> Result<image::RgbaImage> {
    buffer.flip_vertical();
    image::RgbaImage::try_from(buffer)
}
