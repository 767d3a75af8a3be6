use crate::{Error, PixelBuffer, Result, CHANNELS};
use log::debug;

/// Nearest-neighbor scale of `source` to exactly `target_width` x `target_height`.
///
/// Destination pixel (x, y) copies source pixel
/// (`x * src_w / target_w`, `y * src_h / target_h`), rounded down, so every
/// output pixel is one of the input pixels.
pub fn resample(source: &PixelBuffer, target_width: u32, target_height: u32) -> Result<PixelBuffer> {
    if target_width == 0 || target_height == 0 {
        return Err(Error::BufferSize {
            width: target_width,
            height: target_height,
            len: 0,
        });
    }

    let (src_w, src_h) = source.dimensions();
    let mut out = PixelBuffer::new(target_width, target_height)?;

    for y in 0..target_height {
        let src_row = source_index(y, src_h, target_height);
        for x in 0..target_width {
            let src_col = source_index(x, src_w, target_width);

            let from = source.offset(src_row, src_col, 0);
            let to = out.offset(y, x, 0);
            out.as_raw_mut()[to..to + CHANNELS]
                .copy_from_slice(&source.as_raw()[from..from + CHANNELS]);
        }
    }

    debug!(
        "resampled {}x{} -> {}x{}",
        src_w, src_h, target_width, target_height
    );

    Ok(out)
}

// dest < target, so the result is always < source
fn source_index(dest: u32, source: u32, target: u32) -> u32 {
    (dest as u64 * source as u64 / target as u64) as u32
}

/// Largest size with the payload's aspect ratio that fits inside the cover.
///
/// Uses one uniform factor, `min(cover_w / payload_w, cover_h / payload_h)`,
/// for both axes. Each side is rounded down and kept at least one pixel.
/// Computed in integers so the limiting axis lands exactly on the cover edge.
pub fn fit_within(payload: (u32, u32), cover: (u32, u32)) -> (u32, u32) {
    let (pw, ph) = (payload.0 as u64, payload.1 as u64);
    let (cw, ch) = (cover.0 as u64, cover.1 as u64);

    let (w, h) = if cw * ph <= ch * pw {
        (cw, ph * cw / pw)
    } else {
        (pw * ch / ph, ch)
    };

    (w.max(1) as u32, h.max(1) as u32)
}
