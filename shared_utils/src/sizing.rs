//! Image sizing helpers

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid thumbnail request: {width}x{height} bounded by {max_long}")]
pub struct SizeError {
    pub width: u32,
    pub height: u32,
    pub max_long: u32,
}

/// Dimensions of an image scaled so its longer side is at most `max_long`.
///
/// Images already within the bound keep their size. The shorter side is
/// rounded to the nearest pixel, never below one. All inputs must be non-zero.
pub fn thumbnail_size_by_long_side(
    width: u32,
    height: u32,
    max_long: u32,
) -> Result<(u32, u32), SizeError> {
    if width == 0 || height == 0 || max_long == 0 {
        return Err(SizeError {
            width,
            height,
            max_long,
        });
    }
    if width <= max_long && height <= max_long {
        return Ok((width, height));
    }

    let (w, h, max) = (width as f64, height as f64, max_long as f64);
    if width < height {
        Ok((((w * max / h).round() as u32).max(1), max_long))
    } else {
        Ok((max_long, ((h * max / w).round() as u32).max(1)))
    }
}
