//! Pure calculation of thumbnail dimensions.
//!
//! The source width is divided by the target width (integer division) to get
//! a scale divisor, and the source height is divided by that divisor to get
//! the thumbnail height.

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
    pub divisor: u32,
}

/// Plan the output size for a thumbnail of `target_width` pixels.
///
/// `divisor = floor(source_width / target_width)` and
/// `height = round(source_height / divisor)`, rounding halves away from zero.
/// A height that rounds to zero is clamped to one pixel.
///
/// # Errors
/// [`Error::Sizing`] when `target_width` is zero or not smaller than
/// `source_width`.
///
/// # Examples
/// ```
/// # use blob_thumbnailer::image::plan_thumbnail_size;
/// let size = plan_thumbnail_size(1000, 600, 100).unwrap();
/// assert_eq!((size.width, size.height, size.divisor), (100, 60, 10));
/// ```
pub fn plan_thumbnail_size(
    source_width: u32,
    source_height: u32,
    target_width: u32,
) -> Result<ThumbnailSize> {
    if target_width == 0 || target_width >= source_width {
        return Err(Error::Sizing {
            source_width,
            target_width,
        });
    }

    let divisor = source_width / target_width;

    // round-half-away-from-zero on H / divisor, in integers
    let height = (u64::from(source_height) * 2 + u64::from(divisor)) / (u64::from(divisor) * 2);
    let height = u32::try_from(height).unwrap_or(u32::MAX).max(1);

    Ok(ThumbnailSize {
        width: target_width,
        height,
        divisor,
    })
}
