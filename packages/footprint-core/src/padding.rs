//! Reflective padding and window cropping.
//!
//! A (W, H) grid is reflected about its far edges into a (2W-1, 2H-1) grid.
//! The edge row and column are not duplicated, so the padded grid is
//! periodic without a seam and circular convolution over it behaves like a
//! finite-extent convolution of the original.

use ndarray::{s, Array2, Array3};

use crate::error::{FilterError, Result};
use crate::image::MaskedImage;

/// Maps an index of the padded axis back onto the source axis of length `n`.
#[inline]
fn mirror_index(i: usize, n: usize) -> usize {
    if i < n {
        i
    } else {
        2 * (n - 1) - i
    }
}

/// Padded extent of an axis of length `n`.
#[inline]
pub fn padded_len(n: usize) -> usize {
    2 * n - 1
}

pub(crate) fn check_paddable(width: usize, height: usize) -> Result<()> {
    if width < 2 || height < 2 {
        return Err(FilterError::TooSmall { width, height });
    }
    Ok(())
}

pub(crate) fn mirror_pad_data(data: &Array3<f64>) -> Array3<f64> {
    let (width, height, channels) = data.dim();
    Array3::from_shape_fn(
        (padded_len(width), padded_len(height), channels),
        |(x, y, c)| data[[mirror_index(x, width), mirror_index(y, height), c]],
    )
}

pub(crate) fn mirror_pad_mask<T: Copy>(mask: &Array2<T>) -> Array2<T> {
    let (width, height) = mask.dim();
    Array2::from_shape_fn((padded_len(width), padded_len(height)), |(x, y)| {
        mask[[mirror_index(x, width), mirror_index(y, height)]]
    })
}

/// Mirror-pads an image and its mask to (2W-1, 2H-1, C).
///
/// # Errors
/// `FilterError::TooSmall` if either spatial dimension is below 2.
pub fn mirror_pad(image: &MaskedImage) -> Result<MaskedImage> {
    check_paddable(image.width(), image.height())?;
    Ok(MaskedImage::from_parts(
        mirror_pad_data(image.data()),
        mirror_pad_mask(image.mask()),
    ))
}

pub(crate) fn crop_data(
    data: &Array3<f64>,
    origin: (usize, usize),
    size: (usize, usize),
) -> Array3<f64> {
    let (x0, y0) = origin;
    let (w, h) = size;
    data.slice(s![x0..x0 + w, y0..y0 + h, ..]).to_owned()
}

/// Extracts the `size` window starting at `origin` from a padded image.
///
/// Panics if the window exceeds the image, like ndarray slicing.
pub fn crop_window(
    padded: &MaskedImage,
    origin: (usize, usize),
    size: (usize, usize),
) -> MaskedImage {
    let (x0, y0) = origin;
    let (w, h) = size;
    MaskedImage::from_parts(
        crop_data(padded.data(), origin, size),
        padded.mask().slice(s![x0..x0 + w, y0..y0 + h]).to_owned(),
    )
}
