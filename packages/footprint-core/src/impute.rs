//! Gap filling by normalized convolution.

use ndarray::Array2;

use crate::convolve::{normalized_convolution, Orientation};
use crate::error::Result;
use crate::footprint::Kernel;
use crate::image::MaskedImage;

/// Fills every masked pixel with a kernel-weighted average of its observed
/// neighbourhood and returns a fully observed image.
///
/// Observed pixels are copied through unchanged. Unlike `forward_filter`
/// the kernel is used as given, without flipping. A masked pixel without
/// any observed neighbour under the kernel receives an arbitrary value
/// governed by the denominator floor.
pub fn kernel_impute(image: &MaskedImage, kernel: &Kernel) -> Result<MaskedImage> {
    let (width, height, channels) = image.dim();
    log::debug!(
        "Imputing {} masked pixel(s) in {}x{}x{} image",
        image.masked_count(),
        width,
        height,
        channels
    );

    let estimate = normalized_convolution(image, kernel, Orientation::AsGiven)?;
    if estimate.unsupported > 0 {
        log::debug!("{} pixel(s) filled from the floored denominator", estimate.unsupported);
    }
    let fill = estimate.values;
    let mut out = image.data().clone();
    for ((x, y, c), v) in out.indexed_iter_mut() {
        if image.mask()[[x, y]] {
            *v = fill[[x, y, c]];
        }
    }

    Ok(MaskedImage::from_parts(out, Array2::from_elem((width, height), false)))
}
