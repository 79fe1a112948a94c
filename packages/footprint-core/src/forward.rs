//! Forward footprint filter: simulates the sensor's blur on a masked image.

use crate::convolve::{normalized_convolution, Orientation};
use crate::error::Result;
use crate::footprint::Kernel;
use crate::finite_max;
use crate::image::MaskedImage;

/// Blurs `image` with `kernel` using normalized convolution.
///
/// `kernel` must have the padded shape (2W-1, 2H-1) and is flipped on both
/// axes, so the spectral product is a true convolution. Masked pixels are
/// zeroed in the output and the mask is carried over unchanged. The result
/// is rescaled so its peak matches the peak of the observed input.
///
/// # Errors
/// `FilterError::TooSmall` for images narrower than 2 pixels and
/// `FilterError::KernelShape` for a kernel of the wrong shape.
pub fn forward_filter(image: &MaskedImage, kernel: &Kernel) -> Result<MaskedImage> {
    let (width, height, channels) = image.dim();
    log::debug!("Forward filter on {}x{}x{} image", width, height, channels);

    let mut out = normalized_convolution(image, kernel, Orientation::Flipped)?.values;
    for ((x, y, _), v) in out.indexed_iter_mut() {
        if image.mask()[[x, y]] {
            *v = 0.0;
        }
    }

    let output_peak = finite_max(out.iter());
    match (output_peak, image.observed_max()) {
        (Some(output_peak), Some(input_peak)) if output_peak != 0.0 && input_peak != 0.0 => {
            let scale = input_peak / output_peak;
            out.mapv_inplace(|v| v * scale);
        }
        _ => log::debug!("Skipping peak rescale: no non-zero peak"),
    }

    Ok(MaskedImage::from_parts(out, image.mask().clone()))
}
