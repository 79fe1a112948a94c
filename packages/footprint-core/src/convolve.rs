//! Normalized convolution shared by the forward filter and the imputer.
//!
//! Missing samples are zero-filled and the blurred signal is divided by the
//! equally blurred observation indicator, which removes the bias the zeros
//! would otherwise introduce.

use ndarray::{s, Array2, Array3, Axis};

use crate::error::{FilterError, Result};
use crate::footprint::Kernel;
use crate::image::MaskedImage;
use crate::padding::{check_paddable, crop_data, mirror_pad_data, mirror_pad_mask, padded_len};
use crate::spectral::SpectralPlan;
use crate::DENOMINATOR_FLOOR;

/// Denominators below this fraction of the kernel mass count as unsupported
/// in diagnostics. Rounding in the transforms keeps true zeros well below it.
const UNSUPPORTED_FRACTION: f64 = 1e-9;

/// How the kernel enters the spectral product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Orientation {
    /// Reversed on both axes before transforming.
    Flipped,
    /// Used as given.
    AsGiven,
}

/// Normalized-convolution estimate cropped back to the image window.
pub(crate) struct Estimate {
    pub values: Array3<f64>,
    /// Pixels of the window with no observed support under the kernel.
    pub unsupported: usize,
}

pub(crate) fn check_kernel(kernel: &Kernel, expected: (usize, usize)) -> Result<()> {
    let (actual_w, actual_h) = kernel.dim();
    if (actual_w, actual_h) != expected {
        return Err(FilterError::KernelShape {
            expected_w: expected.0,
            expected_h: expected.1,
            actual_w,
            actual_h,
        });
    }
    Ok(())
}

pub(crate) fn normalized_convolution(
    image: &MaskedImage,
    kernel: &Kernel,
    orientation: Orientation,
) -> Result<Estimate> {
    let (width, height, channels) = image.dim();
    check_paddable(width, height)?;
    let padded_shape = (padded_len(width), padded_len(height));
    check_kernel(kernel, padded_shape)?;

    let samples = mirror_pad_data(&image.zero_filled());
    let indicator = mirror_pad_mask(&image.observed_indicator());

    let plan = SpectralPlan::new(padded_shape.0, padded_shape.1);
    let kernel_grid = match orientation {
        Orientation::Flipped => kernel.flipped(),
        Orientation::AsGiven => kernel.values().clone(),
    };
    let spec_kernel = plan.forward_real(kernel_grid.view());
    let spec_indicator = plan.forward_real(indicator.view());
    let denominator = plan
        .inverse_real(spec_indicator * &spec_kernel)
        .mapv(|d| d.max(DENOMINATOR_FLOOR));

    // The kernel centre sits at (W-1, H-1), so the original window is the
    // trailing block of the padded grid.
    let origin = (width - 1, height - 1);
    let support_threshold = UNSUPPORTED_FRACTION * kernel.sum().abs();
    let unsupported = denominator
        .slice(s![origin.0.., origin.1..])
        .iter()
        .filter(|&&d| d <= support_threshold.max(DENOMINATOR_FLOOR))
        .count();

    let mut numerator = Array3::<f64>::zeros(samples.dim());
    for c in 0..channels {
        let spec_samples = plan.forward_real(samples.index_axis(Axis(2), c));
        let blurred: Array2<f64> = plan.inverse_real(spec_samples * &spec_kernel);
        numerator
            .index_axis_mut(Axis(2), c)
            .assign(&(blurred / &denominator));
    }

    if unsupported > 0 {
        log::warn!(
            "{} of {} pixels have no observed support; their estimate relies on a denominator floored at {:e}",
            unsupported,
            width * height,
            DENOMINATOR_FLOOR
        );
    }

    Ok(Estimate {
        values: crop_data(&numerator, origin, (width, height)),
        unsupported,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::FootprintParameters;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    #[test]
    fn wrong_kernel_shape_is_rejected() {
        let image = MaskedImage::fully_observed(Array3::ones((4, 4, 1)));
        let kernel = Kernel::new(Array2::ones((5, 5)));
        let err = normalized_convolution(&image, &kernel, Orientation::Flipped)
            .err()
            .unwrap();
        assert_eq!(
            err,
            FilterError::KernelShape {
                expected_w: 7,
                expected_h: 7,
                actual_w: 5,
                actual_h: 5
            }
        );
    }

    #[test]
    fn delta_kernel_is_identity() {
        let data = Array3::from_shape_fn((4, 3, 2), |(x, y, c)| (x + 2 * y + 7 * c) as f64);
        let image = MaskedImage::fully_observed(data.clone());
        let mut delta = Array2::<f64>::zeros((7, 5));
        delta[[3, 2]] = 1.0;
        for orientation in [Orientation::Flipped, Orientation::AsGiven] {
            let estimate =
                normalized_convolution(&image, &Kernel::new(delta.clone()), orientation).unwrap();
            assert_eq!(estimate.unsupported, 0);
            for (a, b) in estimate.values.iter().zip(data.iter()) {
                assert_relative_eq!(a, b, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn unsupported_pixel_is_counted() {
        // A delta kernel gives no support to a masked pixel from its neighbours.
        let mut mask = Array2::from_elem((3, 3), false);
        mask[[1, 1]] = true;
        let image = MaskedImage::new(Array3::ones((3, 3, 1)), mask).unwrap();
        let mut delta = Array2::<f64>::zeros((5, 5));
        delta[[2, 2]] = 1.0;
        let estimate =
            normalized_convolution(&image, &Kernel::new(delta), Orientation::AsGiven).unwrap();
        assert_eq!(estimate.unsupported, 1);
    }

    #[test]
    fn orientation_decides_shift_direction() {
        // Single weight one step past the centre along axis 0.
        let data = Array3::from_shape_fn((5, 4, 1), |(x, y, _)| (10 * x + y + 1) as f64);
        let image = MaskedImage::fully_observed(data.clone());
        let mut shifted = Array2::<f64>::zeros((9, 7));
        shifted[[5, 3]] = 1.0;
        let kernel = Kernel::new(shifted);

        let flipped = normalized_convolution(&image, &kernel, Orientation::Flipped).unwrap();
        let as_given = normalized_convolution(&image, &kernel, Orientation::AsGiven).unwrap();
        for x in 1..4 {
            for y in 0..4 {
                let (ahead, behind) = (data[[x + 1, y, 0]], data[[x - 1, y, 0]]);
                assert_relative_eq!(flipped.values[[x, y, 0]], ahead, epsilon = 1e-9);
                assert_relative_eq!(as_given.values[[x, y, 0]], behind, epsilon = 1e-9);
            }
        }
        assert_relative_eq!(flipped.values[[2, 0, 0]], 31.0, epsilon = 1e-9);
        assert_relative_eq!(as_given.values[[2, 0, 0]], 11.0, epsilon = 1e-9);
    }

    #[test]
    fn footprint_support_fills_every_pixel() {
        let mut mask = Array2::from_elem((5, 5), false);
        mask[[2, 2]] = true;
        let image = MaskedImage::new(Array3::from_elem((5, 5, 1), 3.0), mask).unwrap();
        let kernel = FootprintParameters::for_image(5, 5, 1.0, 1.0, 10.0, 0.0).kernel();
        let estimate = normalized_convolution(&image, &kernel, Orientation::AsGiven).unwrap();
        assert_eq!(estimate.unsupported, 0);
        assert_relative_eq!(estimate.values[[2, 2, 0]], 3.0, epsilon = 1e-9);
    }
}
