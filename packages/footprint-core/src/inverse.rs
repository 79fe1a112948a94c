//! Regularized frequency-domain inversion of the footprint blur.
//!
//! Each channel of the mirror-padded image is deconvolved with the Wiener
//! filter
//!
//! ```text
//! X = F * conj(H) / (|H|^2 + noise * |R|^2)
//! ```
//!
//! where `H` is the transfer function of the unit-gain kernel and `R` the
//! transfer function of the regularizer.

use ndarray::{s, Array2, Array3, Axis};
use std::f64::consts::PI;

use crate::error::{FilterError, Result};
use crate::footprint::Kernel;
use crate::image::MaskedImage;
use crate::padding::{check_paddable, mirror_pad_data, padded_len};
use crate::spectral::{centre_at_origin, Complex64, SpectralPlan};
use crate::{finite_max, DEFAULT_NOISE};

/// Penalty applied to the inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Regularizer {
    /// |R|^2 = 1: plain noise-to-signal damping.
    #[default]
    Identity,
    /// |R|^2 of the discrete 5-point Laplacian, damping high frequencies harder.
    Laplacian,
}

/// Tuning of `inverse_filter`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseConfig {
    pub noise: f64,
    pub regularizer: Regularizer,
    /// Clamp each deconvolved channel to [-1, 1] before cropping.
    pub clip: bool,
}

impl Default for InverseConfig {
    fn default() -> Self {
        InverseConfig {
            noise: DEFAULT_NOISE,
            regularizer: Regularizer::Identity,
            clip: false,
        }
    }
}

fn regularizer_power(regularizer: Regularizer, shape: (usize, usize)) -> Array2<f64> {
    let (width, height) = shape;
    match regularizer {
        Regularizer::Identity => Array2::ones(shape),
        Regularizer::Laplacian => Array2::from_shape_fn(shape, |(u, v)| {
            let r = 4.0
                - 2.0 * (2.0 * PI * u as f64 / width as f64).cos()
                - 2.0 * (2.0 * PI * v as f64 / height as f64).cos();
            r * r
        }),
    }
}

/// Recovers the unblurred signal from a fully observed image.
///
/// The padded image is scaled to unit peak and the kernel to unit sum before
/// inversion; the cropped result is again scaled to unit peak. The kernel
/// may be smaller than the padded grid (2W-1, 2H-1); its centre is taken at
/// index `dim / 2`.
///
/// # Errors
/// * `FilterError::PreconditionViolation` if any pixel is masked. Nothing
///   is computed in that case.
/// * `FilterError::TooSmall`, `FilterError::KernelShape`,
///   `FilterError::DegenerateKernel` for invalid arguments.
pub fn inverse_filter(
    image: &MaskedImage,
    kernel: &Kernel,
    config: &InverseConfig,
) -> Result<MaskedImage> {
    let masked = image.masked_count();
    if masked > 0 {
        return Err(FilterError::PreconditionViolation { masked });
    }

    let (width, height, channels) = image.dim();
    check_paddable(width, height)?;
    let padded_shape = (padded_len(width), padded_len(height));
    let (kernel_w, kernel_h) = kernel.dim();
    if kernel_w > padded_shape.0 || kernel_h > padded_shape.1 || kernel_w == 0 || kernel_h == 0 {
        return Err(FilterError::KernelShape {
            expected_w: padded_shape.0,
            expected_h: padded_shape.1,
            actual_w: kernel_w,
            actual_h: kernel_h,
        });
    }
    let kernel_sum = kernel.sum();
    if !kernel_sum.is_finite() || kernel_sum <= 0.0 {
        return Err(FilterError::DegenerateKernel { sum: kernel_sum });
    }

    log::debug!(
        "Inverse filter on {}x{}x{} image (noise {}, {:?})",
        width,
        height,
        channels,
        config.noise,
        config.regularizer
    );

    let mut padded = mirror_pad_data(image.data());
    if let Some(peak) = finite_max(padded.iter()).filter(|&p| p != 0.0) {
        padded.mapv_inplace(|v| v / peak);
    }
    let psf = kernel.values() / kernel_sum;

    let plan = SpectralPlan::new(padded_shape.0, padded_shape.1);
    let transfer = plan.forward_real(centre_at_origin(psf.view(), padded_shape).view());
    let penalty = regularizer_power(config.regularizer, padded_shape);
    let mut wiener = Array2::<Complex64>::zeros(padded_shape);
    ndarray::Zip::from(&mut wiener)
        .and(&transfer)
        .and(&penalty)
        .for_each(|w, h, &p| *w = h.conj() / (h.norm_sqr() + config.noise * p));

    let mut out = Array3::<f64>::zeros((width, height, channels));
    for c in 0..channels {
        let spectrum = plan.forward_real(padded.index_axis(Axis(2), c));
        let mut channel = plan.inverse_real(spectrum * &wiener);
        if config.clip {
            channel.mapv_inplace(|v| v.clamp(-1.0, 1.0));
        }
        out.index_axis_mut(Axis(2), c)
            .assign(&channel.slice(s![..width, ..height]));
    }

    if let Some(peak) = finite_max(out.iter()).filter(|&p| p != 0.0) {
        out.mapv_inplace(|v| v / peak);
    }

    Ok(MaskedImage::from_parts(out, image.mask().clone()))
}
