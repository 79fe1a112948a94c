//! # Footprint Core Library
//!
//! Masked spectral convolution engine for gridded sensor data. It simulates a
//! sensor's spatial response (forward blurring by a point-spread function) and
//! inverts or gap-fills that response, while accounting for missing pixels.
//!
//! The main components are:
//! - `MaskedImage`: a (width, height, channels) sample grid with a shared validity mask.
//! - `FootprintParameters` / `sensor_footprint`: the isotropic footprint kernel.
//! - `mirror_pad`: reflective padding that turns circular convolution into a
//!   finite-extent one.
//! - `forward_filter`, `kernel_impute`, `inverse_filter`: the three transforms.
//!
//! Every transform is a pure function of its arguments. Nothing here performs
//! I/O or spawns threads; callers parallelise across independent images.

pub mod error;
pub mod footprint;
pub mod image;
pub mod padding;
pub mod spectral;
pub mod text;

mod convolve;
mod forward;
mod impute;
mod inverse;

pub use error::{FilterError, Result};
pub use footprint::{sensor_footprint, FootprintParameters, Kernel};
pub use forward::forward_filter;
pub use image::MaskedImage;
pub use impute::kernel_impute;
pub use inverse::{inverse_filter, InverseConfig, Regularizer};
pub use padding::{crop_window, mirror_pad};

/// Lower bound applied to the normalized-convolution denominator.
pub const DENOMINATOR_FLOOR: f64 = 1e-15;

/// Default noise-to-signal ratio of the Wiener inversion.
pub const DEFAULT_NOISE: f64 = 0.001;

/// Largest finite value of an iterator, if any.
pub(crate) fn finite_max<'a, I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a f64>,
{
    values
        .into_iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}
