//! Error types for the footprint engine.

use thiserror::Error;

/// Errors raised by the engine's transforms.
///
/// Numerical degeneracies (a neighbourhood with no observed samples) are not
/// errors: they are absorbed by the denominator floor and only logged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Inverse filtering requires a fully observed image, found {masked} masked pixel(s)")]
    PreconditionViolation { masked: usize },

    #[error("Mask shape ({mask_w}, {mask_h}) does not match sample grid ({width}, {height})")]
    MaskShape {
        width: usize,
        height: usize,
        mask_w: usize,
        mask_h: usize,
    },

    #[error("Kernel shape ({actual_w}, {actual_h}) does not fit padded grid ({expected_w}, {expected_h})")]
    KernelShape {
        expected_w: usize,
        expected_h: usize,
        actual_w: usize,
        actual_h: usize,
    },

    #[error("Image ({width}, {height}) is too small to mirror-pad; both dimensions must be at least 2")]
    TooSmall { width: usize, height: usize },

    #[error("Kernel sum must be finite and positive, got {sum}")]
    DegenerateKernel { sum: f64 },
}

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, FilterError>;
