//! Sample grids paired with a per-pixel validity mask.

use ndarray::{Array2, Array3, Axis};

use crate::error::{FilterError, Result};

/// A (width, height, channels) sample grid with a (width, height) mask.
///
/// A `true` mask entry marks the pixel as missing in every channel. Sample
/// values under the mask are never read by the transforms.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedImage {
    data: Array3<f64>,
    mask: Array2<bool>,
}

impl MaskedImage {
    /// Pairs a sample grid with its mask.
    ///
    /// # Errors
    /// `FilterError::MaskShape` if the mask does not cover the first two
    /// dimensions of `data` exactly.
    pub fn new(data: Array3<f64>, mask: Array2<bool>) -> Result<Self> {
        let (width, height, _) = data.dim();
        let (mask_w, mask_h) = mask.dim();
        if (mask_w, mask_h) != (width, height) {
            return Err(FilterError::MaskShape {
                width,
                height,
                mask_w,
                mask_h,
            });
        }
        Ok(MaskedImage { data, mask })
    }

    /// Wraps a grid in which every pixel is observed.
    pub fn fully_observed(data: Array3<f64>) -> Self {
        let (width, height, _) = data.dim();
        MaskedImage {
            data,
            mask: Array2::from_elem((width, height), false),
        }
    }

    /// Derives the mask from per-channel nodata values: a pixel is missing
    /// if any channel is NaN or equals that channel's entry in `nodata`.
    /// Channels without an entry only treat NaN as missing.
    pub fn from_nodata(data: Array3<f64>, nodata: &[Option<f64>]) -> Self {
        let mask = data.map_axis(Axis(2), |pixel| {
            pixel.iter().enumerate().any(|(c, &v)| {
                v.is_nan() || nodata.get(c).copied().flatten().is_some_and(|ndv| v == ndv)
            })
        });
        MaskedImage { data, mask }
    }

    pub(crate) fn from_parts(data: Array3<f64>, mask: Array2<bool>) -> Self {
        debug_assert_eq!(mask.dim(), (data.dim().0, data.dim().1));
        MaskedImage { data, mask }
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    /// (width, height, channels)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn width(&self) -> usize {
        self.data.dim().0
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    /// Number of masked pixels.
    pub fn masked_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    pub fn is_fully_observed(&self) -> bool {
        !self.mask.iter().any(|&m| m)
    }

    /// Largest finite sample over observed pixels, all channels.
    pub fn observed_max(&self) -> Option<f64> {
        let (width, height, channels) = self.dim();
        let mut peak: Option<f64> = None;
        for x in 0..width {
            for y in 0..height {
                if self.mask[[x, y]] {
                    continue;
                }
                for c in 0..channels {
                    let v = self.data[[x, y, c]];
                    if v.is_finite() {
                        peak = Some(peak.map_or(v, |p| p.max(v)));
                    }
                }
            }
        }
        peak
    }

    /// Copy of the samples with every masked pixel set to zero.
    pub fn zero_filled(&self) -> Array3<f64> {
        let mut filled = self.data.clone();
        for ((x, y, _), v) in filled.indexed_iter_mut() {
            if self.mask[[x, y]] {
                *v = 0.0;
            }
        }
        filled
    }

    /// 1.0 where observed, 0.0 where masked.
    pub fn observed_indicator(&self) -> Array2<f64> {
        self.mask.mapv(|m| if m { 0.0 } else { 1.0 })
    }

    pub fn into_parts(self) -> (Array3<f64>, Array2<bool>) {
        (self.data, self.mask)
    }
}
