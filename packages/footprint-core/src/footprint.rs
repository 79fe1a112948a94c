//! Sensor footprint (point-spread) kernels.
//!
//! The footprint of a sensor at height `h` above the surface weights a
//! ground sample at horizontal offset `(dx, dy)` by the inverse-square law
//! with exponential attenuation through air:
//!
//! ```text
//! r = sqrt((dx * res_x)^2 + (dy * res_y)^2 + h^2)
//! w = exp(-mu * r) / r^2
//! ```

use ndarray::{Array2, ArrayView2};

use crate::spectral::flip_both;

/// Spatial response function broadcast across channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    values: Array2<f64>,
}

impl Kernel {
    pub fn new(values: Array2<f64>) -> Self {
        Kernel { values }
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn sum(&self) -> f64 {
        self.values.sum()
    }

    /// The kernel reversed along both axes.
    pub fn flipped(&self) -> Array2<f64> {
        flip_both(self.values.view())
    }

    pub fn into_inner(self) -> Array2<f64> {
        self.values
    }
}

impl From<Array2<f64>> for Kernel {
    fn from(values: Array2<f64>) -> Self {
        Kernel::new(values)
    }
}

/// Physical description of a sensor footprint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintParameters {
    /// Half extent along axis 0, in pixels. The kernel spans `2 * half_width - 1`.
    pub half_width: usize,
    /// Half extent along axis 1, in pixels.
    pub half_height: usize,
    /// Pixel size along axis 0.
    pub res_x: f64,
    /// Pixel size along axis 1.
    pub res_y: f64,
    /// Sensor height above the surface, same unit as the resolution.
    pub height: f64,
    /// Air attenuation coefficient, per unit length.
    pub mu_air: f64,
}

impl FootprintParameters {
    /// Parameters whose kernel matches the padded grid of a (width, height) image.
    pub fn for_image(
        width: usize,
        height: usize,
        res_x: f64,
        res_y: f64,
        sensor_height: f64,
        mu_air: f64,
    ) -> Self {
        FootprintParameters {
            half_width: width,
            half_height: height,
            res_x,
            res_y,
            height: sensor_height,
            mu_air,
        }
    }

    pub fn kernel(&self) -> Kernel {
        sensor_footprint(self)
    }
}

/// Builds the (2W-1, 2H-1) footprint kernel centred at (W-1, H-1).
pub fn sensor_footprint(params: &FootprintParameters) -> Kernel {
    let w = params.half_width as isize;
    let h = params.half_height as isize;
    let shape = (
        (2 * params.half_width).saturating_sub(1),
        (2 * params.half_height).saturating_sub(1),
    );
    let height_sq = params.height * params.height;

    let values = Array2::from_shape_fn(shape, |(i, j)| {
        let dx = (i as isize - (w - 1)) as f64 * params.res_x;
        let dy = (j as isize - (h - 1)) as f64 * params.res_y;
        let r = (dx * dx + dy * dy + height_sq).sqrt();
        (-params.mu_air * r).exp() / (r * r)
    });

    log::debug!(
        "Footprint kernel {}x{} (height {}, mu {})",
        shape.0,
        shape.1,
        params.height,
        params.mu_air
    );
    Kernel::new(values)
}
