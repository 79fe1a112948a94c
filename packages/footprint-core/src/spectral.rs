//! Two-dimensional DFT over `ndarray` grids.
//!
//! Transforms run along axis 1 first, then along axis 0 on a contiguous
//! transposed copy. The inverse is normalised by the number of elements, so
//! `inverse(forward(x)) == x` up to rounding.

use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub type Complex64 = Complex<f64>;

/// Forward and inverse plans for one grid shape.
pub struct SpectralPlan {
    shape: (usize, usize),
    forward_x: Arc<dyn Fft<f64>>,
    forward_y: Arc<dyn Fft<f64>>,
    inverse_x: Arc<dyn Fft<f64>>,
    inverse_y: Arc<dyn Fft<f64>>,
}

impl SpectralPlan {
    pub fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::new();
        SpectralPlan {
            shape: (width, height),
            forward_x: planner.plan_fft_forward(width),
            forward_y: planner.plan_fft_forward(height),
            inverse_x: planner.plan_fft_inverse(width),
            inverse_y: planner.plan_fft_inverse(height),
        }
    }

    /// Spectrum of a real grid.
    pub fn forward_real(&self, grid: ArrayView2<f64>) -> Array2<Complex64> {
        self.forward(grid.mapv(|v| Complex64::new(v, 0.0)))
    }

    pub fn forward(&self, grid: Array2<Complex64>) -> Array2<Complex64> {
        debug_assert_eq!(grid.dim(), self.shape);
        transform_2d(grid, &self.forward_y, &self.forward_x)
    }

    /// Real part of the normalised inverse transform.
    pub fn inverse_real(&self, spectrum: Array2<Complex64>) -> Array2<f64> {
        debug_assert_eq!(spectrum.dim(), self.shape);
        let n_elements = (self.shape.0 * self.shape.1) as f64;
        transform_2d(spectrum, &self.inverse_y, &self.inverse_x).mapv(|c| c.re / n_elements)
    }
}

fn transform_2d(
    grid: Array2<Complex64>,
    along_y: &Arc<dyn Fft<f64>>,
    along_x: &Arc<dyn Fft<f64>>,
) -> Array2<Complex64> {
    let mut data = grid.as_standard_layout().into_owned();
    process_rows(&mut data, along_y);

    // Columns, after transposing for contiguous access.
    let mut transposed = data.t().as_standard_layout().into_owned();
    process_rows(&mut transposed, along_x);
    transposed.t().as_standard_layout().into_owned()
}

fn process_rows(data: &mut Array2<Complex64>, fft: &Arc<dyn Fft<f64>>) {
    let mut scratch = vec![Complex64::default(); fft.get_inplace_scratch_len()];
    for mut row in data.axis_iter_mut(Axis(0)) {
        if let Some(slice) = row.as_slice_mut() {
            fft.process_with_scratch(slice, &mut scratch);
        } else {
            let mut buffer = row.to_vec();
            fft.process_with_scratch(&mut buffer, &mut scratch);
            row.assign(&ArrayView1::from(buffer.as_slice()));
        }
    }
}

/// Reverses both spatial axes.
pub fn flip_both(grid: ArrayView2<f64>) -> Array2<f64> {
    grid.slice(s![..;-1, ..;-1]).to_owned()
}

/// Embeds `kernel` in a zero grid of `shape` with the kernel centre
/// (index `dim / 2` on each axis) moved to the origin, wrapping around.
pub fn centre_at_origin(kernel: ArrayView2<f64>, shape: (usize, usize)) -> Array2<f64> {
    let (kw, kh) = kernel.dim();
    let (cx, cy) = (kw / 2, kh / 2);
    let (width, height) = shape;
    let mut out = Array2::<f64>::zeros(shape);
    for ((x, y), &v) in kernel.indexed_iter() {
        let tx = (x + width - cx % width) % width;
        let ty = (y + height - cy % height) % height;
        out[[tx, ty]] += v;
    }
    out
}
