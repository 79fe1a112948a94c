//! GDAL raster reading and writing for the batch driver.
//!
//! Rasters are held as (rows, cols, bands) grids so that GDAL rows run
//! along the engine's first axis.

use anyhow::{bail, Context, Result};
use footprint_core::MaskedImage;
use gdal::cpl::CslStringList;
use gdal::raster::{Buffer, ResampleAlg};
use gdal::{Dataset, DriverManager};
use ndarray::{Array2, Array3, Axis};
use std::path::Path;

use crate::config::{Extents, Resampling};

pub const DEFAULT_NODATA: f64 = -9999.0;

impl Resampling {
    pub fn to_gdal(self) -> ResampleAlg {
        match self {
            Resampling::Nearest => ResampleAlg::NearestNeighbour,
            Resampling::Bilinear => ResampleAlg::Bilinear,
            Resampling::Cubic => ResampleAlg::Cubic,
            Resampling::CubicSpline => ResampleAlg::CubicSpline,
            Resampling::Lanczos => ResampleAlg::Lanczos,
            Resampling::Average => ResampleAlg::Average,
            Resampling::Mode => ResampleAlg::Mode,
        }
    }
}

/// Pixel region of a raster: offset and size in GDAL (col, row) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub cols: usize,
    pub rows: usize,
}

impl PixelWindow {
    pub fn full(size: (usize, usize)) -> Self {
        PixelWindow {
            col_off: 0,
            row_off: 0,
            cols: size.0,
            rows: size.1,
        }
    }
}

/// Smallest pixel window of a `size` (cols, rows) raster covering `extents`,
/// clipped to the raster.
pub fn pixel_window(gt: &[f64; 6], size: (usize, usize), extents: &Extents) -> Result<PixelWindow> {
    if gt[2] != 0.0 || gt[4] != 0.0 {
        bail!("Rotated geotransforms are not supported");
    }
    let to_col = |x: f64| (x - gt[0]) / gt[1];
    let to_row = |y: f64| (y - gt[3]) / gt[5];

    let (c0, c1) = (to_col(extents.xmin), to_col(extents.xmax));
    let (r0, r1) = (to_row(extents.ymin), to_row(extents.ymax));
    let clamp = |v: f64, n: usize| v.max(0.0).min(n as f64);

    let col_start = clamp(c0.min(c1).floor(), size.0) as usize;
    let col_end = clamp(c0.max(c1).ceil(), size.0) as usize;
    let row_start = clamp(r0.min(r1).floor(), size.1) as usize;
    let row_end = clamp(r0.max(r1).ceil(), size.1) as usize;

    if col_end <= col_start || row_end <= row_start {
        bail!("Extents {:?} do not overlap the raster", extents);
    }
    Ok(PixelWindow {
        col_off: col_start,
        row_off: row_start,
        cols: col_end - col_start,
        rows: row_end - row_start,
    })
}

/// Geotransform of `window` read at `out_size` (cols, rows).
pub fn window_geo_transform(
    gt: &[f64; 6],
    window: &PixelWindow,
    out_size: (usize, usize),
) -> [f64; 6] {
    let mut out = *gt;
    out[0] += window.col_off as f64 * gt[1];
    out[3] += window.row_off as f64 * gt[5];
    out[1] = gt[1] * window.cols as f64 / out_size.0 as f64;
    out[5] = gt[5] * window.rows as f64 / out_size.1 as f64;
    out
}

/// Output size of `window` when resampled to `resolution` georeferenced units.
fn resampled_size(gt: &[f64; 6], window: &PixelWindow, resolution: Option<f64>) -> (usize, usize) {
    match resolution {
        Some(res) => {
            let cols = (window.cols as f64 * gt[1].abs() / res).round().max(1.0) as usize;
            let rows = (window.rows as f64 * gt[5].abs() / res).round().max(1.0) as usize;
            (cols, rows)
        }
        None => (window.cols, window.rows),
    }
}

/// Ground bounds (xmin, ymin, xmax, ymax) of a (rows, cols) grid.
pub fn ground_bounds(gt: &[f64; 6], shape: (usize, usize)) -> [f64; 4] {
    let (rows, cols) = shape;
    let x1 = gt[0] + cols as f64 * gt[1];
    let y1 = gt[3] + rows as f64 * gt[5];
    [gt[0].min(x1), gt[3].min(y1), gt[0].max(x1), gt[3].max(y1)]
}

/// Placement of a grid on the ground.
#[derive(Debug, Clone)]
pub struct GeoReference {
    pub geo_transform: [f64; 6],
    pub projection: String,
    pub nodata: Option<f64>,
}

impl GeoReference {
    /// Pixel size along the engine axes: (rows direction, cols direction).
    pub fn pixel_size(&self) -> (f64, f64) {
        (self.geo_transform[5].abs(), self.geo_transform[1].abs())
    }
}

/// How a raster is cropped and resampled on read.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub extents: Option<Extents>,
    pub resolution: Option<f64>,
    pub resampling: Resampling,
}

fn read_window(
    ds: &Dataset,
    options: &ReadOptions,
) -> Result<(PixelWindow, (usize, usize), [f64; 6])> {
    let gt = ds.geo_transform()?;
    let size = ds.raster_size();
    let window = match &options.extents {
        Some(extents) => pixel_window(&gt, size, extents)?,
        None => PixelWindow::full(size),
    };
    let out_size = resampled_size(&gt, &window, options.resolution);
    Ok((window, out_size, window_geo_transform(&gt, &window, out_size)))
}

fn read_band(
    ds: &Dataset,
    index: usize,
    window: &PixelWindow,
    out_size: (usize, usize),
    alg: ResampleAlg,
) -> Result<(Array2<f64>, Option<f64>)> {
    let band = ds.rasterband(index)?;
    let buffer: Buffer<f64> = band.read_as(
        (window.col_off as isize, window.row_off as isize),
        (window.cols, window.rows),
        out_size,
        Some(alg),
    )?;
    let grid = Array2::from_shape_vec((out_size.1, out_size.0), buffer.data().to_vec())?;
    Ok((grid, band.no_data_value()))
}

/// Reads every band of `path` as one channel of a masked image.
///
/// A pixel is masked if any band is NaN or equals that band's nodata value.
pub fn read_image(path: &Path, options: &ReadOptions) -> Result<(MaskedImage, GeoReference)> {
    let ds = Dataset::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let band_count = ds.raster_count();
    if band_count == 0 {
        bail!("{} has no raster bands", path.display());
    }
    let (window, out_size, geo_transform) = read_window(&ds, options)?;

    let alg = options.resampling.to_gdal();
    let mut data = Array3::<f64>::zeros((out_size.1, out_size.0, band_count));
    let mut nodata = Vec::with_capacity(band_count);
    for b in 0..band_count {
        let (grid, band_nodata) = read_band(&ds, b + 1, &window, out_size, alg)?;
        data.index_axis_mut(Axis(2), b).assign(&grid);
        nodata.push(band_nodata);
    }

    let image = MaskedImage::from_nodata(data, &nodata);
    let georef = GeoReference {
        geo_transform,
        projection: ds.projection(),
        nodata: nodata[0],
    };
    Ok((image, georef))
}

/// Validity grid read from a mask raster: `true` where the mask marks a
/// pixel invalid (zero, nodata or NaN).
#[derive(Debug, Clone)]
pub struct MaskGrid {
    invalid: Array2<bool>,
    geo_transform: [f64; 6],
}

impl MaskGrid {
    /// Reads band 1 of `path`, cropped to the extents with nearest resampling.
    pub fn read(path: &Path, extents: Option<Extents>) -> Result<Self> {
        let ds = Dataset::open(path)
            .with_context(|| format!("Failed to open mask {}", path.display()))?;
        let options = ReadOptions {
            extents,
            resolution: None,
            resampling: Resampling::Nearest,
        };
        let (window, out_size, geo_transform) = read_window(&ds, &options)?;
        let (grid, nodata) = read_band(&ds, 1, &window, out_size, ResampleAlg::NearestNeighbour)?;
        let invalid = grid.mapv(|v| v == 0.0 || v.is_nan() || nodata.is_some_and(|ndv| v == ndv));
        Ok(MaskGrid {
            invalid,
            geo_transform,
        })
    }

    #[cfg(test)]
    pub fn from_invalid(invalid: Array2<bool>, geo_transform: [f64; 6]) -> Self {
        MaskGrid {
            invalid,
            geo_transform,
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.invalid.dim()
    }

    /// The mask at `shape` (rows, cols), nearest-neighbour resampled if the
    /// sizes differ.
    pub fn resampled(&self, shape: (usize, usize)) -> Array2<bool> {
        let (src_rows, src_cols) = self.invalid.dim();
        if (src_rows, src_cols) == shape {
            return self.invalid.clone();
        }
        let (rows, cols) = shape;
        Array2::from_shape_fn(shape, |(r, c)| {
            let sr = ((r as f64 + 0.5) * src_rows as f64 / rows as f64) as usize;
            let sc = ((c as f64 + 0.5) * src_cols as f64 / cols as f64) as usize;
            self.invalid[[sr.min(src_rows - 1), sc.min(src_cols - 1)]]
        })
    }

    /// `image` with the mask's invalid pixels added to its own mask.
    ///
    /// The mask and the image must cover the same ground footprint, to
    /// within one pixel of the coarser grid.
    pub fn apply(&self, image: MaskedImage, georef: &GeoReference) -> Result<MaskedImage> {
        if self.invalid.is_empty() {
            return Ok(image);
        }
        let (width, height, _) = image.dim();
        let mask_bounds = ground_bounds(&self.geo_transform, self.invalid.dim());
        let image_bounds = ground_bounds(&georef.geo_transform, (width, height));
        let tolerance = [self.geo_transform, georef.geo_transform]
            .iter()
            .flat_map(|gt| [gt[1].abs(), gt[5].abs()])
            .fold(0.0, f64::max);
        if mask_bounds
            .iter()
            .zip(image_bounds.iter())
            .any(|(m, i)| (m - i).abs() > tolerance)
        {
            bail!(
                "Mask bounds {:?} do not match raster bounds {:?}",
                mask_bounds,
                image_bounds
            );
        }
        let extra = self.resampled((width, height));
        let (data, mut mask) = image.into_parts();
        ndarray::Zip::from(&mut mask).and(&extra).for_each(|m, &e| *m |= e);
        Ok(MaskedImage::new(data, mask)?)
    }
}

/// Writes `image` as an f64 GeoTIFF; masked pixels take the nodata value.
pub fn write_image(path: &Path, image: &MaskedImage, georef: &GeoReference) -> Result<()> {
    let (rows, cols, bands) = image.dim();
    let nodata = georef.nodata.unwrap_or(DEFAULT_NODATA);
    let driver = DriverManager::get_driver_by_name("GTiff")?;
    let mut ds = driver
        .create_with_band_type::<f64, _>(path, cols, rows, bands)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    ds.set_geo_transform(&georef.geo_transform)?;
    if !georef.projection.is_empty() {
        ds.set_projection(&georef.projection)?;
    }

    for b in 0..bands {
        let channel = image.data().index_axis(Axis(2), b);
        let values: Vec<f64> = ndarray::Zip::from(&channel)
            .and(image.mask())
            .map_collect(|&v, &masked| if masked { nodata } else { v })
            .iter()
            .cloned()
            .collect();
        let mut band = ds.rasterband(b + 1)?;
        band.set_no_data_value(Some(nodata))?;
        let mut buffer = Buffer::new((cols, rows), values);
        band.write((0, 0), (cols, rows), &mut buffer)?;
    }
    ds.flush_cache()?;
    Ok(())
}

/// Linear stretch of the observed samples of one channel onto 1..=255;
/// masked pixels map to 0.
pub fn to_byte_scale(image: &MaskedImage, channel: usize) -> Array2<u8> {
    let values = image.data().index_axis(Axis(2), channel);
    let (lo, hi) = ndarray::Zip::from(&values)
        .and(image.mask())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v, &masked| {
            if masked || !v.is_finite() {
                (lo, hi)
            } else {
                (lo.min(v), hi.max(v))
            }
        });
    let span = hi - lo;
    ndarray::Zip::from(&values)
        .and(image.mask())
        .map_collect(|&v, &masked| {
            if masked || !v.is_finite() {
                0
            } else if span > 0.0 {
                (1.0 + 254.0 * (v - lo) / span).round() as u8
            } else {
                255
            }
        })
}

/// Writes an 8-bit JPEG preview of the first (up to three) channels.
pub fn write_visualization(
    path: &Path,
    image: &MaskedImage,
    georef: &GeoReference,
) -> Result<()> {
    let (rows, cols, channels) = image.dim();
    let bands = if channels >= 3 { 3 } else { 1 };
    let mem = DriverManager::get_driver_by_name("MEM")?;
    let mut ds = mem.create_with_band_type::<u8, _>("", cols, rows, bands)?;
    ds.set_geo_transform(&georef.geo_transform)?;
    for b in 0..bands {
        let bytes: Vec<u8> = to_byte_scale(image, b).iter().cloned().collect();
        let mut buffer = Buffer::new((cols, rows), bytes);
        ds.rasterband(b + 1)?.write((0, 0), (cols, rows), &mut buffer)?;
    }
    let jpeg = DriverManager::get_driver_by_name("JPEG")?;
    ds.create_copy(&jpeg, path, &CslStringList::new())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const GT: [f64; 6] = [100.0, 2.0, 0.0, 50.0, 0.0, -2.0];

    fn georef(geo_transform: [f64; 6]) -> GeoReference {
        GeoReference {
            geo_transform,
            projection: String::new(),
            nodata: None,
        }
    }

    #[test]
    fn window_covers_extents() {
        let extents = Extents {
            xmin: 103.0,
            ymin: 40.0,
            xmax: 110.0,
            ymax: 46.0,
        };
        let window = pixel_window(&GT, (20, 20), &extents).unwrap();
        assert_eq!(
            window,
            PixelWindow {
                col_off: 1,
                row_off: 2,
                cols: 4,
                rows: 3
            }
        );
        let gt = window_geo_transform(&GT, &window, (window.cols, window.rows));
        assert_eq!(gt, [102.0, 2.0, 0.0, 46.0, 0.0, -2.0]);
    }

    #[test]
    fn window_is_clipped_and_disjoint_extents_fail() {
        let extents = Extents {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 1000.0,
            ymax: 1000.0,
        };
        assert_eq!(pixel_window(&GT, (8, 6), &extents).unwrap(), PixelWindow::full((8, 6)));

        let outside = Extents {
            xmin: 500.0,
            ymin: 0.0,
            xmax: 600.0,
            ymax: 10.0,
        };
        assert!(pixel_window(&GT, (8, 6), &outside).is_err());
    }

    #[test]
    fn resolution_scales_output_size_and_transform() {
        let window = PixelWindow::full((10, 6));
        let size = resampled_size(&GT, &window, Some(4.0));
        assert_eq!(size, (5, 3));
        let gt = window_geo_transform(&GT, &window, size);
        assert_eq!(gt[1], 4.0);
        assert_eq!(gt[5], -4.0);
    }

    #[test]
    fn mask_grid_resamples_nearest() {
        let invalid = Array2::from_shape_fn((2, 2), |(r, c)| r == 0 && c == 1);
        let grid = MaskGrid::from_invalid(invalid, GT);
        let up = grid.resampled((4, 4));
        assert!(up[[0, 2]] && up[[1, 3]]);
        assert!(!up[[0, 0]] && !up[[2, 2]]);
        assert_eq!(up.iter().filter(|&&m| m).count(), 4);
    }

    #[test]
    fn mask_grid_extends_image_mask() {
        let mut mask = Array2::from_elem((3, 3), false);
        mask[[0, 0]] = true;
        let image = MaskedImage::new(Array3::ones((3, 3, 1)), mask).unwrap();
        let invalid = Array2::from_shape_fn((3, 3), |(r, c)| r == 2 && c == 2);
        let out = MaskGrid::from_invalid(invalid, GT)
            .apply(image, &georef(GT))
            .unwrap();
        assert_eq!(out.masked_count(), 2);
        assert!(out.mask()[[0, 0]] && out.mask()[[2, 2]]);
    }

    #[test]
    fn coarser_mask_on_same_footprint_is_accepted() {
        let image = MaskedImage::fully_observed(Array3::ones((4, 4, 1)));
        let coarse = [100.0, 4.0, 0.0, 50.0, 0.0, -4.0];
        let invalid = Array2::from_shape_fn((2, 2), |(r, c)| r == 1 && c == 1);
        let out = MaskGrid::from_invalid(invalid, coarse)
            .apply(image, &georef(GT))
            .unwrap();
        assert_eq!(out.masked_count(), 4);
        assert!(out.mask()[[2, 2]] && out.mask()[[3, 3]]);
    }

    #[test]
    fn misaligned_mask_is_rejected() {
        let image = MaskedImage::fully_observed(Array3::ones((3, 3, 1)));
        let shifted = [120.0, 2.0, 0.0, 50.0, 0.0, -2.0];
        let invalid = Array2::from_elem((3, 3), false);
        let result = MaskGrid::from_invalid(invalid, shifted).apply(image, &georef(GT));
        assert!(result.is_err());
    }

    #[test]
    fn bounds_are_ordered() {
        assert_eq!(ground_bounds(&GT, (3, 4)), [100.0, 44.0, 108.0, 50.0]);
    }

    #[test]
    fn byte_scale_stretches_observed_range() {
        let data = Array3::from_shape_fn((2, 2, 1), |(r, c, _)| (r * 2 + c) as f64);
        let mut mask = Array2::from_elem((2, 2), false);
        mask[[1, 1]] = true;
        let image = MaskedImage::new(data, mask).unwrap();
        let bytes = to_byte_scale(&image, 0);
        assert_eq!(bytes[[0, 0]], 1);
        assert_eq!(bytes[[1, 0]], 255);
        assert_eq!(bytes[[1, 1]], 0);
    }
}
