//! Validated batch configuration.
//!
//! Everything the workers need is resolved here once, before any raster is
//! touched, and then passed down explicitly.

use anyhow::{bail, Context, Result};
use footprint_core::{InverseConfig, Regularizer};
use std::fs;
use std::path::PathBuf;

use crate::cli::{Args, TransformKind};

/// Bounding box in target coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extents {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Resampling algorithms understood by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resampling {
    Nearest,
    Bilinear,
    Cubic,
    CubicSpline,
    Lanczos,
    Average,
    Mode,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mask_file: Option<PathBuf>,
    pub resampling: Resampling,
    pub resolution: Option<f64>,
    pub visualize: bool,
    pub extents: Option<Extents>,
    pub transform: TransformKind,
    pub sensor_height: f64,
    pub mu_air: f64,
    pub res_override: (Option<f64>, Option<f64>),
    pub inverse: InverseConfig,
    pub pattern: String,
    pub jobs: usize,
}

/// Parses "xmin ymin xmax ymax".
pub fn parse_extents(text: &str) -> Result<Extents> {
    let values = text
        .split_whitespace()
        .map(|t| {
            t.parse::<f64>()
                .with_context(|| format!("Extents value '{}' is not a number", t))
        })
        .collect::<Result<Vec<f64>>>()?;

    if values.len() != 4 {
        bail!(
            "Extents must be exactly four numbers separated by spaces (xmin ymin xmax ymax), got {}. \
             Example: --extents '150.91 -34.23 150.95 -34.17'",
            values.len()
        );
    }
    let extents = Extents {
        xmin: values[0],
        ymin: values[1],
        xmax: values[2],
        ymax: values[3],
    };
    if extents.xmin >= extents.xmax || extents.ymin >= extents.ymax {
        bail!(
            "Extents are empty: xmin must be below xmax and ymin below ymax ({:?})",
            extents
        );
    }
    Ok(extents)
}

pub fn parse_resampling(name: &str) -> Result<Resampling> {
    let resampling = match name.to_ascii_lowercase().as_str() {
        "near" | "nearest" => Resampling::Nearest,
        "bilinear" => Resampling::Bilinear,
        "cubic" => Resampling::Cubic,
        "cubicspline" => Resampling::CubicSpline,
        "lanczos" => Resampling::Lanczos,
        "average" => Resampling::Average,
        "mode" => Resampling::Mode,
        other => bail!(
            "Unknown resampling algorithm '{}'. Use one of: nearest, bilinear, cubic, cubicspline, lanczos, average, mode",
            other
        ),
    };
    Ok(resampling)
}

impl BatchConfig {
    /// Validates the command line and prepares the output directory.
    pub fn from_args(args: &Args) -> Result<Self> {
        if !args.input.is_dir() {
            bail!("Input directory {} does not exist", args.input.display());
        }
        if let Some(mask) = &args.mask {
            if !mask.is_file() {
                bail!("Mask file {} does not exist", mask.display());
            }
        }

        let extents = args.extents.as_deref().map(parse_extents).transpose()?;
        if extents.is_none() {
            log::info!("No extents specified. Using the whole image.");
        }
        let resampling = parse_resampling(&args.resampling)?;

        if let Some(res) = args.resolution {
            if !(res.is_finite() && res > 0.0) {
                bail!("Target resolution must be a positive number, got {}", res);
            }
        }
        if !(args.noise.is_finite() && args.noise >= 0.0) {
            bail!("Noise must be a non-negative number, got {}", args.noise);
        }

        if !args.output.exists() {
            fs::create_dir_all(&args.output).with_context(|| {
                format!("Failed to create output directory {}", args.output.display())
            })?;
        }
        let input_dir = fs::canonicalize(&args.input)?;
        let output_dir = fs::canonicalize(&args.output)?;
        if input_dir == output_dir {
            bail!("Output directory must differ from the input directory");
        }

        Ok(BatchConfig {
            input_dir,
            output_dir,
            mask_file: args.mask.clone(),
            resampling,
            resolution: args.resolution,
            visualize: args.jpeg,
            extents,
            transform: args.transform,
            sensor_height: args.height,
            mu_air: args.mu_air,
            res_override: (args.res_x, args.res_y),
            inverse: InverseConfig {
                noise: args.noise,
                regularizer: if args.laplacian {
                    Regularizer::Laplacian
                } else {
                    Regularizer::Identity
                },
                clip: args.clip,
            },
            pattern: args.pattern.clone(),
            jobs: args.jobs,
        })
    }
}
