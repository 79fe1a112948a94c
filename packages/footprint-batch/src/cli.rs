use clap::{Parser, ValueEnum};
use footprint_core::DEFAULT_NOISE;
use std::path::PathBuf;

/// Command-line arguments for the footprint-batch tool.
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about,
    long_about = "Applies a sensor footprint transform (forward blur, gap filling or Wiener deconvolution) to every raster in a directory."
)]
pub struct Args {
    /// Directory containing the input rasters.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Directory for the transformed rasters. Created if it does not exist.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Optional mask raster. Zero or nodata cells mark pixels as missing in every input.
    #[arg(short, long)]
    pub mask: Option<PathBuf>,

    /// Resampling algorithm used when a target resolution is requested.
    #[arg(short, long, default_value = "nearest")]
    pub resampling: String,

    /// Optional target pixel size, in georeferenced units.
    #[arg(long)]
    pub resolution: Option<f64>,

    /// Also write an 8-bit JPEG visualization next to each output raster.
    #[arg(short, long)]
    pub jpeg: bool,

    /// Extents in target coordinates as four numbers: "xmin ymin xmax ymax".
    /// Whole image if omitted.
    #[arg(short, long, allow_hyphen_values = true)]
    pub extents: Option<String>,

    /// The transform to apply.
    #[arg(short, long, value_enum, default_value_t = TransformKind::Forward)]
    pub transform: TransformKind,

    /// Sensor height above the surface, in georeferenced units.
    #[arg(long, default_value_t = 100.0)]
    pub height: f64,

    /// Air attenuation coefficient (per georeferenced unit).
    #[arg(long, default_value_t = 0.0)]
    pub mu_air: f64,

    /// Pixel size along image rows. Defaults to the raster's geotransform.
    #[arg(long)]
    pub res_x: Option<f64>,

    /// Pixel size along image columns. Defaults to the raster's geotransform.
    #[arg(long)]
    pub res_y: Option<f64>,

    /// Noise-to-signal ratio of the inverse transform.
    #[arg(long, default_value_t = DEFAULT_NOISE)]
    pub noise: f64,

    /// Regularize the inverse transform with the discrete Laplacian instead of a constant.
    #[arg(long)]
    pub laplacian: bool,

    /// Clamp the deconvolved values to [-1, 1] before the final normalization.
    #[arg(long)]
    pub clip: bool,

    /// File name suffix selecting the input rasters.
    #[arg(long, default_value = ".tif")]
    pub pattern: String,

    /// Number of worker threads. Defaults to 0 (all available cores).
    #[arg(long, default_value_t = 0)]
    pub jobs: usize,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// The engine operation applied to each raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransformKind {
    /// Simulate the sensor blur with mask-aware convolution.
    Forward,
    /// Fill masked pixels from their observed neighbourhood.
    Impute,
    /// Recover the unblurred signal from a fully observed raster.
    Inverse,
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransformKind::Forward => "forward",
            TransformKind::Impute => "impute",
            TransformKind::Inverse => "inverse",
        };
        write!(f, "{}", name)
    }
}
