use anyhow::{Context, Result};
use footprint_core::{
    forward_filter, inverse_filter, kernel_impute, FootprintParameters, Kernel, MaskedImage,
};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::cli::TransformKind;
use crate::config::BatchConfig;
use crate::io::{self, GeoReference, MaskGrid, ReadOptions};

/// Regular files directly inside `dir` whose name ends with `pattern`,
/// sorted by path.
pub fn discover_inputs(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(pattern) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Footprint kernel sized for `image`, using the raster's pixel size unless
/// overridden.
pub fn footprint_kernel(
    image: &MaskedImage,
    georef: &GeoReference,
    config: &BatchConfig,
) -> Kernel {
    let (native_x, native_y) = georef.pixel_size();
    let res_x = config.res_override.0.unwrap_or(native_x);
    let res_y = config.res_override.1.unwrap_or(native_y);
    FootprintParameters::for_image(
        image.width(),
        image.height(),
        res_x,
        res_y,
        config.sensor_height,
        config.mu_air,
    )
    .kernel()
}

pub fn apply_transform(
    image: &MaskedImage,
    kernel: &Kernel,
    config: &BatchConfig,
) -> Result<MaskedImage> {
    let out = match config.transform {
        TransformKind::Forward => forward_filter(image, kernel)?,
        TransformKind::Impute => kernel_impute(image, kernel)?,
        TransformKind::Inverse => inverse_filter(image, kernel, &config.inverse)?,
    };
    Ok(out)
}

/// Reads, masks, transforms and writes one raster. Returns the output path.
pub fn process_file(
    input: &Path,
    config: &BatchConfig,
    mask: Option<&MaskGrid>,
) -> Result<PathBuf> {
    let file_name = input
        .file_name()
        .with_context(|| format!("{} has no file name", input.display()))?;
    let output = config.output_dir.join(file_name);

    let options = ReadOptions {
        extents: config.extents,
        resolution: config.resolution,
        resampling: config.resampling,
    };
    let (image, georef) = io::read_image(input, &options)?;
    let image = match mask {
        Some(grid) => grid.apply(image, &georef)?,
        None => image,
    };
    log::debug!(
        "{}: {}x{}x{}, {} masked pixels",
        input.display(),
        image.width(),
        image.height(),
        image.channels(),
        image.masked_count()
    );

    let kernel = footprint_kernel(&image, &georef, config);
    let result = apply_transform(&image, &kernel, config)
        .with_context(|| format!("{} transform failed on {}", config.transform, input.display()))?;

    io::write_image(&output, &result, &georef)?;
    if config.visualize {
        io::write_visualization(&output.with_extension("jpg"), &result, &georef)?;
    }
    log::info!("{} -> {}", input.display(), output.display());
    Ok(output)
}
