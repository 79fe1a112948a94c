mod cli;
mod config;
mod io;
mod process;
mod schedule;

use anyhow::{Context, Result};
use clap::Parser;
use console::Term;
use flexi_logger::Logger;
use footprint_core::text;
use std::io::Write;
use std::sync::Mutex;

use cli::{Args, TransformKind};
use config::BatchConfig;
use io::MaskGrid;

fn print_configuration(config: &BatchConfig, files: usize, workers: usize) {
    let dline = text::rules().1;
    println!("{} Configuration:", text::bold("Batch"));
    println!("{}", text::setting("Input Directory:", config.input_dir.display()));
    println!("{}", text::setting("Output Directory:", config.output_dir.display()));
    println!("{}", text::setting("Transform:", config.transform));
    println!(
        "{}",
        text::setting(
            "Mask File:",
            config
                .mask_file
                .as_ref()
                .map_or("none".to_string(), |p| p.display().to_string())
        )
    );
    let extents = match config.extents {
        Some(e) => format!("{} {} {} {}", e.xmin, e.ymin, e.xmax, e.ymax),
        None => "whole image".to_string(),
    };
    println!("{}", text::setting("Extents:", extents));
    println!("{}", text::setting("Resampling:", format!("{:?}", config.resampling)));
    if let Some(res) = config.resolution {
        println!("{}", text::setting("Target Resolution:", res));
    }
    println!("{}", text::setting("Sensor Height:", config.sensor_height));
    println!("{}", text::setting("Air Attenuation:", config.mu_air));
    if config.transform == TransformKind::Inverse {
        println!("{}", text::setting("Noise:", config.inverse.noise));
        println!(
            "{}",
            text::setting("Regularizer:", format!("{:?}", config.inverse.regularizer))
        );
        println!("{}", text::setting("Clip:", config.inverse.clip));
    }
    println!("{}", text::setting("JPEG Preview:", config.visualize));
    println!("{}", text::setting("Input Files:", files));
    println!("{}", text::setting("Parallel Jobs:", workers));
    println!("{}\n", dline);
}

fn main() -> Result<()> {
    let args = Args::parse();

    let _logger = Logger::try_with_str(&args.log_level)
        .with_context(|| format!("Invalid log level '{}'", args.log_level))?
        .start()?;

    println!(
        "{}",
        text::banner(
            "Footprint Batch Engine",
            env!("CARGO_PKG_VERSION"),
            "Tool for applying sensor footprint transforms to directories of rasters.",
            env!("CARGO_PKG_AUTHORS"),
        )
    );

    let config = BatchConfig::from_args(&args)?;
    let files = process::discover_inputs(&config.input_dir, &config.pattern)?;
    if files.is_empty() {
        anyhow::bail!(
            "No files ending with '{}' found in {}",
            config.pattern,
            config.input_dir.display()
        );
    }
    let workers = schedule::resolve_workers(config.jobs, files.len());
    print_configuration(&config, files.len(), workers);

    let mask = match &config.mask_file {
        Some(path) => {
            let grid = MaskGrid::read(path, config.extents)?;
            println!("{} Mask loaded ({}x{}).", text::check_icon(), grid.dim().0, grid.dim().1);
            Some(grid)
        }
        None => None,
    };

    let n_files = files.len();
    let progress = Mutex::new(0usize);
    print!("Transforming rasters...");
    let _ = std::io::stdout().flush();

    let failures = schedule::run_partitioned(n_files, workers, |worker, item| {
        let input = &files[item];
        log::info!(
            "Operating on {} (file {} of {}) in worker {}",
            input.display(),
            item + 1,
            n_files,
            worker
        );
        process::process_file(input, &config, mask.as_ref())?;

        if let Ok(mut count) = progress.lock() {
            *count += 1;
            let term = Term::stdout();
            let _ = term.clear_line();
            print!("\rTransforming rasters... {:.0}%", (*count as f32 / n_files as f32) * 100.0);
            let _ = std::io::stdout().flush();
        }
        Ok(())
    });
    drop(mask);
    println!();

    if !failures.is_empty() {
        for failure in &failures {
            let name = failure
                .item
                .map_or("<unknown>".to_string(), |i| files[i].display().to_string());
            eprintln!(
                "{} {} worker {} failed on {}: {:#}",
                text::cross_icon(),
                text::error("Error"),
                failure.worker,
                name,
                failure.error
            );
        }
        anyhow::bail!("{} of {} workers failed", failures.len(), workers);
    }

    println!(
        "{} All {} rasters written to {}.",
        text::check_icon(),
        n_files,
        config.output_dir.display()
    );
    println!("{}", text::success("Footprint batch completed."));
    Ok(())
}
