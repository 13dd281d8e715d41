//! rastile-blocks - run the threshold mask over a GeoTIFF block by block

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rastile_algorithms::ThresholdMask;
use rastile_cli::{parse_or_help, parse_size, progress_bar, setup_logging};
use rastile_parallel::{process_geotiff, PipelineParams};

#[derive(Parser)]
#[command(name = "rastile-blocks")]
#[command(version, about = "Block-wise threshold mask of a large GeoTIFF", long_about = None)]
struct Cli {
    /// Input GeoTIFF
    input: PathBuf,

    /// Output single-band mask GeoTIFF
    output: PathBuf,

    /// Block interior, N or HxW
    #[arg(long, value_parser = parse_size, default_value = "512")]
    sample_size: (usize, usize),

    /// Working resolution the mask is computed at, N or HxW
    #[arg(long, value_parser = parse_size)]
    resize: Option<(usize, usize)>,

    /// Context border around each block
    #[arg(long, default_value_t = 128)]
    bound: usize,

    /// Brightness threshold
    #[arg(long, default_value_t = 128)]
    threshold: u8,

    /// Erosion kernel size for separating touching regions
    #[arg(long)]
    erode: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli: Cli = parse_or_help();
    setup_logging(cli.verbose);

    let mask = ThresholdMask {
        threshold: cli.threshold,
        erosion: cli.erode,
        ..Default::default()
    };
    let params = PipelineParams {
        sample_size: cli.sample_size,
        sample_resize: cli.resize,
        bound: cli.bound,
    };

    let start = Instant::now();
    let pb = progress_bar(0, "Processing blocks");
    process_geotiff(&cli.input, &cli.output, &mask, params, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })
    .context("Block processing failed")?;
    pb.finish_and_clear();

    println!("Mask saved to: {}", cli.output.display());
    println!("  Processing time: {:.2?}", start.elapsed());
    Ok(())
}
