//! rastile-split - cut a GeoTIFF into slippy-map tiles

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rastile_algorithms::{resolve_crs, resolve_georeference, split_tiles, Resampling, SplitParams};
use rastile_cli::{parse_or_help, parse_zoom_range, setup_logging, spinner};
use rastile_core::io::read_geotiff_bands;
use rastile_core::BandedRaster;
use rastile_parallel::ProcessingMode;
use tracing::info;

#[derive(Parser)]
#[command(name = "rastile-split")]
#[command(version, about = "Split a GeoTIFF image into map tiles", long_about = None)]
struct Cli {
    /// Zoom level(s), eg. 15 or 14-17
    #[arg(short, long, value_parser = parse_zoom_range)]
    zoom: RangeInclusive<u8>,

    /// Tile file name with {z}, {x} and {y}; the extension selects the format
    #[arg(short, long, default_value = "{z}_{x}_{y}.png")]
    name: String,

    /// Tile size in pixels
    #[arg(short, long, default_value_t = 256)]
    size: u32,

    /// Projection of the input (EPSG:n, PROJ string or WKT)
    #[arg(short, long)]
    proj: Option<String>,

    /// Worker threads (all cores by default)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Resampling: nearest or bilinear
    #[arg(long, default_value = "bilinear")]
    resampling: Resampling,

    /// Input GeoTIFF
    inputfile: PathBuf,

    /// Output directory
    outputdir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli: Cli = parse_or_help();
    setup_logging(cli.verbose);

    let pb = spinner("Reading raster...");
    let mut raster: BandedRaster<u8> = read_geotiff_bands(&cli.inputfile).context("Failed to read raster")?;
    pb.finish_and_clear();
    info!(
        "Input: {} x {}, {} bands",
        raster.cols(),
        raster.rows(),
        raster.band_count()
    );

    let transform = resolve_georeference(&cli.inputfile, &raster).context("Failed to georeference input")?;
    raster.set_transform(transform);
    let crs = resolve_crs(cli.proj.as_deref(), &raster).context("Invalid projection")?;
    info!("CRS: {}", crs);

    let start = Instant::now();
    let mut written = 0;
    for zoom in cli.zoom.clone() {
        let params = SplitParams {
            zoom,
            tile_size: cli.size,
            name_template: cli.name.clone(),
            resampling: cli.resampling,
            mode: ProcessingMode::from_threads(cli.threads),
        };

        let pb = spinner(&format!("Zoom {}...", zoom));
        let report = split_tiles(&raster, &crs, &cli.outputdir, &params, None)
            .with_context(|| format!("Failed to split zoom level {}", zoom))?;
        pb.finish_and_clear();

        println!("Zoom {}: {} tiles", zoom, report.written.len());
        written += report.written.len();
    }

    println!("{} tiles saved to: {}", written, cli.outputdir.display());
    println!("  Processing time: {:.2?}", start.elapsed());
    Ok(())
}
