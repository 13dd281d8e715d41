//! rastile-mosaic - merge slippy-map tiles into one GeoTIFF

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rastile_cli::{parse_lat_lon, parse_or_help, progress_bar, setup_logging, MAX_ZOOM};
use rastile_cloud::{blocking, FetchOptions, HttpTileSource, MosaicOptions, TileFetcher, DEFAULT_TILE_URL};
use tracing::info;

#[derive(Parser)]
#[command(name = "rastile-mosaic")]
#[command(version, about = "Merge map tiles into a big GeoTIFF image", long_about = None)]
#[command(after_help = "The -f, -t and -z arguments are required")]
struct Cli {
    /// Tile server URL template with {z}, {x} and {y}
    #[arg(short, long, value_name = "URL", default_value = DEFAULT_TILE_URL)]
    source: String,

    /// One corner
    #[arg(short, long, value_name = "LAT,LON", value_parser = parse_lat_lon, allow_hyphen_values = true)]
    from: (f64, f64),

    /// The other corner
    #[arg(short, long, value_name = "LAT,LON", value_parser = parse_lat_lon, allow_hyphen_values = true)]
    to: (f64, f64),

    /// Zoom level
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=MAX_ZOOM as i64))]
    zoom: u8,

    /// Output GeoTIFF
    output: PathBuf,

    /// User-Agent header (a browser agent by default)
    #[arg(long)]
    user_agent: Option<String>,

    /// Tile requests in flight
    #[arg(long, default_value_t = 5)]
    concurrency: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli: Cli = parse_or_help();
    setup_logging(cli.verbose);

    let fetcher = TileFetcher::new(FetchOptions {
        user_agent: cli.user_agent,
        ..Default::default()
    })
    .context("Failed to create HTTP client")?;
    info!("User-Agent: {}", fetcher.user_agent());
    let source = HttpTileSource::new(cli.source, fetcher);

    let start = Instant::now();
    let pb = progress_bar(0, "Fetching tiles");
    let mosaic = blocking::build_mosaic_with_progress(
        &source,
        cli.from,
        cli.to,
        cli.zoom,
        &MosaicOptions {
            concurrency: cli.concurrency,
        },
        None,
        |done, total| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        },
    )
    .context("Failed to build mosaic")?;
    pb.finish_and_clear();

    mosaic.write(&cli.output).context("Failed to write output")?;

    println!(
        "Mosaic saved to: {} ({}x{})",
        cli.output.display(),
        mosaic.pixels.width(),
        mosaic.pixels.height()
    );
    println!("  Processing time: {:.2?}", start.elapsed());
    Ok(())
}
