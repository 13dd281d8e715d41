//! Shared helpers for the rastile command-line tools

use std::ops::RangeInclusive;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Deepest zoom whose tile indices fit the tile math
pub const MAX_ZOOM: u8 = 30;

pub fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: a global tracing subscriber is already installed");
    }
}

/// Parse arguments; on any error other than `--help`/`--version`, print the
/// error and the full help, then exit with status 1.
pub fn parse_or_help<C: Parser>() -> C {
    match C::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            eprintln!();
            let _ = C::command().print_help();
            std::process::exit(1);
        }
    }
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn progress_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(msg.to_string());
    pb
}

/// `LAT,LON` in decimal degrees
pub fn parse_lat_lon(s: &str) -> Result<(f64, f64)> {
    let (lat, lon) = s
        .split_once(',')
        .with_context(|| format!("expected LAT,LON, got '{}'", s))?;
    let lat: f64 = lat.trim().parse().with_context(|| format!("invalid latitude '{}'", lat))?;
    let lon: f64 = lon.trim().parse().with_context(|| format!("invalid longitude '{}'", lon))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        bail!("coordinate out of range: {},{}", lat, lon);
    }
    Ok((lat, lon))
}

/// `N` or `N-M` (inclusive)
pub fn parse_zoom_range(s: &str) -> Result<RangeInclusive<u8>> {
    let zoom = |v: &str| -> Result<u8> {
        let z: u8 = v.trim().parse().with_context(|| format!("invalid zoom level '{}'", v))?;
        if z > MAX_ZOOM {
            bail!("zoom level {} exceeds {}", z, MAX_ZOOM);
        }
        Ok(z)
    };

    let range = match s.split_once('-') {
        Some((lo, hi)) => zoom(lo)?..=zoom(hi)?,
        None => {
            let z = zoom(s)?;
            z..=z
        }
    };
    if range.is_empty() {
        bail!("empty zoom range '{}'", s);
    }
    Ok(range)
}

/// `N` for a square or `HxW`
pub fn parse_size(s: &str) -> Result<(usize, usize)> {
    let dim = |v: &str| -> Result<usize> {
        let n: usize = v.trim().parse().with_context(|| format!("invalid size '{}'", v))?;
        if n == 0 {
            bail!("size must be positive");
        }
        Ok(n)
    };
    match s.split_once(['x', 'X']) {
        Some((h, w)) => Ok((dim(h)?, dim(w)?)),
        None => {
            let n = dim(s)?;
            Ok((n, n))
        }
    }
}
