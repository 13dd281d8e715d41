//! Blocking (synchronous) API.
//!
//! Wraps the async mosaic build in a single-threaded Tokio runtime so callers
//! don't need to manage their own.

use rastile_core::CancelFlag;

use crate::error::{CloudError, Result};
use crate::mosaic::{self, Mosaic, MosaicOptions};
use crate::source::TileSource;

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CloudError::Runtime(e.to_string()))
}

/// Blocking [`mosaic::build_mosaic`].
pub fn build_mosaic<S: TileSource>(
    source: &S,
    from: (f64, f64),
    to: (f64, f64),
    zoom: u8,
    options: &MosaicOptions,
    cancel: Option<&CancelFlag>,
) -> Result<Mosaic> {
    runtime()?.block_on(mosaic::build_mosaic(source, from, to, zoom, options, cancel))
}

/// Blocking [`mosaic::build_mosaic_with_progress`].
pub fn build_mosaic_with_progress<S, P>(
    source: &S,
    from: (f64, f64),
    to: (f64, f64),
    zoom: u8,
    options: &MosaicOptions,
    cancel: Option<&CancelFlag>,
    progress: P,
) -> Result<Mosaic>
where
    S: TileSource,
    P: FnMut(usize, usize),
{
    runtime()?.block_on(mosaic::build_mosaic_with_progress(
        source, from, to, zoom, options, cancel, progress,
    ))
}
