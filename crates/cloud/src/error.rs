//! Error types for tile fetching and mosaic assembly.

use rastile_core::TileId;
use thiserror::Error;

/// Errors produced while fetching tiles or building a mosaic.
#[derive(Error, Debug)]
pub enum CloudError {
    /// Transport-level failure (connect, timeout, body read), after retries
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    Status { status: u16, url: String },

    #[error("cannot decode tile {tile}: {source}")]
    Decode {
        tile: TileId,
        #[source]
        source: image::ImageError,
    },

    #[error("no tile could be fetched for the requested area")]
    EmptyMosaic,

    #[error("mosaic build cancelled")]
    Cancelled,

    #[error("runtime error: {0}")]
    Runtime(String),

    #[error("core error: {0}")]
    Core(#[from] rastile_core::Error),
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
