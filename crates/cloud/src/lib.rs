//! # Rastile Cloud
//!
//! Slippy-map tile fetching and mosaic assembly.
//!
//! This crate provides:
//! - `TileFetcher`: HTTP GET with timeout, retry and a fixed user agent
//! - `TileSource`: anything that yields encoded tiles (`HttpTileSource` for URL templates)
//! - `build_mosaic`: ordered, bounded-concurrency stitching into one EPSG:3857 image
//! - `blocking`: the same entry points on an internal runtime

pub mod blocking;
pub mod error;
pub mod http;
pub mod mosaic;
pub mod source;

pub use error::{CloudError, Result};
pub use http::{FetchOptions, TileFetcher, USER_AGENTS};
pub use mosaic::{build_mosaic, build_mosaic_with_progress, write_mosaic, Mosaic, MosaicOptions};
pub use source::{HttpTileSource, TileSource, DEFAULT_TILE_URL};
