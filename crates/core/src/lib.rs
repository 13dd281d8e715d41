//! # Rastile Core
//!
//! Core types and I/O shared by the rastile crates.
//!
//! This crate provides:
//! - `Raster<T>` / `BandedRaster<T>`: single and multi band raster grids
//! - `GeoTransform`: affine pixel-to-world transform, inverse and world files
//! - `CRS` and `CoordTransformer`: coordinate reference systems and reprojection
//! - `slippy`: slippy-map tile math and spherical mercator
//! - `PixelBuffer`: 8-bit interleaved image buffer tagged with its channel layout
//! - GeoTIFF reading/writing and boundless windowed block I/O

pub mod cancel;
pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use cancel::CancelFlag;
pub use crs::slippy::{self, TileId, TileRange};
pub use crs::{CoordTransformer, CRS};
pub use error::{Error, Result};
pub use raster::{BandedRaster, GeoTransform, PixelBuffer, PixelLayout, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cancel::CancelFlag;
    pub use crate::crs::slippy::{TileId, TileRange};
    pub use crate::crs::{CoordTransformer, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::raster::{
        BandedRaster, GeoTransform, PixelBuffer, PixelLayout, Raster, RasterElement,
    };
}
