//! Raster data structures and operations

mod banded;
mod element;
mod geotransform;
mod grid;
mod pixels;

pub use banded::BandedRaster;
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::Raster;
pub use pixels::{PixelBuffer, PixelLayout};
