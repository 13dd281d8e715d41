//! # Rastile Algorithms
//!
//! Per-pixel raster algorithms built on the core types.
//!
//! ## Modules
//!
//! - **split**: cut a georeferenced raster into reprojected slippy-map tiles
//! - **resample**: nearest and bilinear point sampling
//! - **georef**: world file / embedded transform and CRS resolution
//! - **masks**: reference block transforms (identity, threshold mask)

pub mod georef;
pub mod masks;
pub mod resample;
pub mod split;

pub use georef::{resolve_crs, resolve_georeference};
pub use masks::{erode_mask, IdentityTransform, ThresholdMask};
pub use resample::Resampling;
pub use split::{covering_range, render_tile, split_tiles, SplitParams, SplitReport};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::georef::{resolve_crs, resolve_georeference};
    pub use crate::masks::{IdentityTransform, ThresholdMask};
    pub use crate::resample::Resampling;
    pub use crate::split::{split_tiles, SplitParams, SplitReport};
    pub use rastile_core::prelude::*;
}
