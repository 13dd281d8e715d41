//! Affine geotransformation for rasters

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Affine transformation coefficients for georeferencing rasters.
///
/// Converts between pixel coordinates (col, row) and map coordinates (x, y):
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Pixel coordinates address pixel corners: `(0, 0)` is the outer corner of
/// the first pixel, `(0.5, 0.5)` its center. For north-up images the rotation
/// terms are 0 and `pixel_height` is negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel width (cell size in X direction)
    pub pixel_width: f64,
    /// Pixel height (cell size in Y direction, usually negative)
    pub pixel_height: f64,
    /// Contribution of the row index to x
    pub row_rotation: f64,
    /// Contribution of the column index to y
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Create a new GeoTransform with no rotation (north-up image)
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Create from GDAL-style array [origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// Convert to GDAL-style array
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// Create from the six lines of a world file, in file order `A D B E C F`.
    ///
    /// `C`/`F` are taken as the outer upper-left corner of the first pixel.
    pub fn from_world_file(lines: [f64; 6]) -> Self {
        let [a, d, b, e, c, f] = lines;
        Self {
            origin_x: c,
            origin_y: f,
            pixel_width: a,
            pixel_height: e,
            row_rotation: b,
            col_rotation: d,
        }
    }

    /// Coefficients in world-file order `A D B E C F`.
    pub fn to_world_file(&self) -> [f64; 6] {
        [
            self.pixel_width,
            self.col_rotation,
            self.row_rotation,
            self.pixel_height,
            self.origin_x,
            self.origin_y,
        ]
    }

    /// Row-major 3x3 augmented matrix.
    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.pixel_width, self.row_rotation, self.origin_x],
            [self.col_rotation, self.pixel_height, self.origin_y],
            [0.0, 0.0, 1.0],
        ]
    }

    pub fn determinant(&self) -> f64 {
        self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation
    }

    /// Apply the transform to fractional pixel coordinates.
    #[inline]
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Inverse transform, mapping map coordinates back to pixel coordinates
    /// through [`GeoTransform::apply`].
    pub fn try_inverse(&self) -> Result<GeoTransform> {
        let det = self.determinant();
        if det.abs() < 1e-15 || !det.is_finite() {
            return Err(Error::SingularTransform { determinant: det });
        }

        let a = self.pixel_height / det;
        let b = -self.row_rotation / det;
        let d = -self.col_rotation / det;
        let e = self.pixel_width / det;

        Ok(GeoTransform {
            origin_x: -(a * self.origin_x + b * self.origin_y),
            origin_y: -(d * self.origin_x + e * self.origin_y),
            pixel_width: a,
            pixel_height: e,
            row_rotation: b,
            col_rotation: d,
        })
    }

    /// Map coordinates of a pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Map coordinates of a pixel's upper-left corner
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.apply(col as f64, row as f64)
    }

    /// Convert map coordinates to fractional pixel coordinates.
    ///
    /// Returns NaN for a degenerate transform.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        match self.try_inverse() {
            Ok(inv) => inv.apply(x, y),
            Err(_) => (f64::NAN, f64::NAN),
        }
    }

    /// Check if this is a north-up image (no rotation)
    pub fn is_north_up(&self) -> bool {
        self.row_rotation.abs() < 1e-10
            && self.col_rotation.abs() < 1e-10
            && self.pixel_height < 0.0
    }

    /// Map coordinates of the four outer corners of a `width x height`
    /// raster: upper-left, upper-right, lower-left, lower-right.
    pub fn corners(&self, width: usize, height: usize) -> [(f64, f64); 4] {
        let (w, h) = (width as f64, height as f64);
        [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(0.0, h),
            self.apply(w, h),
        ]
    }

    /// Calculate the bounding box `(min_x, min_y, max_x, max_y)` for a
    /// raster of given dimensions
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = self.corners(width, height);
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
