//! Slippy-map tile math and spherical (pseudo) mercator.
//!
//! Tile coordinates follow the XYZ scheme: `x` grows eastwards from the
//! antimeridian, `y` grows southwards from the northern mercator limit, and
//! zoom `z` splits the world into `2^z x 2^z` tiles. Fractional tile
//! coordinates address positions inside a tile.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis used by EPSG:3857 (m)
pub const EARTH_EQUATORIAL_RADIUS: f64 = 6_378_137.0;

/// Edge length of the most common slippy-map tile
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Number of tiles along one axis at `zoom`
pub fn tiles_per_axis(zoom: u8) -> f64 {
    2f64.powi(zoom as i32)
}

/// Geodetic position to fractional tile coordinates `(x, y)`.
pub fn deg2num(lat: f64, lon: f64, zoom: u8) -> (f64, f64) {
    let lat_r = lat.to_radians();
    let n = tiles_per_axis(zoom);
    let x = (lon + 180.0) / 360.0 * n;
    let y = (1.0 - (lat_r.tan() + 1.0 / lat_r.cos()).ln() / PI) / 2.0 * n;
    (x, y)
}

/// Fractional tile coordinates to a geodetic position `(lat, lon)`.
pub fn num2deg(x: f64, y: f64, zoom: u8) -> (f64, f64) {
    let n = tiles_per_axis(zoom);
    let lat = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    let lon = x / n * 360.0 - 180.0;
    (lat, lon)
}

/// Geodetic position to EPSG:3857 meters `(x, y)`.
pub fn lat_lon_to_mercator(lat: f64, lon: f64) -> (f64, f64) {
    let x = lon.to_radians() * EARTH_EQUATORIAL_RADIUS;
    let y = (45.0 + lat / 2.0).to_radians().tan().ln() * EARTH_EQUATORIAL_RADIUS;
    (x, y)
}

/// EPSG:3857 meters to a geodetic position `(lat, lon)`.
pub fn mercator_to_lat_lon(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_EQUATORIAL_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_EQUATORIAL_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lat, lon)
}

/// Integer tile address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Substitute `{z}`, `{x}` and `{y}` in a URL or file-name template.
    pub fn format_template(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Fractional tile-space box with normalized corners (`x0 <= x1`, `y0 <= y1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBox {
    pub zoom: u8,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl TileBox {
    /// Build from two fractional corners in any order.
    pub fn from_corners(zoom: u8, a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            zoom,
            x0: a.0.min(b.0),
            y0: a.1.min(b.1),
            x1: a.0.max(b.0),
            y1: a.1.max(b.1),
        }
    }

    /// Build from two geodetic corners `(lat, lon)` in any order.
    pub fn from_lat_lon(zoom: u8, a: (f64, f64), b: (f64, f64)) -> Self {
        Self::from_corners(zoom, deg2num(a.0, a.1, zoom), deg2num(b.0, b.1, zoom))
    }

    /// Smallest integer tile range covering the box.
    pub fn covering_range(&self) -> TileRange {
        let limit = tiles_per_axis(self.zoom);
        let clamp = |v: f64| v.clamp(0.0, limit) as u32;
        TileRange {
            zoom: self.zoom,
            x_min: clamp(self.x0.floor()),
            y_min: clamp(self.y0.floor()),
            x_max: clamp(self.x1.ceil()),
            y_max: clamp(self.y1.ceil()),
        }
    }
}

/// Integer tile range `[x_min, x_max) x [y_min, y_max)` at one zoom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl TileRange {
    /// Number of tile columns
    pub fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min)
    }

    /// Number of tile rows
    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    pub fn len(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tiles in enumeration order: x-major, then y.
    pub fn tiles(&self) -> impl Iterator<Item = TileId> + '_ {
        (self.x_min..self.x_max)
            .flat_map(move |x| (self.y_min..self.y_max).map(move |y| TileId::new(self.zoom, x, y)))
    }

    /// Tile-index distance of `tile` from the range minimum, or `None` if the
    /// tile lies outside the range.
    pub fn offset_of(&self, tile: &TileId) -> Option<(u32, u32)> {
        if tile.z != self.zoom
            || tile.x < self.x_min
            || tile.x >= self.x_max
            || tile.y < self.y_min
            || tile.y >= self.y_max
        {
            return None;
        }
        Some((tile.x - self.x_min, tile.y - self.y_min))
    }
}
