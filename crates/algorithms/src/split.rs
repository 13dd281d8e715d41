//! Tile splitter: cut a georeferenced raster into slippy-map tiles.
//!
//! ```text
//! raster px --affine--> source CRS --proj--> lon/lat --> tile range
//! tile px --> lon/lat --proj--> source CRS --inverse affine--> raster px
//! ```
//!
//! Every tile is rendered independently on a dedicated worker pool.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array3, Axis};
use rastile_core::crs::slippy::{num2deg, TileBox};
use rastile_core::{
    BandedRaster, CancelFlag, CoordTransformer, Error, GeoTransform, PixelBuffer, RasterElement, Result,
    TileId, TileRange, CRS,
};
use rastile_parallel::{ParallelStrategy, ProcessingMode};
use tracing::{debug, error, info};

use crate::resample::Resampling;

/// Highest band count a tile image can carry (RGBA)
pub const MAX_BANDS: usize = 4;

/// Tile splitter configuration
#[derive(Debug, Clone)]
pub struct SplitParams {
    pub zoom: u8,
    /// Tile edge length in pixels
    pub tile_size: u32,
    /// Output file name relative to the output directory, with `{z}`, `{x}`
    /// and `{y}` placeholders. The extension selects the encoder.
    pub name_template: String,
    pub resampling: Resampling,
    pub mode: ProcessingMode,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            zoom: 0,
            tile_size: 256,
            name_template: "{z}_{x}_{y}.png".to_string(),
            resampling: Resampling::default(),
            mode: ProcessingMode::default(),
        }
    }
}

/// Outcome of one zoom level
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub zoom: u8,
    pub range: TileRange,
    /// Written files, in tile enumeration order
    pub written: Vec<PathBuf>,
}

enum TileOutcome {
    Written(PathBuf),
    Failed(Error),
    Skipped,
}

/// Fill value outside the source extent: white for colour bands, zero for
/// alpha/mask bands.
pub fn fill_value(band: usize) -> f64 {
    if band < 3 {
        255.0
    } else {
        0.0
    }
}

/// Integer tile range at `zoom` covering the raster's footprint.
///
/// All four corners are reprojected, so rotated rasters and oblique
/// projections are covered.
pub fn covering_range(
    transform: &GeoTransform,
    crs: &CRS,
    rows: usize,
    cols: usize,
    zoom: u8,
) -> Result<TileRange> {
    let to_geo = CoordTransformer::to_wgs84(crs)?;

    let mut min = (f64::INFINITY, f64::INFINITY);
    let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (x, y) in transform.corners(cols, rows) {
        let (lon, lat) = to_geo.transform(x, y)?;
        min = (min.0.min(lat), min.1.min(lon));
        max = (max.0.max(lat), max.1.max(lon));
    }

    Ok(TileBox::from_lat_lon(zoom, min, max).covering_range())
}

/// Render one tile into an interleaved buffer with one channel per band.
pub fn render_tile<T: RasterElement>(
    src: &BandedRaster<T>,
    inverse: &GeoTransform,
    from_geo: &CoordTransformer,
    tile: TileId,
    size: u32,
    resampling: Resampling,
) -> Result<PixelBuffer> {
    let size = size as usize;
    let bands = src.band_count();
    let mut out = Array3::<u8>::zeros((bands, size, size));
    let views: Vec<_> = src.data().axis_iter(Axis(0)).collect();

    for row in 0..size {
        let ty = tile.y as f64 + (row as f64 + 0.5) / size as f64;
        for col in 0..size {
            let tx = tile.x as f64 + (col as f64 + 0.5) / size as f64;
            let (lat, lon) = num2deg(tx, ty, tile.z);
            // Points outside the source projection's domain read as fill
            let (px, py) = match from_geo.transform(lon, lat) {
                Ok((x, y)) => inverse.apply(x, y),
                Err(_) => (f64::NAN, f64::NAN),
            };

            for (b, band) in views.iter().enumerate() {
                let v = resampling.sample(band, px, py, fill_value(b));
                out[(b, row, col)] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    PixelBuffer::from_bands(out.view())
}

fn write_tile(buffer: &PixelBuffer, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    buffer.to_dynamic()?.save(path)?;
    Ok(())
}

/// Split `src` into tiles at one zoom level and write them under `out_dir`.
///
/// The first failing tile raises `cancel` (a private flag when `None`), so
/// tiles that have not started yet are skipped. Any failure fails the whole
/// level with [`Error::TileFailures`].
pub fn split_tiles<T: RasterElement>(
    src: &BandedRaster<T>,
    crs: &CRS,
    out_dir: &Path,
    params: &SplitParams,
    cancel: Option<&CancelFlag>,
) -> Result<SplitReport> {
    let bands = src.band_count();
    if bands == 0 || bands > MAX_BANDS {
        return Err(Error::InvalidParameter {
            name: "bands",
            value: bands.to_string(),
            reason: format!("tiles carry 1 to {} bands", MAX_BANDS),
        });
    }
    if params.tile_size == 0 {
        return Err(Error::InvalidParameter {
            name: "tile_size",
            value: "0".to_string(),
            reason: "tile size must be positive".to_string(),
        });
    }

    let transform = *src.transform();
    let inverse = transform.try_inverse()?;
    let range = covering_range(&transform, crs, src.rows(), src.cols(), params.zoom)?;
    let tiles: Vec<TileId> = range.tiles().collect();
    let total = tiles.len();

    info!(
        "Zoom {}: {} tiles (x {}..{}, y {}..{}) on {} workers",
        params.zoom,
        total,
        range.x_min,
        range.x_max,
        range.y_min,
        range.y_max,
        params.mode.num_threads()
    );

    let flag = cancel.cloned().unwrap_or_default();

    let outcomes = params.mode.par_map(0..total, |i| {
        if flag.is_cancelled() {
            return TileOutcome::Skipped;
        }
        let tile = tiles[i];
        let path = out_dir.join(tile.format_template(&params.name_template));

        let result = CoordTransformer::from_wgs84(crs)
            .and_then(|from_geo| {
                render_tile(src, &inverse, &from_geo, tile, params.tile_size, params.resampling)
            })
            .and_then(|buffer| write_tile(&buffer, &path));

        match result {
            Ok(()) => TileOutcome::Written(path),
            Err(e) => {
                flag.cancel();
                TileOutcome::Failed(e)
            }
        }
    })?;

    let mut written = Vec::with_capacity(total);
    let mut failed = 0;
    let mut skipped = 0;
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            TileOutcome::Written(path) => {
                debug!("Tile {}/{} {} -> {}", i + 1, total, tiles[i], path.display());
                written.push(path);
            }
            TileOutcome::Failed(e) => {
                error!("Tile {} failed: {}", tiles[i], e);
                failed += 1;
            }
            TileOutcome::Skipped => skipped += 1,
        }
    }

    if failed > 0 {
        return Err(Error::TileFailures {
            zoom: params.zoom,
            failed,
            total,
        });
    }
    if skipped > 0 {
        return Err(Error::Cancelled);
    }

    info!("Zoom {}: wrote {} tiles", params.zoom, written.len());
    Ok(SplitReport {
        zoom: params.zoom,
        range,
        written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rastile_core::slippy::{tiles_per_axis, EARTH_EQUATORIAL_RADIUS};
    use std::f64::consts::PI;

    /// A raster in EPSG:3857 covering tile (z, x, y) with `n x n` pixels,
    /// shrunk by `inset` meters on every side.
    fn over_tile(z: u8, x: u32, y: u32, n: usize, bands: usize, inset: f64) -> BandedRaster<u8> {
        let world = 2.0 * PI * EARTH_EQUATORIAL_RADIUS;
        let tile_m = world / tiles_per_axis(z);
        let origin_x = -world / 2.0 + x as f64 * tile_m + inset;
        let origin_y = world / 2.0 - y as f64 * tile_m - inset;
        let px = (tile_m - 2.0 * inset) / n as f64;

        let data = Array3::from_shape_fn((bands, n, n), |(b, r, c)| ((r + c + 40 * b) % 200) as u8);
        BandedRaster::from_array(data).with_georef(
            GeoTransform::new(origin_x, origin_y, px, -px),
            Some(CRS::web_mercator()),
        )
    }

    #[test]
    fn test_covering_range_of_tile_footprint() {
        let src = over_tile(6, 33, 21, 64, 3, 10.0);
        let range = covering_range(src.transform(), &CRS::web_mercator(), 64, 64, 6).unwrap();
        assert_eq!((range.x_min, range.x_max, range.y_min, range.y_max), (33, 34, 21, 22));

        let deeper = covering_range(src.transform(), &CRS::web_mercator(), 64, 64, 8).unwrap();
        assert_eq!((deeper.width(), deeper.height()), (4, 4));
        assert_eq!((deeper.x_min, deeper.y_min), (132, 84));
    }

    #[test]
    fn test_render_aligned_tile_nearest() {
        let src = over_tile(5, 10, 12, 32, 3, 0.0);
        let inverse = src.transform().try_inverse().unwrap();
        let from_geo = CoordTransformer::from_wgs84(&CRS::web_mercator()).unwrap();

        let tile = render_tile(&src, &inverse, &from_geo, TileId::new(5, 10, 12), 32, Resampling::Nearest).unwrap();
        assert_eq!(&tile.to_bands(), src.data());
    }

    #[test]
    fn test_fill_outside_source() {
        let src = over_tile(5, 10, 12, 8, 4, 0.0);
        let inverse = src.transform().try_inverse().unwrap();
        let from_geo = CoordTransformer::from_wgs84(&CRS::web_mercator()).unwrap();

        // Neighbouring tile lies entirely outside the source
        let tile = render_tile(&src, &inverse, &from_geo, TileId::new(5, 11, 12), 8, Resampling::Bilinear).unwrap();
        assert_eq!(tile.pixel(3, 3).unwrap(), &[255, 255, 255, 0]);
    }

    #[test]
    fn test_unprojectable_pixels_are_filled() {
        // Geostationary view: the far side of the globe has no coordinates
        let geos = CRS::parse("+proj=geos +h=35785831 +lon_0=0 +datum=WGS84 +units=m +no_defs").unwrap();
        let src = BandedRaster::from_array(Array3::from_elem((1, 8, 8), 100u8)).with_georef(
            GeoTransform::new(-3_000_000.0, 3_000_000.0, 750_000.0, -750_000.0),
            Some(geos.clone()),
        );
        let inverse = src.transform().try_inverse().unwrap();
        let from_geo = CoordTransformer::from_wgs84(&geos).unwrap();

        let tile = render_tile(&src, &inverse, &from_geo, TileId::new(0, 0, 0), 16, Resampling::Nearest).unwrap();
        assert_eq!(tile.pixel(0, 0).unwrap(), &[255]);
        assert_eq!(tile.pixel(8, 8).unwrap(), &[100]);
    }

    #[test]
    fn test_split_writes_named_tiles() {
        let dir = tempfile::tempdir().unwrap();
        let src = over_tile(4, 3, 5, 32, 3, 10.0);
        let params = SplitParams {
            zoom: 5,
            tile_size: 16,
            name_template: "{z}/{x}/{y}.png".to_string(),
            mode: ProcessingMode::ParallelWith(2),
            ..Default::default()
        };

        let report = split_tiles(&src, &CRS::web_mercator(), dir.path(), &params, None).unwrap();
        assert_eq!(report.range.len(), 4);
        assert_eq!(report.written.len(), 4);
        assert_eq!(report.written[0], dir.path().join("5/6/10.png"));
        assert_eq!(report.written[1], dir.path().join("5/6/11.png"));
        for path in &report.written {
            let img = image::open(path).unwrap();
            assert_eq!((img.width(), img.height()), (16, 16));
        }
    }

    #[test]
    fn test_too_many_bands_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = BandedRaster::<u8>::new(5, 4, 4);
        assert!(split_tiles(&src, &CRS::web_mercator(), dir.path(), &SplitParams::default(), None).is_err());
    }

    #[test]
    fn test_singular_transform_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = BandedRaster::<u8>::new(3, 4, 4).with_georef(GeoTransform::new(0.0, 0.0, 0.0, 0.0), None);
        let err = split_tiles(&src, &CRS::web_mercator(), dir.path(), &SplitParams::default(), None).unwrap_err();
        assert!(matches!(err, Error::SingularTransform { .. }));
    }

    #[test]
    fn test_unwritable_format_fails_level() {
        let dir = tempfile::tempdir().unwrap();
        let src = over_tile(3, 1, 1, 8, 3, 10.0);
        let params = SplitParams {
            zoom: 3,
            tile_size: 8,
            name_template: "{z}_{x}_{y}.unknownext".to_string(),
            mode: ProcessingMode::Sequential,
            ..Default::default()
        };
        let flag = CancelFlag::new();
        let err = split_tiles(&src, &CRS::web_mercator(), dir.path(), &params, Some(&flag)).unwrap_err();
        assert!(matches!(err, Error::TileFailures { zoom: 3, failed: 1, total: 1 }));
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_pre_cancelled_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let src = over_tile(3, 1, 1, 8, 3, 10.0);
        let flag = CancelFlag::new();
        flag.cancel();
        let params = SplitParams {
            zoom: 3,
            tile_size: 8,
            ..Default::default()
        };
        let err = split_tiles(&src, &CRS::web_mercator(), dir.path(), &params, Some(&flag)).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
