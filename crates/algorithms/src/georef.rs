//! Georeference and CRS resolution for rasters being tiled

use std::path::Path;

use rastile_core::io::{read_world_file, world_file_path};
use rastile_core::{BandedRaster, Error, GeoTransform, RasterElement, Result, CRS};
use tracing::{debug, warn};

/// Pixel-to-map transform for `raster` read from `path`.
///
/// A `.tfw` sidecar wins when it parses to an invertible transform;
/// otherwise the raster's embedded transform is used.
pub fn resolve_georeference<T: RasterElement>(path: &Path, raster: &BandedRaster<T>) -> Result<GeoTransform> {
    let tfw = world_file_path(path);
    if tfw.exists() {
        match read_world_file(&tfw) {
            Ok(gt) if gt.try_inverse().is_ok() => {
                debug!("Using world file {}", tfw.display());
                return Ok(gt);
            }
            Ok(_) => warn!("World file {} is singular, ignoring it", tfw.display()),
            Err(e) => warn!("Cannot use world file {}: {}", tfw.display(), e),
        }
    }

    let embedded = *raster.transform();
    embedded.try_inverse().map_err(|_| {
        Error::MissingGeoreference(format!(
            "{} (no usable world file, embedded transform is singular)",
            path.display()
        ))
    })?;
    Ok(embedded)
}

/// CRS for tiling: explicit override, then the raster's own, then EPSG:3857.
pub fn resolve_crs<T: RasterElement>(override_crs: Option<&str>, raster: &BandedRaster<T>) -> Result<CRS> {
    if let Some(text) = override_crs {
        return CRS::parse(text);
    }
    Ok(raster.crs().cloned().unwrap_or_else(CRS::web_mercator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rastile_core::io::write_world_file;

    #[test]
    fn test_world_file_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.tif");
        let raster = BandedRaster::<u8>::new(1, 4, 4).with_georef(GeoTransform::new(0.0, 0.0, 1.0, -1.0), None);

        assert_eq!(resolve_georeference(&path, &raster).unwrap(), *raster.transform());

        let tfw_gt = GeoTransform::new(100.0, 200.0, 0.25, -0.25);
        write_world_file(&world_file_path(&path), &tfw_gt).unwrap();
        assert_eq!(resolve_georeference(&path, &raster).unwrap(), tfw_gt);
    }

    #[test]
    fn test_malformed_world_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.tif");
        std::fs::write(world_file_path(&path), "not a world file").unwrap();

        let gt = GeoTransform::new(5.0, 6.0, 2.0, -2.0);
        let raster = BandedRaster::<u8>::new(1, 2, 2).with_georef(gt, None);
        assert_eq!(resolve_georeference(&path, &raster).unwrap(), gt);
    }

    #[test]
    fn test_singular_everywhere_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.tif");
        let raster = BandedRaster::<u8>::new(1, 2, 2).with_georef(GeoTransform::new(0.0, 0.0, 0.0, 0.0), None);
        assert!(matches!(
            resolve_georeference(&path, &raster),
            Err(Error::MissingGeoreference(_))
        ));
    }

    #[test]
    fn test_crs_order() {
        let plain = BandedRaster::<u8>::new(1, 1, 1);
        let tagged = plain.clone().with_georef(GeoTransform::default(), Some(CRS::from_epsg(32631)));

        assert_eq!(resolve_crs(Some("EPSG:4326"), &tagged).unwrap().epsg(), Some(4326));
        assert_eq!(resolve_crs(None, &tagged).unwrap().epsg(), Some(32631));
        assert_eq!(resolve_crs(None, &plain).unwrap().epsg(), Some(3857));
        assert!(resolve_crs(Some("garbage"), &plain).is_err());
    }
}
