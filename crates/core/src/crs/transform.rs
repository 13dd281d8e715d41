//! Point reprojection between two CRS.
//!
//! Geographic coordinates are `(lon, lat)` in degrees, projected ones
//! `(easting, northing)` in CRS units.

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use super::slippy::{lat_lon_to_mercator, mercator_to_lat_lon};
use super::CRS;
use crate::error::{Error, Result};

enum Strategy {
    Identity,
    /// EPSG:3857 -> EPSG:4326 with closed-form spherical mercator
    MercatorToGeographic,
    /// EPSG:4326 -> EPSG:3857 with closed-form spherical mercator
    GeographicToMercator,
    Proj {
        source: Box<Proj>,
        target: Box<Proj>,
        source_is_geographic: bool,
        target_is_geographic: bool,
    },
}

/// Reusable transformer from one CRS to another.
pub struct CoordTransformer {
    source: CRS,
    target: CRS,
    strategy: Strategy,
}

impl std::fmt::Debug for CoordTransformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordTransformer")
            .field("source", &self.source.identifier())
            .field("target", &self.target.identifier())
            .finish_non_exhaustive()
    }
}

impl CoordTransformer {
    pub fn new(source: &CRS, target: &CRS) -> Result<Self> {
        let strategy = if source.is_equivalent(target) {
            Strategy::Identity
        } else if source.is_web_mercator() && target.is_wgs84() {
            Strategy::MercatorToGeographic
        } else if source.is_wgs84() && target.is_web_mercator() {
            Strategy::GeographicToMercator
        } else {
            let source_proj = build_proj(source)?;
            let target_proj = build_proj(target)?;
            Strategy::Proj {
                source: Box::new(source_proj),
                target: Box::new(target_proj),
                source_is_geographic: source.is_geographic(),
                target_is_geographic: target.is_geographic(),
            }
        };

        Ok(Self {
            source: source.clone(),
            target: target.clone(),
            strategy,
        })
    }

    /// Transformer from `source` to WGS84 `(lon, lat)`.
    pub fn to_wgs84(source: &CRS) -> Result<Self> {
        Self::new(source, &CRS::wgs84())
    }

    /// Transformer from WGS84 `(lon, lat)` to `target`.
    pub fn from_wgs84(target: &CRS) -> Result<Self> {
        Self::new(&CRS::wgs84(), target)
    }

    pub fn source(&self) -> &CRS {
        &self.source
    }

    pub fn target(&self) -> &CRS {
        &self.target
    }

    /// Transform a single point.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match &self.strategy {
            Strategy::Identity => Ok((x, y)),
            Strategy::MercatorToGeographic => {
                let (lat, lon) = mercator_to_lat_lon(x, y);
                Ok((lon, lat))
            }
            Strategy::GeographicToMercator => Ok(lat_lon_to_mercator(y, x)),
            Strategy::Proj {
                source,
                target,
                source_is_geographic,
                target_is_geographic,
            } => {
                // proj4rs works in radians for geographic coordinates
                let mut point = if *source_is_geographic {
                    (x.to_radians(), y.to_radians(), 0.0)
                } else {
                    (x, y, 0.0)
                };
                transform(source, target, &mut point).map_err(|e| {
                    Error::Projection(format!(
                        "{} -> {} failed at ({}, {}): {:?}",
                        self.source, self.target, x, y, e
                    ))
                })?;
                if *target_is_geographic {
                    Ok((point.0.to_degrees(), point.1.to_degrees()))
                } else {
                    Ok((point.0, point.1))
                }
            }
        }
    }
}

fn build_proj(crs: &CRS) -> Result<Proj> {
    let definition = crs.to_proj_string()?;
    Proj::from_proj_string(&definition)
        .map_err(|e| Error::Projection(format!("invalid definition for {}: {:?}", crs, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity() {
        let t = CoordTransformer::new(&CRS::from_epsg(32630), &CRS::from_epsg(32630)).unwrap();
        assert_eq!(t.transform(500_000.0, 4_000_000.0).unwrap(), (500_000.0, 4_000_000.0));
    }

    #[test]
    fn test_mercator_fast_paths() {
        let fwd = CoordTransformer::from_wgs84(&CRS::web_mercator()).unwrap();
        let inv = CoordTransformer::to_wgs84(&CRS::web_mercator()).unwrap();

        let (x, y) = fwd.transform(180.0, 0.0).unwrap();
        assert_relative_eq!(x, 20_037_508.342_789_244, epsilon = 1e-6);
        assert_relative_eq!(y, 0.0, epsilon = 1e-6);

        let (lon, lat) = inv.transform(x, 1_000_000.0).unwrap();
        assert_relative_eq!(lon, 180.0, epsilon = 1e-9);
        let (_, y_back) = fwd.transform(lon, lat).unwrap();
        assert_relative_eq!(y_back, 1_000_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_utm_roundtrip() {
        let utm = CRS::from_epsg(32630);
        let to_utm = CoordTransformer::from_wgs84(&utm).unwrap();
        let to_geo = CoordTransformer::to_wgs84(&utm).unwrap();

        // Central meridian of zone 30N maps to the false easting
        let (e, n) = to_utm.transform(-3.0, 40.0).unwrap();
        assert_relative_eq!(e, 500_000.0, epsilon = 1e-3);
        assert!(n > 4_000_000.0 && n < 4_500_000.0);

        let (lon, lat) = to_geo.transform(e, n).unwrap();
        assert_relative_eq!(lon, -3.0, epsilon = 1e-7);
        assert_relative_eq!(lat, 40.0, epsilon = 1e-7);
    }

    #[test]
    fn test_unknown_crs_fails() {
        let wkt_only = CRS::from_wkt("LOCAL_CS[\"engineering\"]");
        assert!(CoordTransformer::to_wgs84(&wkt_only).is_err());
    }
}
