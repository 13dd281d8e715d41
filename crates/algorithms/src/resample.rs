//! Point sampling of a raster band at fractional pixel positions
//!
//! Positions use corner coordinates: `(0.0, 0.0)` is the outer corner of the
//! first pixel and `(0.5, 0.5)` its center, matching [`GeoTransform::apply`].
//! Positions outside `[0, cols) x [0, rows)` return the fill value.
//!
//! [`GeoTransform::apply`]: rastile_core::GeoTransform::apply

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;
use rastile_core::{Error, RasterElement};

/// Resampling method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    /// Value of the pixel containing the position
    Nearest,
    /// Linear blend of the 4 surrounding pixel centers, clamped at the edge
    #[default]
    Bilinear,
}

impl Resampling {
    /// Sample `band` at `(col, row)`.
    #[inline]
    pub fn sample<T: RasterElement>(&self, band: &ArrayView2<'_, T>, col: f64, row: f64, fill: f64) -> f64 {
        let (rows, cols) = band.dim();
        if !(col >= 0.0 && row >= 0.0 && col < cols as f64 && row < rows as f64) {
            return fill;
        }

        match self {
            Resampling::Nearest => value(band, row as usize, col as usize),
            Resampling::Bilinear => {
                let fx = col - 0.5;
                let fy = row - 0.5;
                let x0 = fx.floor();
                let y0 = fy.floor();
                let wx = fx - x0;
                let wy = fy - y0;

                let clamp_c = |c: f64| c.clamp(0.0, (cols - 1) as f64) as usize;
                let clamp_r = |r: f64| r.clamp(0.0, (rows - 1) as f64) as usize;
                let (c0, c1) = (clamp_c(x0), clamp_c(x0 + 1.0));
                let (r0, r1) = (clamp_r(y0), clamp_r(y0 + 1.0));

                let top = value(band, r0, c0) * (1.0 - wx) + value(band, r0, c1) * wx;
                let bottom = value(band, r1, c0) * (1.0 - wx) + value(band, r1, c1) * wx;
                top * (1.0 - wy) + bottom * wy
            }
        }
    }
}

#[inline]
fn value<T: RasterElement>(band: &ArrayView2<'_, T>, row: usize, col: usize) -> f64 {
    band[(row, col)].to_f64().unwrap_or(0.0)
}

impl FromStr for Resampling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "near" => Ok(Resampling::Nearest),
            "bilinear" | "linear" => Ok(Resampling::Bilinear),
            other => Err(Error::InvalidParameter {
                name: "resampling",
                value: other.to_string(),
                reason: "expected nearest or bilinear".to_string(),
            }),
        }
    }
}

impl fmt::Display for Resampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resampling::Nearest => write!(f, "nearest"),
            Resampling::Bilinear => write!(f, "bilinear"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_nearest() {
        let band = array![[1u8, 2], [3, 4]];
        let v = band.view();
        assert_eq!(Resampling::Nearest.sample(&v, 0.9, 0.1, 255.0), 1.0);
        assert_eq!(Resampling::Nearest.sample(&v, 1.0, 1.99, 255.0), 4.0);
        assert_eq!(Resampling::Nearest.sample(&v, 2.0, 0.5, 255.0), 255.0);
        assert_eq!(Resampling::Nearest.sample(&v, -0.01, 0.5, 7.0), 7.0);
    }

    #[test]
    fn test_bilinear_centers_and_midpoints() {
        let band = array![[0.0f32, 10.0], [20.0, 30.0]];
        let v = band.view();
        assert_relative_eq!(Resampling::Bilinear.sample(&v, 0.5, 0.5, 0.0), 0.0);
        assert_relative_eq!(Resampling::Bilinear.sample(&v, 1.5, 1.5, 0.0), 30.0);
        assert_relative_eq!(Resampling::Bilinear.sample(&v, 1.0, 1.0, 0.0), 15.0);
        assert_relative_eq!(Resampling::Bilinear.sample(&v, 1.0, 0.5, 0.0), 5.0);
    }

    #[test]
    fn test_bilinear_clamps_inside_edge() {
        let band = array![[8u8, 8], [8, 8]];
        let v = band.view();
        assert_relative_eq!(Resampling::Bilinear.sample(&v, 0.1, 1.9, 255.0), 8.0);
        assert_relative_eq!(Resampling::Bilinear.sample(&v, 2.1, 1.0, 255.0), 255.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Nearest".parse::<Resampling>().unwrap(), Resampling::Nearest);
        assert_eq!("bilinear".parse::<Resampling>().unwrap(), Resampling::Bilinear);
        assert!("cubic".parse::<Resampling>().is_err());
        assert_eq!(Resampling::default().to_string(), "bilinear");
    }
}
