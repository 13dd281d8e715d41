//! Multi-band raster

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, ArrayViewMut3, Axis};

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};

/// A georeferenced stack of equally sized bands, stored `(band, row, col)`.
#[derive(Debug, Clone)]
pub struct BandedRaster<T: RasterElement> {
    data: Array3<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl<T: RasterElement> BandedRaster<T> {
    /// Create a zero-filled raster
    pub fn new(bands: usize, rows: usize, cols: usize) -> Self {
        Self::from_array(Array3::zeros((bands, rows, cols)))
    }

    pub fn from_array(data: Array3<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    /// Stack single-band arrays. All bands must share one shape.
    pub fn from_bands(bands: Vec<Array2<T>>) -> Result<Self> {
        let (rows, cols) = bands.first().map(|b| b.dim()).ok_or_else(|| {
            Error::InvalidParameter {
                name: "bands",
                value: "0".to_string(),
                reason: "at least one band is required".to_string(),
            }
        })?;

        let mut data = Array3::zeros((bands.len(), rows, cols));
        for (i, band) in bands.iter().enumerate() {
            if band.dim() != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: band.nrows(),
                    ac: band.ncols(),
                });
            }
            data.index_axis_mut(Axis(0), i).assign(band);
        }
        Ok(Self::from_array(data))
    }

    /// Attach georeferencing, builder style
    pub fn with_georef(mut self, transform: GeoTransform, crs: Option<CRS>) -> Self {
        self.transform = transform;
        self.crs = crs;
        self
    }

    pub fn band_count(&self) -> usize {
        self.data.dim().0
    }

    pub fn rows(&self) -> usize {
        self.data.dim().1
    }

    pub fn cols(&self) -> usize {
        self.data.dim().2
    }

    /// Dimensions as (bands, rows, cols)
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// View of one band
    pub fn band(&self, index: usize) -> Result<ArrayView2<'_, T>> {
        if index >= self.band_count() {
            return Err(Error::InvalidParameter {
                name: "band",
                value: index.to_string(),
                reason: format!("raster has {} bands", self.band_count()),
            });
        }
        Ok(self.data.index_axis(Axis(0), index))
    }

    /// Copy one band out as a single-band raster with the same georeferencing
    pub fn band_raster(&self, index: usize) -> Result<Raster<T>> {
        let band = self.band(index)?.to_owned();
        Ok(Raster::from_array(band).with_georef(self.transform, self.crs.clone()))
    }

    pub fn view(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, T> {
        self.data.view_mut()
    }

    pub fn data(&self) -> &Array3<T> {
        &self.data
    }

    pub fn into_array(self) -> Array3<T> {
        self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }
}

impl<T: RasterElement> From<Raster<T>> for BandedRaster<T> {
    fn from(raster: Raster<T>) -> Self {
        let transform = *raster.transform();
        let crs = raster.crs().cloned();
        let data = raster.into_array().insert_axis(Axis(0));
        BandedRaster::from_array(data).with_georef(transform, crs)
    }
}
