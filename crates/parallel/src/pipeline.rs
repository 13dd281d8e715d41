//! Block pipeline: read overlapping blocks, run a transform on each, and
//! commit the trimmed interiors into a single-band 8-bit raster.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::{s, Array2, Array3, ArrayView2, ArrayView3, Axis};
use num_traits::Zero;
use rastile_core::io::{read_block, read_geotiff_bands, write_block, write_geotiff, WindowedRead};
use rastile_core::{BandedRaster, Error, Raster, RasterElement, Result};
use tracing::{debug, info};

use crate::blocks::BlockGrid;

/// Per-block image transform.
///
/// Receives a `height x width x channels` block (at most 3 channels) and
/// returns a `height x width` result. Implementations must be deterministic.
pub trait BlockTransform {
    fn apply(&self, image: ArrayView3<'_, u8>) -> Result<Array2<u8>>;
}

impl<F> BlockTransform for F
where
    F: Fn(ArrayView3<'_, u8>) -> Result<Array2<u8>>,
{
    fn apply(&self, image: ArrayView3<'_, u8>) -> Result<Array2<u8>> {
        self(image)
    }
}

/// Block pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineParams {
    /// Interior `(height, width)` of each block
    pub sample_size: (usize, usize),
    /// Working `(height, width)` the transform sees, if different from the
    /// block size
    pub sample_resize: Option<(usize, usize)>,
    /// Context border around each block, trimmed before commit
    pub bound: usize,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            sample_size: (512, 512),
            sample_resize: None,
            bound: 128,
        }
    }
}

/// Sequential block pipeline
#[derive(Debug, Clone, Default)]
pub struct BlockPipeline {
    params: PipelineParams,
}

impl BlockPipeline {
    pub fn new(params: PipelineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Run over any windowed source, returning the `rows x cols` result.
    pub fn run<S, F>(&self, src: &S, transform: &F) -> Result<Array2<u8>>
    where
        S: WindowedRead,
        F: BlockTransform + ?Sized,
    {
        self.run_with_progress(src, transform, |_, _| {})
    }

    /// Like [`BlockPipeline::run`], calling `progress(done, total)` after
    /// every committed block.
    pub fn run_with_progress<S, F, P>(&self, src: &S, transform: &F, mut progress: P) -> Result<Array2<u8>>
    where
        S: WindowedRead,
        F: BlockTransform + ?Sized,
        P: FnMut(usize, usize),
    {
        let (rows, cols) = src.dimensions();
        let (sample_h, sample_w) = self.params.sample_size;
        let grid = BlockGrid::new(rows, cols, sample_h, sample_w, self.params.bound)?;
        let total = grid.len();

        info!(
            "Processing {}x{} raster in {} blocks ({}x{}, bound {})",
            cols, rows, total, sample_w, sample_h, self.params.bound
        );

        let mut output = Raster::<u8>::new(rows, cols);
        let zero = S::Element::zero();

        for (i, block) in grid.iter().enumerate() {
            let window = read_block(src, block.x, block.y, block.height, block.width, zero)?;
            let rgb = to_channel_last_u8(&window);

            let result = match self.params.sample_resize {
                Some(working) => {
                    let resized = resize_channels(rgb.view(), working, FilterType::Triangle)?;
                    let out = transform.apply(resized.view())?;
                    check_shape(&out, working)?;
                    resize_plane(out.view(), (block.height, block.width), FilterType::Nearest)?
                }
                None => {
                    let out = transform.apply(rgb.view())?;
                    check_shape(&out, (block.height, block.width))?;
                    out
                }
            };

            write_block(
                &mut output,
                result.view(),
                block.y,
                block.x,
                block.height,
                block.width,
                Some(&block.bounds),
            )?;

            debug!("Block {}/{} at ({}, {}) committed", i + 1, total, block.y, block.x);
            progress(i + 1, total);
        }

        Ok(output.into_array())
    }

    /// Run over a multi-band raster; the result keeps its georeferencing.
    pub fn run_raster<T, F>(&self, src: &BandedRaster<T>, transform: &F) -> Result<Raster<u8>>
    where
        T: RasterElement,
        F: BlockTransform + ?Sized,
    {
        let mask = self.run(src, transform)?;
        Ok(Raster::from_array(mask).with_georef(*src.transform(), src.crs().cloned()))
    }
}

/// Run the pipeline over an in-memory `height x width x channels` image.
pub fn run_on_image<F>(image: ArrayView3<'_, u8>, transform: &F, params: PipelineParams) -> Result<Array2<u8>>
where
    F: BlockTransform + ?Sized,
{
    let planar = image.permuted_axes([2, 0, 1]).as_standard_layout().to_owned();
    BlockPipeline::new(params).run(&BandedRaster::from_array(planar), transform)
}

/// Read a GeoTIFF, run the pipeline and write a single-band 8-bit GeoTIFF
/// with the same georeferencing.
pub fn process_geotiff<F, P>(
    src_path: &Path,
    dst_path: &Path,
    transform: &F,
    params: PipelineParams,
    progress: P,
) -> Result<()>
where
    F: BlockTransform + ?Sized,
    P: FnMut(usize, usize),
{
    let src: BandedRaster<u8> = read_geotiff_bands(src_path)?;
    info!(
        "Read {} ({} bands, {}x{})",
        src_path.display(),
        src.band_count(),
        src.cols(),
        src.rows()
    );

    let mask = BlockPipeline::new(params).run_with_progress(&src, transform, progress)?;
    let out = Raster::from_array(mask).with_georef(*src.transform(), src.crs().cloned());
    write_geotiff(&out.into(), dst_path, None)?;

    info!("Wrote {}", dst_path.display());
    Ok(())
}

/// First three bands of a `(band, row, col)` block as `(row, col, band)` u8.
fn to_channel_last_u8<T: RasterElement>(window: &Array3<T>) -> Array3<u8> {
    let channels = window.dim().0.min(3);
    window
        .slice(s![..channels, .., ..])
        .permuted_axes([1, 2, 0])
        .mapv(|v| v.to_u8_saturating())
}

fn check_shape(result: &Array2<u8>, (height, width): (usize, usize)) -> Result<()> {
    if result.dim() != (height, width) {
        return Err(Error::SizeMismatch {
            er: height,
            ec: width,
            ar: result.nrows(),
            ac: result.ncols(),
        });
    }
    Ok(())
}

fn resize_plane(plane: ArrayView2<'_, u8>, (height, width): (usize, usize), filter: FilterType) -> Result<Array2<u8>> {
    let (h, w) = plane.dim();
    let pixels: Vec<u8> = plane.iter().copied().collect();
    let img = GrayImage::from_raw(w as u32, h as u32, pixels)
        .ok_or(Error::InvalidDimensions { width: w, height: h })?;
    let resized = imageops::resize(&img, width as u32, height as u32, filter);
    Array2::from_shape_vec((height, width), resized.into_raw()).map_err(|e| Error::Other(e.to_string()))
}

/// Resize each channel of a `(row, col, channel)` image independently.
fn resize_channels(image: ArrayView3<'_, u8>, size: (usize, usize), filter: FilterType) -> Result<Array3<u8>> {
    let channels = image.dim().2;
    let mut out = Array3::zeros((size.0, size.1, channels));
    for c in 0..channels {
        let plane = resize_plane(image.index_axis(Axis(2), c), size, filter)?;
        out.index_axis_mut(Axis(2), c).assign(&plane);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn first_band(image: ArrayView3<'_, u8>) -> Result<Array2<u8>> {
        Ok(image.index_axis(Axis(2), 0).to_owned())
    }

    #[test]
    fn test_channel_last_takes_three_bands() {
        let window = Array3::from_shape_fn((4, 2, 3), |(b, r, c)| (b * 100 + r * 10 + c) as u16);
        let hwc = to_channel_last_u8(&window);
        assert_eq!(hwc.dim(), (2, 3, 3));
        assert_eq!(hwc[(1, 2, 0)], 12);
        // 212 fits, band 3 dropped
        assert_eq!(hwc[(1, 2, 2)], 212);
    }

    #[test]
    fn test_saturating_cast() {
        let window = Array3::from_elem((1, 1, 1), 1000u16);
        assert_eq!(to_channel_last_u8(&window)[(0, 0, 0)], 255);
    }

    #[test]
    fn test_small_image_identity() {
        let image = Array3::from_shape_fn((37, 53, 3), |(r, c, ch)| ((r * 7 + c * 3 + ch) % 256) as u8);
        let params = PipelineParams {
            sample_size: (16, 16),
            sample_resize: None,
            bound: 4,
        };
        let out = run_on_image(image.view(), &first_band, params).unwrap();
        assert_eq!(out, image.index_axis(Axis(2), 0));
    }

    #[test]
    fn test_resize_roundtrip_constant() {
        let image = Array3::from_elem((40, 40, 3), 90u8);
        let params = PipelineParams {
            sample_size: (20, 20),
            sample_resize: Some((8, 8)),
            bound: 0,
        };
        let out = run_on_image(image.view(), &first_band, params).unwrap();
        assert!(out.iter().all(|&v| v == 90));
    }

    #[test]
    fn test_wrong_shape_is_error() {
        let image = Array3::<u8>::zeros((10, 10, 3));
        fn bad(_: ArrayView3<'_, u8>) -> Result<Array2<u8>> {
            Ok(Array2::zeros((3, 3)))
        }
        let err = run_on_image(image.view(), &bad, PipelineParams::default());
        assert!(matches!(err, Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn test_transform_failure_aborts() {
        let image = Array3::<u8>::zeros((10, 10, 1));
        fn failing(_: ArrayView3<'_, u8>) -> Result<Array2<u8>> {
            Err(Error::Algorithm("model failed".into()))
        }
        assert!(matches!(
            run_on_image(image.view(), &failing, PipelineParams::default()),
            Err(Error::Algorithm(_))
        ));
    }

    #[test]
    fn test_progress_reports_every_block() {
        let src = BandedRaster::<u8>::new(1, 30, 30);
        let pipeline = BlockPipeline::new(PipelineParams {
            sample_size: (10, 10),
            sample_resize: None,
            bound: 2,
        });
        let mut calls = Vec::new();
        pipeline
            .run_with_progress(&src, &first_band, |done, total| calls.push((done, total)))
            .unwrap();
        assert_eq!(calls.len(), 9);
        assert_eq!(calls.last(), Some(&(9, 9)));
    }
}
