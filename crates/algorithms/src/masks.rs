//! Reference block transforms
//!
//! - [`IdentityTransform`]: passes the first channel through unchanged
//! - [`ThresholdMask`]: brightness threshold with optional border erosion

use ndarray::{Array2, ArrayView2, ArrayView3, Axis};
use rastile_core::{Error, Result};
use rastile_parallel::BlockTransform;
use rayon::prelude::*;

/// Returns channel 0 of the block.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl BlockTransform for IdentityTransform {
    fn apply(&self, image: ArrayView3<'_, u8>) -> Result<Array2<u8>> {
        if image.dim().2 == 0 {
            return Err(Error::InvalidParameter {
                name: "channels",
                value: "0".to_string(),
                reason: "block has no channels".to_string(),
            });
        }
        Ok(image.index_axis(Axis(2), 0).to_owned())
    }
}

/// Binary mask of pixels whose luma reaches `threshold`.
///
/// With `erosion = Some(k)` the mask is eroded by a `k x k` minimum filter
/// and the border pixels (mask minus eroded mask) are cleared, which
/// separates touching regions. Mask pixels are written as `multiplier`.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdMask {
    pub threshold: u8,
    pub erosion: Option<usize>,
    pub multiplier: u8,
}

impl Default for ThresholdMask {
    fn default() -> Self {
        Self {
            threshold: 128,
            erosion: None,
            multiplier: 255,
        }
    }
}

impl ThresholdMask {
    pub fn new(threshold: u8) -> Self {
        Self {
            threshold,
            ..Default::default()
        }
    }

    pub fn with_erosion(mut self, kernel: usize) -> Self {
        self.erosion = Some(kernel);
        self
    }

    fn binary(&self, image: ArrayView3<'_, u8>) -> Array2<u8> {
        let (rows, cols, channels) = image.dim();
        Array2::from_shape_fn((rows, cols), |(r, c)| {
            let v = if channels >= 3 {
                luma(image[(r, c, 0)], image[(r, c, 1)], image[(r, c, 2)])
            } else {
                image[(r, c, 0)]
            };
            u8::from(v >= self.threshold)
        })
    }
}

/// ITU-R 601-2 luma
#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64).round() as u8
}

/// Minimum over a `kernel x kernel` window; neighbours outside the array are ignored.
pub fn erode_mask(mask: ArrayView2<'_, u8>, kernel: usize) -> Result<Array2<u8>> {
    if kernel == 0 {
        return Err(Error::InvalidParameter {
            name: "erosion",
            value: "0".to_string(),
            reason: "kernel size must be positive".to_string(),
        });
    }

    let (rows, cols) = mask.dim();
    // Even kernels extend one pixel further up/left
    let before = (kernel / 2) as isize;
    let after = ((kernel - 1) / 2) as isize;

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            let r = row as isize;
            for (col, out) in row_data.iter_mut().enumerate() {
                let c = col as isize;
                let mut min = u8::MAX;
                for nr in (r - before).max(0)..=(r + after).min(rows as isize - 1) {
                    for nc in (c - before).max(0)..=(c + after).min(cols as isize - 1) {
                        min = min.min(mask[(nr as usize, nc as usize)]);
                    }
                }
                *out = min;
            }
            row_data
        })
        .collect();

    Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
}

impl BlockTransform for ThresholdMask {
    fn apply(&self, image: ArrayView3<'_, u8>) -> Result<Array2<u8>> {
        if image.dim().2 == 0 {
            return Err(Error::InvalidParameter {
                name: "channels",
                value: "0".to_string(),
                reason: "block has no channels".to_string(),
            });
        }

        let mask = self.binary(image);
        // Clearing the border (mask - eroded) leaves the eroded mask
        let kept = match self.erosion {
            Some(kernel) => erode_mask(mask.view(), kernel)?,
            None => mask,
        };

        Ok(kept.mapv(|v| v * self.multiplier))
    }
}
