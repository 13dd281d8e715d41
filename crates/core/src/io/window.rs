//! Windowed block reads and trimmed block writes.
//!
//! Windows are addressed in raster pixel space with signed origins, so a
//! window may start before the first row/column or run past the last one.

use ndarray::{s, Array3, ArrayView2};

use crate::error::{Error, Result};
use crate::raster::{BandedRaster, Raster, RasterElement};

/// Border widths trimmed from a block before it is committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockBounds {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl BlockBounds {
    pub fn uniform(bound: usize) -> Self {
        Self {
            top: bound,
            bottom: bound,
            left: bound,
            right: bound,
        }
    }

    /// Interior size left after trimming a `height x width` block,
    /// `None` if the borders do not fit.
    pub fn trimmed_size(&self, height: usize, width: usize) -> Option<(usize, usize)> {
        let h = height.checked_sub(self.top + self.bottom)?;
        let w = width.checked_sub(self.left + self.right)?;
        Some((h, w))
    }
}

/// A raster that can serve arbitrary windows of all its bands.
pub trait WindowedRead {
    type Element: RasterElement;

    fn band_count(&self) -> usize;

    /// `(rows, cols)`
    fn dimensions(&self) -> (usize, usize);

    /// Read `height x width` pixels starting at `(y, x)` from every band.
    /// Samples outside the raster are set to `fill`.
    fn read_window(
        &self,
        x: isize,
        y: isize,
        height: usize,
        width: usize,
        fill: Self::Element,
    ) -> Result<Array3<Self::Element>>;
}

/// Intersection of `[start, start + len)` with `[0, limit)`, as
/// `(source_start, dest_start, len)`.
fn overlap(start: isize, len: usize, limit: usize) -> Option<(usize, usize, usize)> {
    let lo = start.max(0);
    let hi = (start + len as isize).min(limit as isize);
    if lo >= hi {
        return None;
    }
    Some((lo as usize, (lo - start) as usize, (hi - lo) as usize))
}

impl<T: RasterElement> WindowedRead for BandedRaster<T> {
    type Element = T;

    fn band_count(&self) -> usize {
        BandedRaster::band_count(self)
    }

    fn dimensions(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    fn read_window(&self, x: isize, y: isize, height: usize, width: usize, fill: T) -> Result<Array3<T>> {
        let bands = BandedRaster::band_count(self);
        let mut out = Array3::from_elem((bands, height, width), fill);

        if let (Some((sr, dr, nr)), Some((sc, dc, nc))) =
            (overlap(y, height, self.rows()), overlap(x, width, self.cols()))
        {
            out.slice_mut(s![.., dr..dr + nr, dc..dc + nc])
                .assign(&self.data().slice(s![.., sr..sr + nr, sc..sc + nc]));
        }

        Ok(out)
    }
}

/// Boundless read of a `height x width` window at `(y, x)` across all bands.
pub fn read_block<S: WindowedRead>(
    src: &S,
    x: isize,
    y: isize,
    height: usize,
    width: usize,
    fill: S::Element,
) -> Result<Array3<S::Element>> {
    src.read_window(x, y, height, width, fill)
}

/// Write a `height x width` block whose upper-left corner sits at `(y, x)`.
///
/// With `bounds`, only the interior `[top, height - bottom) x [left, width - right)`
/// is written, at `(y + top, x + left)`.
pub fn write_block<T: RasterElement>(
    dst: &mut Raster<T>,
    pixels: ArrayView2<'_, T>,
    y: isize,
    x: isize,
    height: usize,
    width: usize,
    bounds: Option<&BlockBounds>,
) -> Result<()> {
    if pixels.dim() != (height, width) {
        return Err(Error::SizeMismatch {
            er: height,
            ec: width,
            ar: pixels.nrows(),
            ac: pixels.ncols(),
        });
    }

    let b = bounds.copied().unwrap_or_default();
    let (h, w) = b.trimmed_size(height, width).ok_or_else(|| Error::InvalidParameter {
        name: "bounds",
        value: format!("{:?}", b),
        reason: format!("borders exceed block size {}x{}", height, width),
    })?;

    let row = y + b.top as isize;
    let col = x + b.left as isize;
    let (rows, cols) = dst.shape();
    if row < 0 || col < 0 || row as usize + h > rows || col as usize + w > cols {
        return Err(Error::IndexOutOfBounds { row, col, rows, cols });
    }
    if h == 0 || w == 0 {
        return Ok(());
    }

    let (row, col) = (row as usize, col as usize);
    dst.view_mut()
        .slice_mut(s![row..row + h, col..col + w])
        .assign(&pixels.slice(s![b.top..b.top + h, b.left..b.left + w]));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn source() -> BandedRaster<u8> {
        // 2 bands, 3x4, band b value = 100*b + 10*row + col
        BandedRaster::from_array(Array3::from_shape_fn((2, 3, 4), |(b, r, c)| {
            (100 * b + 10 * r + c) as u8
        }))
    }

    #[test]
    fn test_read_inside() {
        let block = read_block(&source(), 1, 1, 2, 2, 0).unwrap();
        assert_eq!(block.dim(), (2, 2, 2));
        assert_eq!(block[(0, 0, 0)], 11);
        assert_eq!(block[(1, 1, 1)], 122);
    }

    #[test]
    fn test_read_boundless_fill() {
        let block = read_block(&source(), -2, -1, 3, 4, 7).unwrap();
        // Row 0 is above the raster
        assert!(block.slice(s![.., 0, ..]).iter().all(|&v| v == 7));
        // Columns 0 and 1 are left of the raster
        assert!(block.slice(s![.., .., 0..2]).iter().all(|&v| v == 7));
        assert_eq!(block[(0, 1, 2)], 0);
        assert_eq!(block[(1, 2, 3)], 111);
    }

    #[test]
    fn test_read_fully_outside() {
        let block = read_block(&source(), 50, 50, 2, 3, 9).unwrap();
        assert!(block.iter().all(|&v| v == 9));
    }

    #[test]
    fn test_write_trimmed() {
        let mut dst: Raster<u8> = Raster::new(4, 4);
        let block = Array2::from_shape_fn((4, 4), |(r, c)| (r * 4 + c) as u8);
        let bounds = BlockBounds::uniform(1);

        write_block(&mut dst, block.view(), -1, -1, 4, 4, Some(&bounds)).unwrap();

        assert_eq!(dst.get(0, 0).unwrap(), 5);
        assert_eq!(dst.get(1, 1).unwrap(), 10);
        assert_eq!(dst.get(2, 2).unwrap(), 0);
    }

    #[test]
    fn test_write_asymmetric_bounds() {
        let mut dst: Raster<u8> = Raster::new(3, 3);
        let bounds = BlockBounds { top: 0, bottom: 1, left: 1, right: 0 };
        write_block(&mut dst, array![[1u8, 2, 3], [4, 5, 6]].view(), 0, 0, 2, 3, Some(&bounds))
            .unwrap();
        assert_eq!(dst.view().row(0).to_vec(), vec![0, 2, 3]);
        assert_eq!(dst.view().row(1).to_vec(), vec![0, 0, 0]);
    }

    #[test]
    fn test_write_errors() {
        let mut dst: Raster<u8> = Raster::new(2, 2);
        let block = Array2::<u8>::zeros((2, 2));

        assert!(matches!(
            write_block(&mut dst, block.view(), 0, 0, 3, 2, None),
            Err(Error::SizeMismatch { .. })
        ));
        assert!(matches!(
            write_block(&mut dst, block.view(), 1, 0, 2, 2, None),
            Err(Error::IndexOutOfBounds { row: 1, col: 0, .. })
        ));
        assert!(matches!(
            write_block(&mut dst, block.view(), -1, 0, 2, 2, None),
            Err(Error::IndexOutOfBounds { .. })
        ));
        assert!(write_block(&mut dst, block.view(), 0, 0, 2, 2, Some(&BlockBounds::uniform(2))).is_err());
    }
}
