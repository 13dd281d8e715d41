//! Block grid planning for windowed processing of large rasters

use rastile_core::io::BlockBounds;
use rastile_core::{Error, Result};

/// A processing block: a `height x width` window whose upper-left corner is
/// at raster pixel `(y, x)`, plus the borders to trim before committing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Column of the window's first pixel (may be negative)
    pub x: isize,
    /// Row of the window's first pixel (may be negative)
    pub y: isize,
    pub height: usize,
    pub width: usize,
    pub bounds: BlockBounds,
}

impl Block {
    /// Raster-space window `(row, col, height, width)` this block commits
    /// once its borders are trimmed.
    pub fn trimmed_window(&self) -> (usize, usize, usize, usize) {
        let (h, w) = self
            .bounds
            .trimmed_size(self.height, self.width)
            .unwrap_or((0, 0));
        let row = (self.y + self.bounds.top as isize).max(0) as usize;
        let col = (self.x + self.bounds.left as isize).max(0) as usize;
        (row, col, h, w)
    }
}

/// Ordered set of blocks covering a raster, row-major.
///
/// Every block is `sample + 2 * bound` on each side. Interiors start at
/// `0, sample, 2 * sample, ...`; the trailing border on the last row/column is
/// widened so the trimmed interior ends exactly at the raster edge.
#[derive(Debug, Clone)]
pub struct BlockGrid {
    blocks: Vec<Block>,
    raster_size: (usize, usize),
}

impl BlockGrid {
    pub fn new(
        raster_h: usize,
        raster_w: usize,
        sample_h: usize,
        sample_w: usize,
        bound: usize,
    ) -> Result<Self> {
        if sample_h == 0 || sample_w == 0 {
            return Err(Error::InvalidParameter {
                name: "sample_size",
                value: format!("{}x{}", sample_h, sample_w),
                reason: "sample height and width must be positive".to_string(),
            });
        }

        let height = sample_h + 2 * bound;
        let width = sample_w + 2 * bound;
        let mut blocks = Vec::new();

        for interior_y in (0..raster_h).step_by(sample_h) {
            let y = interior_y as isize - bound as isize;
            let bottom = bound.max((interior_y + sample_h + bound).saturating_sub(raster_h));

            for interior_x in (0..raster_w).step_by(sample_w) {
                let x = interior_x as isize - bound as isize;
                let right = bound.max((interior_x + sample_w + bound).saturating_sub(raster_w));

                blocks.push(Block {
                    x,
                    y,
                    height,
                    width,
                    bounds: BlockBounds {
                        bottom,
                        right,
                        ..BlockBounds::uniform(bound)
                    },
                });
            }
        }

        Ok(Self {
            blocks,
            raster_size: (raster_h, raster_w),
        })
    }

    /// `(rows, cols)` of the raster this grid covers
    pub fn raster_size(&self) -> (usize, usize) {
        self.raster_size
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }
}

impl IntoIterator for BlockGrid {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl<'a> IntoIterator for &'a BlockGrid {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
