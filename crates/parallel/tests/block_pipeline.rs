//! End-to-end checks of block planning and the block pipeline.
//!
//! - Trimmed blocks cover every raster pixel exactly once for a sweep of
//!   raster sizes, sample sizes and bounds.
//! - An identity transform reproduces the source band through the full
//!   read/transform/trim/write path, in memory and through GeoTIFF files.

use ndarray::{Array2, Array3, ArrayView3, Axis};
use rastile_core::io::{read_geotiff, write_geotiff};
use rastile_core::{BandedRaster, GeoTransform, Raster, Result, CRS};
use rastile_parallel::{process_geotiff, BlockGrid, BlockPipeline, PipelineParams};

fn identity(image: ArrayView3<'_, u8>) -> Result<Array2<u8>> {
    Ok(image.index_axis(Axis(2), 0).to_owned())
}

fn patterned(bands: usize, rows: usize, cols: usize) -> BandedRaster<u8> {
    BandedRaster::from_array(Array3::from_shape_fn((bands, rows, cols), |(b, r, c)| {
        ((r * 31 + c * 17 + b * 101) % 251) as u8
    }))
}

// ── Coverage ──────────────────────────────────────────────────────────

#[test]
fn trimmed_blocks_cover_each_pixel_once() {
    for &(rows, cols) in &[(1, 1), (7, 13), (64, 64), (100, 37), (255, 257), (600, 600)] {
        for &(sample_h, sample_w) in &[(1, 1), (5, 9), (16, 16), (64, 32), (256, 256), (700, 700)] {
            for &bound in &[0usize, 1, 3, 16, 128] {
                let grid = BlockGrid::new(rows, cols, sample_h, sample_w, bound).unwrap();
                let mut hits = vec![0u8; rows * cols];

                for block in &grid {
                    assert_eq!(block.height, sample_h + 2 * bound);
                    assert_eq!(block.width, sample_w + 2 * bound);
                    assert_eq!(block.bounds.top, bound);
                    assert_eq!(block.bounds.left, bound);

                    let (r0, c0, h, w) = block.trimmed_window();
                    assert!(r0 + h <= rows && c0 + w <= cols);
                    for r in r0..r0 + h {
                        for c in c0..c0 + w {
                            hits[r * cols + c] += 1;
                        }
                    }
                }

                assert!(
                    hits.iter().all(|&n| n == 1),
                    "raster {}x{}, sample {}x{}, bound {}: coverage broken",
                    rows,
                    cols,
                    sample_h,
                    sample_w,
                    bound
                );
            }
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────

#[test]
fn identity_pipeline_reproduces_source() {
    let src = patterned(3, 600, 600);
    let params = PipelineParams {
        sample_size: (256, 256),
        sample_resize: None,
        bound: 16,
    };

    let out = BlockPipeline::new(params).run(&src, &identity).unwrap();

    assert_eq!(out.dim(), (600, 600));
    assert_eq!(out, src.band(0).unwrap());
}

#[test]
fn single_band_source_is_accepted() {
    let src = patterned(1, 90, 70);
    let out = BlockPipeline::new(PipelineParams {
        sample_size: (32, 32),
        sample_resize: None,
        bound: 8,
    })
    .run(&src, &identity)
    .unwrap();
    assert_eq!(out, src.band(0).unwrap());
}

#[test]
fn raster_output_keeps_georeference() {
    let gt = GeoTransform::new(500_000.0, 4_200_000.0, 0.5, -0.5);
    let src = patterned(3, 40, 50).with_georef(gt, Some(CRS::from_epsg(32633)));

    let out: Raster<u8> = BlockPipeline::new(PipelineParams {
        sample_size: (16, 16),
        sample_resize: None,
        bound: 4,
    })
    .run_raster(&src, &identity)
    .unwrap();

    assert_eq!(*out.transform(), gt);
    assert_eq!(out.crs().and_then(|c| c.epsg()), Some(32633));
    assert_eq!(out.view(), src.band(0).unwrap());
}

#[test]
fn geotiff_to_geotiff() {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("source.tif");
    let dst_path = dir.path().join("mask.tif");

    let gt = GeoTransform::new(1000.0, 2000.0, 2.0, -2.0);
    let src = patterned(3, 120, 80).with_georef(gt, Some(CRS::web_mercator()));
    write_geotiff(&src, &src_path, None).unwrap();

    let mut last = (0, 0);
    process_geotiff(
        &src_path,
        &dst_path,
        &identity,
        PipelineParams {
            sample_size: (50, 50),
            sample_resize: None,
            bound: 10,
        },
        |done, total| last = (done, total),
    )
    .unwrap();
    assert_eq!(last, (6, 6));

    let mask: Raster<u8> = read_geotiff(&dst_path, None).unwrap();
    assert_eq!(mask.view(), src.band(0).unwrap());
    assert_eq!(*mask.transform(), gt);
    assert!(mask.crs().is_some_and(|c| c.is_web_mercator()));
}
