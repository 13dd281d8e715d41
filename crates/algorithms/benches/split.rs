//! Benchmarks for tile rendering

use std::f64::consts::PI;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array3;
use rastile_algorithms::{render_tile, Resampling};
use rastile_core::slippy::{tiles_per_axis, EARTH_EQUATORIAL_RADIUS};
use rastile_core::{BandedRaster, CoordTransformer, GeoTransform, TileId, CRS};

/// RGB raster in EPSG:3857 covering tile (8, 130, 90)
fn create_source(size: usize) -> BandedRaster<u8> {
    let world = 2.0 * PI * EARTH_EQUATORIAL_RADIUS;
    let tile_m = world / tiles_per_axis(8);
    let px = tile_m / size as f64;
    let data = Array3::from_shape_fn((3, size, size), |(b, r, c)| ((r * 7 + c * 13 + b * 31) % 256) as u8);
    BandedRaster::from_array(data).with_georef(
        GeoTransform::new(-world / 2.0 + 130.0 * tile_m, world / 2.0 - 90.0 * tile_m, px, -px),
        Some(CRS::web_mercator()),
    )
}

fn bench_render_tile(c: &mut Criterion) {
    let mut group = c.benchmark_group("split/render_tile");
    let src = create_source(1024);
    let inverse = src.transform().try_inverse().unwrap();
    let from_geo = CoordTransformer::from_wgs84(&CRS::web_mercator()).unwrap();

    for resampling in [Resampling::Nearest, Resampling::Bilinear] {
        group.bench_with_input(BenchmarkId::new("256", resampling), &resampling, |b, &r| {
            b.iter(|| {
                render_tile(
                    black_box(&src),
                    &inverse,
                    &from_geo,
                    TileId::new(9, 261, 181),
                    256,
                    r,
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

fn bench_tile_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("split/tile_size");
    let src = create_source(1024);
    let inverse = src.transform().try_inverse().unwrap();
    let from_geo = CoordTransformer::from_wgs84(&CRS::web_mercator()).unwrap();

    for size in [128u32, 256, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &s| {
            b.iter(|| {
                render_tile(
                    black_box(&src),
                    &inverse,
                    &from_geo,
                    TileId::new(8, 130, 90),
                    s,
                    Resampling::Bilinear,
                )
                .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render_tile, bench_tile_size);
criterion_main!(benches);
