//! Mosaic assembly: fetch the tiles covering a lat/lon box and stitch them
//! into one georeferenced image in EPSG:3857.

use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use rastile_core::io::write_geotiff;
use rastile_core::slippy::{lat_lon_to_mercator, TileBox};
use rastile_core::{BandedRaster, CancelFlag, GeoTransform, PixelBuffer, TileId, TileRange, CRS};
use tracing::{debug, info, warn};

use crate::error::{CloudError, Result};
use crate::source::TileSource;

const CANCEL_POLL: Duration = Duration::from_millis(20);

/// Options for [`build_mosaic`].
#[derive(Debug, Clone)]
pub struct MosaicOptions {
    /// Requests in flight at once.
    pub concurrency: usize,
}

impl Default for MosaicOptions {
    fn default() -> Self {
        Self { concurrency: 5 }
    }
}

/// A stitched, cropped and georeferenced image.
#[derive(Debug, Clone)]
pub struct Mosaic {
    pub pixels: PixelBuffer,
    pub transform: GeoTransform,
    pub crs: CRS,
    /// Tiles that were requested
    pub range: TileRange,
}

impl Mosaic {
    /// One band per channel.
    pub fn to_raster(&self) -> BandedRaster<u8> {
        BandedRaster::from_array(self.pixels.to_bands()).with_georef(self.transform, Some(self.crs.clone()))
    }

    /// Write a DEFLATE-compressed GeoTIFF.
    pub fn write(&self, path: &Path) -> Result<()> {
        write_geotiff(&self.to_raster(), path, None)?;
        info!(
            "Wrote {} ({}x{}, {} bands)",
            path.display(),
            self.pixels.width(),
            self.pixels.height(),
            self.pixels.channels()
        );
        Ok(())
    }
}

/// Canvas sized from the first decoded tile.
struct Canvas {
    pixels: PixelBuffer,
    tile_w: usize,
    tile_h: usize,
}

/// Fetch and stitch every tile at `zoom` covering the box spanned by the
/// two `(lat, lon)` corners, which may be given in any order.
pub async fn build_mosaic<S: TileSource>(
    source: &S,
    from: (f64, f64),
    to: (f64, f64),
    zoom: u8,
    options: &MosaicOptions,
    cancel: Option<&CancelFlag>,
) -> Result<Mosaic> {
    build_mosaic_with_progress(source, from, to, zoom, options, cancel, |_, _| {}).await
}

/// Like [`build_mosaic`], calling `progress(done, total)` after every tile.
pub async fn build_mosaic_with_progress<S, P>(
    source: &S,
    from: (f64, f64),
    to: (f64, f64),
    zoom: u8,
    options: &MosaicOptions,
    cancel: Option<&CancelFlag>,
    mut progress: P,
) -> Result<Mosaic>
where
    S: TileSource,
    P: FnMut(usize, usize),
{
    let tbox = TileBox::from_lat_lon(zoom, from, to);
    let range = tbox.covering_range();
    let tiles: Vec<TileId> = range.tiles().collect();
    let total = tiles.len();

    info!(
        "Zoom {}: fetching {} tiles ({}x{}) with {} in flight",
        zoom,
        total,
        range.width(),
        range.height(),
        options.concurrency
    );

    let mut fetches = stream::iter(tiles)
        .map(|tile| async move { (tile, source.fetch(tile).await) })
        .buffered(options.concurrency.max(1));

    let mut canvas: Option<Canvas> = None;
    let mut done = 0;

    let cancelled = wait_cancelled(cancel);
    tokio::pin!(cancelled);

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut cancelled => {
                warn!("Mosaic cancelled after {}/{} tiles", done, total);
                return Err(CloudError::Cancelled);
            }
            next = fetches.next() => next,
        };
        let Some((tile, result)) = next else {
            break;
        };
        done += 1;
        progress(done, total);

        let Some(bytes) = result? else {
            debug!("Tile {} absent", tile);
            continue;
        };
        let decoded = image::load_from_memory(&bytes).map_err(|source| CloudError::Decode { tile, source })?;
        let tile_pixels = PixelBuffer::from_dynamic(decoded);

        let canvas = canvas.get_or_insert_with(|| {
            let (tile_w, tile_h) = (tile_pixels.width(), tile_pixels.height());
            debug!("Canvas {}x{} tiles of {}x{}, {:?}", range.width(), range.height(), tile_w, tile_h, tile_pixels.layout());
            Canvas {
                pixels: PixelBuffer::new(
                    tile_w * range.width() as usize,
                    tile_h * range.height() as usize,
                    tile_pixels.layout(),
                ),
                tile_w,
                tile_h,
            }
        });

        if tile_pixels.is_empty() {
            debug!("Tile {} empty, skipped", tile);
            continue;
        }
        if let Some((dx, dy)) = range.offset_of(&tile) {
            canvas.pixels.paste(
                &tile_pixels,
                (canvas.tile_w * dx as usize) as i64,
                (canvas.tile_h * dy as usize) as i64,
            );
            debug!("Tile {} placed at ({}, {})", tile, dx, dy);
        }
    }

    let canvas = canvas.ok_or(CloudError::EmptyMosaic)?;
    let (x, y, w, h) = crop_window(&tbox, &range, canvas.tile_w, canvas.tile_h);
    if w == 0 || h == 0 {
        return Err(rastile_core::Error::InvalidDimensions { width: w, height: h }.into());
    }

    let mut pixels = canvas.pixels.crop(x, y, w, h);
    if pixels.has_alpha() && pixels.is_fully_opaque() {
        pixels = pixels.drop_alpha();
    }

    let (xp0, yp0) = lat_lon_to_mercator(from.0, from.1);
    let (xp1, yp1) = lat_lon_to_mercator(to.0, to.1);
    let transform = GeoTransform::new(
        xp0.min(xp1),
        yp0.max(yp1),
        (xp1 - xp0).abs() / w as f64,
        -(yp1 - yp0).abs() / h as f64,
    );

    info!("Mosaic {}x{} ({:?})", w, h, pixels.layout());
    Ok(Mosaic {
        pixels,
        transform,
        crs: CRS::web_mercator(),
        range,
    })
}

/// Resolves once `cancel` is raised; never without a flag.
async fn wait_cancelled(cancel: Option<&CancelFlag>) {
    let Some(flag) = cancel else {
        return std::future::pending().await;
    };
    let mut ticker = tokio::time::interval(CANCEL_POLL);
    while !flag.is_cancelled() {
        ticker.tick().await;
    }
}

/// Pixel window `(x, y, w, h)` of the requested box on a canvas of
/// `tile_w x tile_h` tiles. Halves round to even.
fn crop_window(tbox: &TileBox, range: &TileRange, tile_w: usize, tile_h: usize) -> (i64, i64, usize, usize) {
    let (bw, bh) = (tile_w as f64, tile_h as f64);
    let x = (bw * (tbox.x0 - range.x_min as f64)).round_ties_even() as i64;
    let y = (bh * (tbox.y0 - range.y_min as f64)).round_ties_even() as i64;
    let w = (bw * (tbox.x1 - tbox.x0)).round_ties_even() as usize;
    let h = (bh * (tbox.y1 - tbox.y0)).round_ties_even() as usize;
    (x, y, w, h)
}

/// Build a mosaic and write it as a GeoTIFF.
pub async fn write_mosaic<S: TileSource>(
    source: &S,
    from: (f64, f64),
    to: (f64, f64),
    zoom: u8,
    options: &MosaicOptions,
    path: &Path,
) -> Result<Mosaic> {
    let mosaic = build_mosaic(source, from, to, zoom, options, None).await?;
    mosaic.write(path)?;
    Ok(mosaic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_window_rounds_half_to_even() {
        let range = TileRange {
            zoom: 10,
            x_min: 10,
            y_min: 20,
            x_max: 11,
            y_max: 21,
        };
        // Offsets of 2.5 and 1.5 pixels, width 4.5, height 100
        let tbox = TileBox {
            zoom: 10,
            x0: 10.0 + 2.5 / 256.0,
            y0: 20.0 + 1.5 / 256.0,
            x1: 10.0 + 7.0 / 256.0,
            y1: 20.0 + 101.5 / 256.0,
        };
        assert_eq!(crop_window(&tbox, &range, 256, 256), (2, 2, 4, 100));
    }
}
