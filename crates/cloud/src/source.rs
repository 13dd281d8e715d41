//! Tile sources.

use std::future::Future;

use rastile_core::TileId;

use crate::error::Result;
use crate::http::TileFetcher;

/// Anything that can produce the encoded image of a slippy-map tile.
///
/// `Ok(None)` means the tile does not exist and is skipped.
pub trait TileSource {
    fn fetch(&self, tile: TileId) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;
}

/// OpenStreetMap standard tiles
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Tile server addressed through a `{z}`/`{x}`/`{y}` URL template.
#[derive(Debug, Clone)]
pub struct HttpTileSource {
    template: String,
    fetcher: TileFetcher,
}

impl HttpTileSource {
    pub fn new(template: impl Into<String>, fetcher: TileFetcher) -> Self {
        Self {
            template: template.into(),
            fetcher,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn fetcher(&self) -> &TileFetcher {
        &self.fetcher
    }

    pub fn url(&self, tile: TileId) -> String {
        tile.format_template(&self.template)
    }
}

impl TileSource for HttpTileSource {
    fn fetch(&self, tile: TileId) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send {
        let url = self.url(tile);
        async move { self.fetcher.fetch(&url).await }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::FetchOptions;

    #[test]
    fn test_url_expansion() {
        let fetcher = TileFetcher::new(FetchOptions::default()).unwrap();
        let source = HttpTileSource::new(DEFAULT_TILE_URL, fetcher);
        assert_eq!(
            source.url(TileId::new(12, 2200, 1343)),
            "https://tile.openstreetmap.org/12/2200/1343.png"
        );

        let fetcher = TileFetcher::new(FetchOptions::default()).unwrap();
        let custom = HttpTileSource::new("http://host/{x}-{y}@{z}.jpg", fetcher);
        assert_eq!(custom.url(TileId::new(3, 1, 2)), "http://host/1-2@3.jpg");
    }
}
