//! ESRI world files (`.tfw`)

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::raster::GeoTransform;

/// Sidecar world-file path for a raster: same stem, `.tfw` extension.
pub fn world_file_path(raster_path: &Path) -> PathBuf {
    raster_path.with_extension("tfw")
}

/// Parse the six whitespace-separated coefficients `A D B E C F`.
pub fn parse_world_file(content: &str) -> Result<GeoTransform> {
    let values = content
        .split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| Error::InvalidParameter {
                name: "world file",
                value: token.to_string(),
                reason: "not a number".to_string(),
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let lines: [f64; 6] = values.as_slice().try_into().map_err(|_| Error::InvalidParameter {
        name: "world file",
        value: values.len().to_string(),
        reason: "expected exactly 6 coefficients".to_string(),
    })?;

    Ok(GeoTransform::from_world_file(lines))
}

pub fn read_world_file(path: &Path) -> Result<GeoTransform> {
    parse_world_file(&fs::read_to_string(path)?)
}

pub fn write_world_file(path: &Path, transform: &GeoTransform) -> Result<()> {
    let body: String = transform
        .to_world_file()
        .iter()
        .map(|v| format!("{}\n", v))
        .collect();
    fs::write(path, body)?;
    Ok(())
}
