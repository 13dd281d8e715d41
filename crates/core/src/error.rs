//! Error types for rastile

use thiserror::Error;

/// Main error type for rastile operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: isize,
        col: isize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Affine transform is singular (determinant {determinant})")]
    SingularTransform { determinant: f64 },

    #[error("No georeferencing available for {0}")]
    MissingGeoreference(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{failed} of {total} tiles failed at zoom {zoom}")]
    TileFailures {
        zoom: u8,
        failed: usize,
        total: usize,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl From<tiff::TiffError> for Error {
    fn from(e: tiff::TiffError) -> Self {
        Error::Tiff(e.to_string())
    }
}

/// Result type alias for rastile operations
pub type Result<T> = std::result::Result<T, Error>;
