//! I/O operations for reading and writing geospatial data

mod native;
pub mod window;
pub mod worldfile;

pub use native::{
    read_geotiff, read_geotiff_bands, read_geotiff_from_buffer, write_geotiff,
    write_geotiff_to_buffer, Compression, GeoTiffOptions,
};
pub use window::{read_block, write_block, BlockBounds, WindowedRead};
pub use worldfile::{read_world_file, world_file_path, write_world_file};
