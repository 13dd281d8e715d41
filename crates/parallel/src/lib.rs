//! # Rastile Parallel
//!
//! Block-wise processing of large rasters.
//!
//! This crate provides:
//! - `BlockGrid`: overlapping block planning with border trimming
//! - `BlockPipeline`: sequential read/transform/commit over a block grid
//! - `ProcessingMode`: worker pool sizing for per-tile parallel work

pub mod blocks;
pub mod pipeline;
pub mod strategy;

pub use blocks::{Block, BlockGrid};
pub use pipeline::{process_geotiff, run_on_image, BlockPipeline, BlockTransform, PipelineParams};
pub use strategy::{ParallelStrategy, ProcessingMode};
