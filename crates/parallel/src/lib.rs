//! # clearsight parallel
//!
//! Execution strategies for per-pixel raster kernels.
//!
//! Every quantity the detection engine computes depends only on one pixel's
//! values across the input stack, so the grid is cut into row blocks and the
//! blocks are evaluated independently:
//! - `ProcessingMode`: sequential, all cores, or a fixed thread count
//! - `RowBlocks`: iterator over row ranges of a grid
//!
//! Without the `parallel` feature every mode runs sequentially.

pub mod blocks;
pub mod strategy;

pub use blocks::{RowBlock, RowBlocks};
pub use strategy::{ParallelStrategy, ProcessingMode};
