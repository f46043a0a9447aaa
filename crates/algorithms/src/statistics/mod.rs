//! Statistical reductions for raster data
//!
//! - **moments**: mean and population standard deviation over a pixel subset
//! - **timeseries**: per-pixel baseline statistics and OLS trend over a stack

pub mod moments;
pub mod timeseries;

pub use moments::{masked_moments, Moments};
pub use timeseries::{baseline_statistics, PixelStats, TimeSeriesStats};
