//! Proxy normalization
//!
//! Rescales a raw proxy raster to a byte domain centred on 125 with 15
//! levels per standard deviation. Only positive values are valid; 0 is
//! reserved for nodata in the output.

use crate::error::Result;
use crate::statistics::masked_moments;
use clearsight_core::raster::Raster;
use clearsight_parallel::{ParallelStrategy, ProcessingMode};
use tracing::debug;

/// Output value of a pixel equal to the scene mean
pub const NORMALIZED_CENTER: f64 = 125.0;
/// Output levels per standard deviation
pub const NORMALIZED_SCALE: f64 = 15.0;

/// Normalize one value against the valid-pixel moments
pub fn normalize_value(value: f64, mean: f64, std_dev: f64) -> u8 {
    if !(value > 0.0) {
        return 0;
    }
    let z = NORMALIZED_CENTER + NORMALIZED_SCALE * (value - mean) / std_dev;
    z.round().clamp(1.0, 255.0) as u8
}

/// Normalize a raw proxy raster.
///
/// Mean and population standard deviation are taken over pixels with
/// value > 0; a flat image uses a standard deviation of 1. An image without
/// valid pixels normalizes to all zeros.
pub fn normalize_proxy(
    raw: &Raster<f64>,
    mode: ProcessingMode,
    block_rows: usize,
) -> Result<Raster<u8>> {
    let (rows, cols) = raw.shape();
    let mut out = match masked_moments(raw.view(), |v| v > 0.0) {
        None => {
            debug!(rows, cols, "proxy has no valid pixels");
            raw.with_same_meta::<u8>(rows, cols)
        }
        Some(m) => {
            let std_dev = if m.std_dev == 0.0 { 1.0 } else { m.std_dev };
            debug!(valid = m.count, mean = m.mean, std_dev, "normalizing proxy");
            let data = raw.data();
            let normalized = mode.map_cells(rows, cols, block_rows, |row, col| {
                normalize_value(data[[row, col]], m.mean, std_dev)
            });
            raw.with_data(normalized)?
        }
    };
    out.set_nodata(Some(0));
    Ok(out)
}
