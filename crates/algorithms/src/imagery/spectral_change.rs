//! Spectral change index
//!
//! Fixed-weight log-domain combination of start and end reflectance. The
//! weights are empirically fitted and must be applied exactly as given, in
//! the order given.

use crate::error::Result;
use crate::imagery::bands::{require_bands, ReflectanceBand};
use clearsight_core::raster::{Raster, RasterStack};
use clearsight_core::Error;
use clearsight_parallel::{ParallelStrategy, ProcessingMode};
use ndarray::ArrayView2;

/// Weights applied to `log1p` of the start image bands
pub const START_WEIGHTS: [(ReflectanceBand, f64); 4] = [
    (ReflectanceBand::Green, 0.77801094),
    (ReflectanceBand::Red, 1.7713253),
    (ReflectanceBand::Swir1, 2.0714311),
    (ReflectanceBand::Swir2, 2.5403550),
];

/// Weights applied to `log1p` of the end image bands
pub const END_WEIGHTS: [(ReflectanceBand, f64); 4] = [
    (ReflectanceBand::Green, -0.2996241),
    (ReflectanceBand::Red, -0.5447928),
    (ReflectanceBand::Swir1, -2.2842536),
    (ReflectanceBand::Swir2, -4.0177752),
];

/// Index value for a single pixel.
///
/// `start` and `end` are indexed by [`ReflectanceBand::index`].
pub fn spectral_index_value(start: &[f64], end: &[f64]) -> f64 {
    let mut index = 0.0;
    for (band, w) in START_WEIGHTS {
        index += w * start[band.index()].ln_1p();
    }
    for (band, w) in END_WEIGHTS {
        index += w * end[band.index()].ln_1p();
    }
    index
}

fn weighted_bands<'a>(
    stack: &'a RasterStack<f64>,
    weights: &[(ReflectanceBand, f64)],
) -> clearsight_core::Result<Vec<(ArrayView2<'a, f64>, f64)>> {
    weights
        .iter()
        .map(|&(band, w)| stack.band(band.index()).map(|view| (view, w)))
        .collect()
}

/// Compute the spectral change index between two reflectance stacks.
///
/// Negative values indicate loss of vegetation between the two dates.
///
/// # Arguments
/// * `start` - Reflectance at the start date
/// * `end` - Reflectance at the end date, same grid as `start`
pub fn spectral_change_index(
    start: &RasterStack<f64>,
    end: &RasterStack<f64>,
    mode: ProcessingMode,
    block_rows: usize,
) -> Result<Raster<f64>> {
    require_bands(start, "start", &ReflectanceBand::SPECTRAL)?;
    require_bands(end, "end", &ReflectanceBand::SPECTRAL)?;
    let (rows, cols) = start.shape();
    if end.shape() != (rows, cols) {
        let (ar, ac) = end.shape();
        return Err(Error::SizeMismatch { er: rows, ec: cols, ar, ac }.into());
    }

    let start_terms = weighted_bands(start, &START_WEIGHTS)?;
    let end_terms = weighted_bands(end, &END_WEIGHTS)?;

    let data = mode.map_cells(rows, cols, block_rows, |row, col| {
        let mut index = 0.0;
        for (view, w) in start_terms.iter().chain(end_terms.iter()) {
            index += w * view[[row, col]].ln_1p();
        }
        index
    });

    let mut out = Raster::from_array(data);
    out.set_transform(*start.transform());
    out.set_crs(start.crs().cloned());
    Ok(out)
}
