//! Per-pixel baseline statistics
//!
//! Mean, population standard deviation, standard error and an ordinary
//! least-squares trend of the normalized proxy against decimal year, all
//! computed independently per pixel.

use crate::error::{DetectError, Result};
use clearsight_core::raster::Raster;
use clearsight_core::Error;
use clearsight_parallel::{ParallelStrategy, ProcessingMode};
use ndarray::Array2;
use tracing::debug;

/// Statistics of one pixel's baseline series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelStats {
    pub mean: f64,
    pub std_dev: f64,
    pub std_err: f64,
    pub slope: f64,
    pub intercept: f64,
}

impl PixelStats {
    /// Statistics for a single series against its time coordinates
    pub fn from_series(values: &[f64], times: &[f64]) -> Self {
        let (t_mean, t_ss) = time_moments(times);
        reduce(values.len(), |i| values[i], times, t_mean, t_ss)
    }
}

/// Per-pixel baseline statistics as rasters on the baseline grid
#[derive(Debug, Clone)]
pub struct TimeSeriesStats {
    pub mean: Raster<f64>,
    pub std_dev: Raster<f64>,
    pub std_err: Raster<f64>,
    pub slope: Raster<f64>,
    pub intercept: Raster<f64>,
}

impl TimeSeriesStats {
    pub fn shape(&self) -> (usize, usize) {
        self.mean.shape()
    }

    /// Statistics at one pixel; caller guarantees the index is in range
    pub fn pixel(&self, row: usize, col: usize) -> PixelStats {
        PixelStats {
            mean: self.mean.data()[[row, col]],
            std_dev: self.std_dev.data()[[row, col]],
            std_err: self.std_err.data()[[row, col]],
            slope: self.slope.data()[[row, col]],
            intercept: self.intercept.data()[[row, col]],
        }
    }
}

fn time_moments(times: &[f64]) -> (f64, f64) {
    if times.is_empty() {
        return (0.0, 0.0);
    }
    let t_mean = times.iter().sum::<f64>() / times.len() as f64;
    let t_ss = times.iter().map(|t| (t - t_mean) * (t - t_mean)).sum();
    (t_mean, t_ss)
}

fn reduce<F>(n: usize, y: F, times: &[f64], t_mean: f64, t_ss: f64) -> PixelStats
where
    F: Fn(usize) -> f64,
{
    let nf = n as f64;
    let mean = (0..n).map(&y).sum::<f64>() / nf;
    let var = (0..n).map(|i| (y(i) - mean) * (y(i) - mean)).sum::<f64>() / nf;
    let std_dev = var.sqrt();

    if n <= 1 {
        return PixelStats {
            mean,
            std_dev,
            std_err: 0.0,
            slope: 0.0,
            intercept: mean,
        };
    }

    let std_err = std_dev / nf.sqrt();
    if t_ss == 0.0 {
        return PixelStats {
            mean,
            std_dev,
            std_err,
            slope: 0.0,
            intercept: mean,
        };
    }
    let sxy: f64 = (0..n).map(|i| (times[i] - t_mean) * (y(i) - mean)).sum();
    let slope = sxy / t_ss;
    PixelStats {
        mean,
        std_dev,
        std_err,
        slope,
        intercept: mean - slope * t_mean,
    }
}

/// Compute baseline statistics over a stack of normalized proxy rasters.
///
/// # Arguments
/// * `samples` - Normalized baseline rasters, all of one shape
/// * `times` - Decimal-year time coordinate of each sample
/// * `mode` - Execution mode for the per-pixel reductions
/// * `block_rows` - Row-block height used to shard the grid
///
/// With a single sample the trend degenerates to `slope = 0`,
/// `intercept = mean` and `std_err = 0`; the same trend applies when all
/// samples share one time coordinate.
pub fn baseline_statistics(
    samples: &[Raster<u8>],
    times: &[f64],
    mode: ProcessingMode,
    block_rows: usize,
) -> Result<TimeSeriesStats> {
    let Some(first) = samples.first() else {
        return Err(DetectError::InsufficientBaseline { found: 0, required: 1 });
    };
    if times.len() != samples.len() {
        return Err(DetectError::InvalidConfig(format!(
            "{} baseline samples but {} time coordinates",
            samples.len(),
            times.len()
        )));
    }
    let (rows, cols) = first.shape();
    for s in &samples[1..] {
        if s.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: s.rows(),
                ac: s.cols(),
            }
            .into());
        }
    }

    let (t_mean, t_ss) = time_moments(times);
    debug!(n = samples.len(), t_mean, t_ss, "baseline time coordinates");

    let layers: Vec<&Array2<u8>> = samples.iter().map(|s| s.data()).collect();
    let cells = mode.map_cells(rows, cols, block_rows, |row, col| {
        reduce(layers.len(), |i| layers[i][[row, col]] as f64, times, t_mean, t_ss)
    });

    let wrap = |f: fn(&PixelStats) -> f64| first.with_data(cells.map(f));
    Ok(TimeSeriesStats {
        mean: wrap(|p| p.mean)?,
        std_dev: wrap(|p| p.std_dev)?,
        std_err: wrap(|p| p.std_err)?,
        slope: wrap(|p| p.slope)?,
        intercept: wrap(|p| p.intercept)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seasonal::DateTag;
    use approx::assert_relative_eq;

    fn flat(value: u8) -> Raster<u8> {
        Raster::filled(3, 4, value)
    }

    fn years(tags: &[&str]) -> Vec<f64> {
        tags.iter().map(|t| DateTag::parse(t).unwrap().decimal_year()).collect()
    }

    #[test]
    fn test_regression_increasing_series() {
        let samples = vec![flat(120), flat(130), flat(140)];
        let times = years(&["20170115", "20180115", "20190115"]);
        let stats = baseline_statistics(&samples, &times, ProcessingMode::Sequential, 2).unwrap();

        let p = stats.pixel(1, 2);
        assert_relative_eq!(p.mean, 130.0);
        assert_relative_eq!(p.std_dev, (200.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(p.std_err, p.std_dev / 3.0f64.sqrt(), epsilon = 1e-12);
        assert!(p.slope > 0.0);
        assert_relative_eq!(p.slope, 10.0, epsilon = 1e-9);
        // fitted line passes through the earliest sample
        assert_relative_eq!(p.intercept + p.slope * times[0], 120.0, epsilon = 1e-6);
    }

    #[test]
    fn test_single_sample_degenerates() {
        let stats =
            baseline_statistics(&[flat(140)], &[2019.04], ProcessingMode::Sequential, 8).unwrap();
        let p = stats.pixel(0, 0);
        assert_eq!(p.slope, 0.0);
        assert_eq!(p.std_err, 0.0);
        assert_eq!(p.intercept, p.mean);
        assert_relative_eq!(p.mean, 140.0);
    }

    #[test]
    fn test_identical_times_have_no_trend() {
        let p = PixelStats::from_series(&[100.0, 110.0], &[2019.5, 2019.5]);
        assert_eq!(p.slope, 0.0);
        assert_relative_eq!(p.intercept, 105.0);
        assert_relative_eq!(p.std_err, 5.0 / 2.0f64.sqrt());
    }

    #[test]
    fn test_zero_pixels_are_part_of_the_series() {
        let p = PixelStats::from_series(&[0.0, 100.0], &[2018.0, 2019.0]);
        assert_relative_eq!(p.mean, 50.0);
        assert_relative_eq!(p.slope, 100.0);
    }

    #[test]
    fn test_mode_independent() {
        let mut a = Raster::<u8>::new(9, 5);
        let mut b = Raster::<u8>::new(9, 5);
        for r in 0..9 {
            for c in 0..5 {
                a.set(r, c, (r * 7 + c) as u8 + 1).unwrap();
                b.set(r, c, (r * 3 + c * 11) as u8 + 1).unwrap();
            }
        }
        let samples = vec![a, b];
        let times = [2018.1, 2019.3];
        let seq = baseline_statistics(&samples, &times, ProcessingMode::Sequential, 2).unwrap();
        let par =
            baseline_statistics(&samples, &times, ProcessingMode::ParallelWith(3), 4).unwrap();
        assert_eq!(seq.slope.data(), par.slope.data());
        assert_eq!(seq.intercept.data(), par.intercept.data());
    }

    #[test]
    fn test_rejects_mismatched_inputs() {
        assert!(matches!(
            baseline_statistics(&[], &[], ProcessingMode::Sequential, 4),
            Err(DetectError::InsufficientBaseline { .. })
        ));
        let short_times =
            baseline_statistics(&[flat(1), flat(2)], &[2019.0], ProcessingMode::Sequential, 4);
        assert!(short_times.is_err());
        let odd = Raster::<u8>::filled(2, 2, 1);
        let mismatched = baseline_statistics(
            &[flat(1), odd],
            &[2018.0, 2019.0],
            ProcessingMode::Sequential,
            4,
        );
        assert!(matches!(mismatched, Err(DetectError::Raster(_))));
    }
}
