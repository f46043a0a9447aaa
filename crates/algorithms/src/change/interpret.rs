//! Interpretation raster
//!
//! Byte rendering of the spectral index, sTest and combined index for
//! visual review, plus a bounded clearing probability.

use crate::error::Result;
use crate::statistics::masked_moments;
use clearsight_core::raster::{Raster, RasterStack};
use clearsight_core::Error;
use clearsight_parallel::{ParallelStrategy, ProcessingMode};
use ndarray::Array2;
use tracing::debug;

/// Stretch width, in standard deviations, for the spectral index
pub const SPECTRAL_WIDTH: f64 = 2.0;
/// Stretch width for sTest
pub const S_TEST_WIDTH: f64 = 10.0;
/// Stretch width for the combined index
pub const COMBINED_WIDTH: f64 = 10.0;

/// Linear stretch into a byte range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stretch {
    pub center: f64,
    pub spread: f64,
    /// Half-width of the stretched interval in units of `spread`
    pub width: f64,
    pub lo: f64,
    pub hi: f64,
    /// Input value rendered as 0
    pub ignore: f64,
}

impl Default for Stretch {
    fn default() -> Self {
        Self {
            center: 0.0,
            spread: 1.0,
            width: 2.0,
            lo: 1.0,
            hi: 255.0,
            ignore: 0.0,
        }
    }
}

impl Stretch {
    /// Stretch centred on the mean and spread of the nonzero pixels.
    ///
    /// Without nonzero pixels the stretch is centred on 0 with unit spread;
    /// a zero spread is replaced by 1.
    pub fn fit(raster: &Raster<f64>, width: f64) -> Self {
        let (center, spread) = match masked_moments(raster.view(), |v| v != 0.0 && !v.is_nan()) {
            Some(m) if m.std_dev > 0.0 => (m.mean, m.std_dev),
            Some(m) => (m.mean, 1.0),
            None => (0.0, 1.0),
        };
        Self {
            center,
            spread,
            width,
            ..Self::default()
        }
    }

    /// `clamp(lo + (v - c + s K)(hi - lo) / (2 s K), lo, hi)`, truncated to a byte
    pub fn apply(&self, value: f64) -> u8 {
        if value == self.ignore {
            return 0;
        }
        let sk = self.spread * self.width;
        let out = self.lo + (value - self.center + sk) * (self.hi - self.lo) / (sk * 2.0);
        out.clamp(self.lo, self.hi) as u8
    }
}

/// Probability (0 to 200) that a combined index value reflects clearing
pub fn clearing_probability(combined: f64) -> u8 {
    if !(combined > 0.0) {
        return 0;
    }
    let p = 200.0 * (1.0 - (-(0.01227 * combined).powf(3.18975)).exp());
    p.round().clamp(0.0, 200.0) as u8
}

/// Render the 4-band interpretation raster.
///
/// Bands: stretched spectral index, stretched sTest, stretched combined
/// index, clearing probability. Every band is 0 where the spectral index
/// is exactly 0.
pub fn render_interpretation(
    spectral: &Raster<f64>,
    s_test: &Raster<f64>,
    combined: &Raster<f64>,
    mode: ProcessingMode,
    block_rows: usize,
) -> Result<RasterStack<u8>> {
    let (rows, cols) = spectral.shape();
    for r in [s_test, combined] {
        if r.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: r.rows(),
                ac: r.cols(),
            }
            .into());
        }
    }

    let stretches = [
        Stretch::fit(spectral, SPECTRAL_WIDTH),
        Stretch::fit(s_test, S_TEST_WIDTH),
        Stretch::fit(combined, COMBINED_WIDTH),
    ];
    for (name, s) in ["spectral", "s_test", "combined"].iter().zip(&stretches) {
        debug!(
            band = name,
            center = s.center,
            spread = s.spread,
            width = s.width,
            "stretch"
        );
    }

    let (sp, st, cb) = (spectral.data(), s_test.data(), combined.data());
    let pixels = mode.map_cells(rows, cols, block_rows, |row, col| {
        let spectral_value = sp[[row, col]];
        if spectral_value == 0.0 {
            return [0u8; 4];
        }
        [
            stretches[0].apply(spectral_value),
            stretches[1].apply(st[[row, col]]),
            stretches[2].apply(cb[[row, col]]),
            clearing_probability(cb[[row, col]]),
        ]
    });

    let bands: Vec<Array2<u8>> = (0..4).map(|b| pixels.map(|px| px[b])).collect();
    let mut stack =
        RasterStack::from_arrays(bands, *spectral.transform(), spectral.crs().cloned())?;
    stack.set_nodata(Some(0));
    Ok(stack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_ignore_value_always_zero() {
        for (center, spread, width) in [(0.0, 1.0, 2.0), (-3.5, 0.2, 10.0), (120.0, 44.0, 10.0)] {
            let s = Stretch {
                center,
                spread,
                width,
                ..Stretch::default()
            };
            assert_eq!(s.apply(0.0), 0);
        }
    }

    #[test]
    fn test_stretch_range() {
        let s = Stretch {
            center: 10.0,
            spread: 2.0,
            width: 2.0,
            ..Stretch::default()
        };
        assert_eq!(s.apply(10.0), 128);
        assert_eq!(s.apply(6.0), 1);
        assert_eq!(s.apply(-100.0), 1);
        assert_eq!(s.apply(14.0), 255);
        assert_eq!(s.apply(1e9), 255);
    }

    #[test]
    fn test_fit_uses_nonzero_pixels() {
        let r = Raster::from_array(array![[0.0, 2.0], [4.0, 0.0]]);
        let s = Stretch::fit(&r, 10.0);
        assert_eq!(s.center, 3.0);
        assert_eq!(s.spread, 1.0);

        let flat = Raster::from_array(array![[5.0, 5.0]]);
        assert_eq!(Stretch::fit(&flat, 2.0).spread, 1.0);

        let empty = Raster::from_array(array![[0.0, 0.0]]);
        let s = Stretch::fit(&empty, 2.0);
        assert_eq!((s.center, s.spread), (0.0, 1.0));
    }

    #[test]
    fn test_clearing_probability() {
        assert_eq!(clearing_probability(0.0), 0);
        assert_eq!(clearing_probability(-25.0), 0);
        assert_eq!(clearing_probability(f64::NAN), 0);
        assert_eq!(clearing_probability(1000.0), 200);
        // (0.01227 * 81.5)^3.18975 is about 1
        let mid = clearing_probability(81.5);
        assert!((125..=128).contains(&mid), "got {mid}");
        assert!(clearing_probability(30.0) < clearing_probability(60.0));
    }

    #[test]
    fn test_render_zeroes_null_spectral() {
        let spectral = Raster::from_array(array![[0.0, -2.0], [1.0, 0.5]]);
        let s_test = Raster::from_array(array![[3.0, -4.0], [1.0, 0.0]]);
        let combined = Raster::from_array(array![[80.0, 40.0], [-5.0, 10.0]]);
        let out =
            render_interpretation(&spectral, &s_test, &combined, ProcessingMode::Sequential, 1)
                .unwrap();

        assert_eq!(out.band_count(), 4);
        for b in 0..4 {
            assert_eq!(out.band(b).unwrap()[[0, 0]], 0);
        }
        assert!(out.band(3).unwrap()[[0, 1]] > 0);
        assert_eq!(out.band(3).unwrap()[[1, 0]], 0);
        // sTest of exactly 0 is the ignore value
        assert_eq!(out.band(1).unwrap()[[1, 1]], 0);
        assert_eq!(out.nodata(), Some(0));
    }
}
