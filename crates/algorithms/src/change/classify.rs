//! Combined index and change classification
//!
//! Per pixel the spectral change index, the proxy differential and two
//! deviation tests against the baseline are fused into a combined index,
//! which then drives a fixed cascade of class rules:
//!
//! 1. default `NoClearing`
//! 2. clearing thresholds, applied in order, each later match overwriting
//! 3. proxy-only signal, overwriting any clearing class
//! 4. low start proxy resets to `NoClearing` (unless disabled)
//! 5. mask recodes
//! 6. zero reflectance band at start or end forces `Null`
//! 7. outside the acquisition footprint forces `Null`

use crate::change::masks::MaskOverrides;
use crate::error::Result;
use crate::statistics::{PixelStats, TimeSeriesStats};
use clearsight_core::raster::Raster;
use clearsight_core::Error;
use clearsight_parallel::{ParallelStrategy, ProcessingMode};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete change class written to the classification raster
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChangeClass {
    Null = 0,
    ProxyOnly = 3,
    NoClearing = 10,
    Clear1 = 34,
    Clear2 = 35,
    Clear3 = 36,
    Clear4 = 37,
    Clear5 = 38,
    Clear6 = 39,
}

impl ChangeClass {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => ChangeClass::Null,
            3 => ChangeClass::ProxyOnly,
            10 => ChangeClass::NoClearing,
            34 => ChangeClass::Clear1,
            35 => ChangeClass::Clear2,
            36 => ChangeClass::Clear3,
            37 => ChangeClass::Clear4,
            38 => ChangeClass::Clear5,
            39 => ChangeClass::Clear6,
            _ => return None,
        })
    }

    /// One of the six clearing-confidence classes
    pub fn is_clearing(self) -> bool {
        (34..=39).contains(&self.code())
    }
}

impl fmt::Display for ChangeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Conditions under which a pixel is promoted to a clearing class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearingThreshold {
    pub class: ChangeClass,
    /// Combined index must exceed this
    pub combined_above: f64,
    /// sTest must be below this, when set
    pub s_test_below: Option<f64>,
    /// Spectral index must be below this, when set
    pub spectral_below: Option<f64>,
}

impl ClearingThreshold {
    pub fn matches(&self, ix: &PixelIndices) -> bool {
        ix.combined > self.combined_above
            && self.s_test_below.map_or(true, |t| ix.s_test < t)
            && self.spectral_below.map_or(true, |t| ix.spectral < t)
    }
}

/// Clearing thresholds, each strictly harder to meet than the one before
pub const CLEARING_THRESHOLDS: [ClearingThreshold; 6] = [
    ClearingThreshold {
        class: ChangeClass::Clear1,
        combined_above: 21.80,
        s_test_below: None,
        spectral_below: None,
    },
    ClearingThreshold {
        class: ChangeClass::Clear2,
        combined_above: 27.71,
        s_test_below: Some(-0.27),
        spectral_below: Some(-0.86),
    },
    ClearingThreshold {
        class: ChangeClass::Clear3,
        combined_above: 33.40,
        s_test_below: Some(-0.60),
        spectral_below: Some(-1.19),
    },
    ClearingThreshold {
        class: ChangeClass::Clear4,
        combined_above: 39.54,
        s_test_below: Some(-1.01),
        spectral_below: Some(-1.50),
    },
    ClearingThreshold {
        class: ChangeClass::Clear5,
        combined_above: 47.05,
        s_test_below: Some(-1.55),
        spectral_below: Some(-1.84),
    },
    ClearingThreshold {
        class: ChangeClass::Clear6,
        combined_above: 58.10,
        s_test_below: Some(-2.34),
        spectral_below: Some(-2.27),
    },
];

/// Proxy-only signal: tTest above this ...
pub const PROXY_ONLY_T_TEST_ABOVE: f64 = -1.70;
/// ... and `proxyDiffStdErr` above this
pub const PROXY_ONLY_DIFF_STD_ERR_ABOVE: f64 = 740.0;

/// Raw start proxy below which a pixel cannot be classed as cleared
pub const DEFAULT_START_THRESHOLD: f64 = 108.0;

/// Deviation tests are only computed where the baseline spread reaches this
pub const MIN_DEVIATION_SPREAD: f64 = 0.2;

pub const WEIGHT_SPECTRAL: f64 = -11.972499;
pub const WEIGHT_PROXY_DIFF: f64 = -0.40357223;
pub const WEIGHT_T_TEST: f64 = -5.2609715;
pub const WEIGHT_S_TEST: f64 = -4.3794265;

/// Derived quantities at one pixel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelIndices {
    pub spectral: f64,
    pub proxy_diff: f64,
    pub s_test: f64,
    pub t_test: f64,
    pub combined: f64,
    pub proxy_diff_std_err: f64,
}

impl PixelIndices {
    /// Derive the deviation tests and combined index.
    ///
    /// # Arguments
    /// * `stats` - Baseline statistics at the pixel
    /// * `spectral` - Spectral change index at the pixel
    /// * `start_proxy` - Normalized start proxy
    /// * `end_proxy` - Normalized end proxy
    /// * `prediction_year` - Decimal year of the end date
    pub fn derive(
        stats: &PixelStats,
        spectral: f64,
        start_proxy: f64,
        end_proxy: f64,
        prediction_year: f64,
    ) -> Self {
        let proxy_diff = end_proxy - start_proxy;
        let predicted = stats.intercept + stats.slope * prediction_year;
        let s_test = if stats.std_err >= MIN_DEVIATION_SPREAD {
            (end_proxy - predicted) / stats.std_err
        } else {
            0.0
        };
        let t_test = if stats.std_dev >= MIN_DEVIATION_SPREAD {
            (end_proxy - stats.mean) / stats.std_dev
        } else {
            0.0
        };
        Self::from_parts(spectral, proxy_diff, s_test, t_test, stats.std_err)
    }

    /// Assemble from already computed tests
    pub fn from_parts(
        spectral: f64,
        proxy_diff: f64,
        s_test: f64,
        t_test: f64,
        std_err: f64,
    ) -> Self {
        let combined = WEIGHT_SPECTRAL * spectral
            + WEIGHT_PROXY_DIFF * proxy_diff
            + WEIGHT_T_TEST * t_test
            + WEIGHT_S_TEST * s_test;
        Self {
            spectral,
            proxy_diff,
            s_test,
            t_test,
            combined,
            proxy_diff_std_err: -proxy_diff * std_err,
        }
    }
}

/// Class from the index thresholds alone
pub fn clearing_class(ix: &PixelIndices) -> ChangeClass {
    let mut class = ChangeClass::NoClearing;
    for threshold in &CLEARING_THRESHOLDS {
        if threshold.matches(ix) {
            class = threshold.class;
        }
    }
    if ix.t_test > PROXY_ONLY_T_TEST_ABOVE
        && ix.proxy_diff_std_err > PROXY_ONLY_DIFF_STD_ERR_ABOVE
    {
        class = ChangeClass::ProxyOnly;
    }
    class
}

/// Per-pixel facts that override the index-driven class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelOverrides {
    /// Raw (unnormalized) start proxy value
    pub raw_start_proxy: f64,
    /// Recode of the last mask rule that hit, if any
    pub mask_recode: Option<u8>,
    /// A reflectance band is zero at start or end
    pub reflectance_nodata: bool,
    /// Outside the acquisition footprint
    pub outside_footprint: bool,
}

impl Default for PixelOverrides {
    fn default() -> Self {
        Self {
            raw_start_proxy: f64::INFINITY,
            mask_recode: None,
            reflectance_nodata: false,
            outside_footprint: false,
        }
    }
}

/// Final class code at one pixel.
///
/// `start_threshold` is `None` when the low start proxy reset is disabled.
pub fn final_class(ix: &PixelIndices, ov: &PixelOverrides, start_threshold: Option<f64>) -> u8 {
    let mut code = clearing_class(ix).code();
    if let Some(threshold) = start_threshold {
        if ov.raw_start_proxy < threshold {
            code = ChangeClass::NoClearing.code();
        }
    }
    if let Some(recode) = ov.mask_recode {
        code = recode;
    }
    if ov.reflectance_nodata || ov.outside_footprint {
        code = ChangeClass::Null.code();
    }
    code
}

/// Derived index rasters on the common grid
#[derive(Debug, Clone)]
pub struct ChangeIndices {
    pub spectral: Raster<f64>,
    pub proxy_diff: Raster<f64>,
    pub s_test: Raster<f64>,
    pub t_test: Raster<f64>,
    pub combined: Raster<f64>,
    pub proxy_diff_std_err: Raster<f64>,
}

impl ChangeIndices {
    pub fn shape(&self) -> (usize, usize) {
        self.combined.shape()
    }

    /// Indices at one pixel; caller guarantees the index is in range
    pub fn pixel(&self, row: usize, col: usize) -> PixelIndices {
        PixelIndices {
            spectral: self.spectral.data()[[row, col]],
            proxy_diff: self.proxy_diff.data()[[row, col]],
            s_test: self.s_test.data()[[row, col]],
            t_test: self.t_test.data()[[row, col]],
            combined: self.combined.data()[[row, col]],
            proxy_diff_std_err: self.proxy_diff_std_err.data()[[row, col]],
        }
    }
}

fn check_shape(expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected != actual {
        return Err(Error::SizeMismatch {
            er: expected.0,
            ec: expected.1,
            ar: actual.0,
            ac: actual.1,
        }
        .into());
    }
    Ok(())
}

/// Compute the derived index rasters.
///
/// # Arguments
/// * `stats` - Baseline statistics
/// * `spectral` - Spectral change index
/// * `start_proxy` - Normalized start proxy
/// * `end_proxy` - Normalized end proxy
/// * `prediction_year` - Decimal year of the end date
pub fn compute_indices(
    stats: &TimeSeriesStats,
    spectral: &Raster<f64>,
    start_proxy: &Raster<u8>,
    end_proxy: &Raster<u8>,
    prediction_year: f64,
    mode: ProcessingMode,
    block_rows: usize,
) -> Result<ChangeIndices> {
    let shape = stats.shape();
    check_shape(shape, spectral.shape())?;
    check_shape(shape, start_proxy.shape())?;
    check_shape(shape, end_proxy.shape())?;

    let (spec, start, end) = (spectral.data(), start_proxy.data(), end_proxy.data());
    let cells = mode.map_cells(shape.0, shape.1, block_rows, |row, col| {
        PixelIndices::derive(
            &stats.pixel(row, col),
            spec[[row, col]],
            start[[row, col]] as f64,
            end[[row, col]] as f64,
            prediction_year,
        )
    });

    let wrap = |f: fn(&PixelIndices) -> f64| spectral.with_data(cells.map(f));
    Ok(ChangeIndices {
        spectral: wrap(|p| p.spectral)?,
        proxy_diff: wrap(|p| p.proxy_diff)?,
        s_test: wrap(|p| p.s_test)?,
        t_test: wrap(|p| p.t_test)?,
        combined: wrap(|p| p.combined)?,
        proxy_diff_std_err: wrap(|p| p.proxy_diff_std_err)?,
    })
}

/// Everything the classifier reads besides the indices
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub raw_start_proxy: &'a Raster<f64>,
    pub masks: &'a MaskOverrides<'a>,
    pub reflectance_nodata: &'a Array2<bool>,
    pub footprint: Option<&'a Raster<u8>>,
    /// `None` disables the low start proxy reset
    pub start_threshold: Option<f64>,
}

/// Classify every pixel.
///
/// The output raster has nodata 0 and the georeference of the indices.
pub fn classify(
    indices: &ChangeIndices,
    ctx: &ClassifyContext<'_>,
    mode: ProcessingMode,
    block_rows: usize,
) -> Result<Raster<u8>> {
    let shape = indices.shape();
    check_shape(shape, ctx.raw_start_proxy.shape())?;
    check_shape(shape, ctx.reflectance_nodata.dim())?;
    if let Some(fp) = ctx.footprint {
        check_shape(shape, fp.shape())?;
    }
    ctx.masks.check_shape(shape)?;

    let raw_start = ctx.raw_start_proxy.data();
    let footprint = ctx.footprint.map(|fp| fp.data());
    let data = mode.map_cells(shape.0, shape.1, block_rows, |row, col| {
        let ov = PixelOverrides {
            raw_start_proxy: raw_start[[row, col]],
            mask_recode: ctx.masks.recode_at(row, col),
            reflectance_nodata: ctx.reflectance_nodata[[row, col]],
            outside_footprint: footprint.is_some_and(|fp| fp[[row, col]] == 0),
        };
        final_class(&indices.pixel(row, col), &ov, ctx.start_threshold)
    });

    let mut out = indices.combined.with_data(data)?;
    out.set_nodata(Some(ChangeClass::Null.code()));
    Ok(out)
}
