//! Seasonal-window clearing detection
//!
//! Runs one change request end to end: baseline selection, common-extent
//! cropping, proxy normalization, baseline statistics, spectral change
//! index, classification and the interpretation raster.

use crate::change::classify::{
    classify, compute_indices, ChangeClass, ChangeIndices, ClassifyContext,
};
use crate::change::interpret::render_interpretation;
use crate::change::masks::{MaskLayer, MaskOverrides};
use crate::change::params::DetectionParams;
use crate::error::{DetectError, Result};
use crate::imagery::{require_reflectance, spectral_change_index, zero_band_mask};
use crate::proxy::normalize_proxy;
use crate::seasonal::{select_baseline, DateTag};
use crate::statistics::baseline_statistics;
use clearsight_core::io::{write_geotiff_stack_u8, write_geotiff_u8};
use clearsight_core::raster::{common_windows, GridSpec, Raster, RasterStack};
use clearsight_core::Algorithm;
use ndarray::{Array2, Zip};
use std::path::Path;
use tracing::{debug, info, warn};

/// Value written to diagnostic indices at masked and null pixels
pub const DIAGNOSTIC_FILL: f64 = -10000.0;

/// One dated vegetation-proxy raster
#[derive(Debug, Clone)]
pub struct ProxyObservation {
    pub date: DateTag,
    pub raster: Raster<f64>,
}

impl ProxyObservation {
    pub fn new(date: DateTag, raster: Raster<f64>) -> Self {
        Self { date, raster }
    }
}

/// Inputs of one detection run
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub start_date: DateTag,
    pub end_date: DateTag,
    /// Six-band reflectance at the start date
    pub start_reflectance: RasterStack<f64>,
    /// Six-band reflectance at the end date
    pub end_reflectance: RasterStack<f64>,
    /// Proxy observations spanning the lookback period and both dates
    pub proxies: Vec<ProxyObservation>,
    pub masks: Vec<MaskLayer>,
    /// Zero outside the acquisition footprint
    pub footprint: Option<Raster<u8>>,
}

impl DetectionRequest {
    pub fn new(
        start_date: DateTag,
        end_date: DateTag,
        start_reflectance: RasterStack<f64>,
        end_reflectance: RasterStack<f64>,
        proxies: Vec<ProxyObservation>,
    ) -> Self {
        Self {
            start_date,
            end_date,
            start_reflectance,
            end_reflectance,
            proxies,
            masks: Vec::new(),
            footprint: None,
        }
    }

    pub fn with_masks(mut self, masks: Vec<MaskLayer>) -> Self {
        self.masks = masks;
        self
    }

    pub fn with_footprint(mut self, footprint: Raster<u8>) -> Self {
        self.footprint = Some(footprint);
        self
    }
}

/// Result of one detection run
#[derive(Debug, Clone)]
pub struct DetectionOutput {
    /// Class codes, nodata 0
    pub classification: Raster<u8>,
    /// Stretched spectral, sTest, combined and clearing probability
    pub interpretation: RasterStack<u8>,
    pub indices: ChangeIndices,
    pub baseline_dates: Vec<DateTag>,
    pub start_proxy_date: DateTag,
    pub end_proxy_date: DateTag,
    /// Baseline fell back to every in-window date
    pub baseline_fell_back: bool,
}

impl DetectionOutput {
    /// Write the classification and interpretation rasters as GeoTIFFs.
    ///
    /// Either both files are written or neither is left behind.
    pub fn write<P, Q>(&self, classification_path: P, interpretation_path: Q) -> Result<()>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let class_path = classification_path.as_ref();
        let interp_path = interpretation_path.as_ref();
        write_geotiff_u8(&self.classification, class_path)?;
        if let Err(err) = write_geotiff_stack_u8(&self.interpretation, interp_path) {
            if let Err(cleanup) = std::fs::remove_file(class_path) {
                warn!(
                    path = %class_path.display(),
                    error = %cleanup,
                    "could not remove partial output"
                );
            }
            return Err(err.into());
        }
        info!(
            classification = %class_path.display(),
            interpretation = %interp_path.display(),
            "outputs written"
        );
        Ok(())
    }

    /// Index stack `[combined, spectral, proxyDiff, sTest, tTest]`.
    ///
    /// Masked (class above 100) and null pixels hold [`DIAGNOSTIC_FILL`].
    pub fn diagnostic_indices(&self) -> Result<RasterStack<f64>> {
        let classes = self.classification.data();
        let sources = [
            &self.indices.combined,
            &self.indices.spectral,
            &self.indices.proxy_diff,
            &self.indices.s_test,
            &self.indices.t_test,
        ];
        let bands: Vec<Array2<f64>> = sources
            .iter()
            .map(|r| {
                let mut band = r.data().clone();
                Zip::from(&mut band).and(classes).for_each(|v, &class| {
                    if class > 100 || class == ChangeClass::Null.code() {
                        *v = DIAGNOSTIC_FILL;
                    }
                });
                band
            })
            .collect();
        let mut stack = RasterStack::from_arrays(
            bands,
            *self.classification.transform(),
            self.classification.crs().cloned(),
        )?;
        stack.set_nodata(Some(DIAGNOSTIC_FILL));
        Ok(stack)
    }

    /// Number of pixels per class code
    pub fn class_counts(&self) -> Vec<(u8, usize)> {
        let mut counts = [0usize; 256];
        for &c in self.classification.data().iter() {
            counts[c as usize] += 1;
        }
        counts
            .iter()
            .enumerate()
            .filter(|(_, &n)| n > 0)
            .map(|(c, &n)| (c as u8, n))
            .collect()
    }
}

fn zero_outside(raster: &Raster<f64>, footprint: Option<&Raster<u8>>) -> Result<Raster<f64>> {
    let Some(fp) = footprint else {
        return Ok(raster.clone());
    };
    let mut data = raster.data().clone();
    if data.dim() != fp.data().dim() {
        let (er, ec) = data.dim();
        return Err(clearsight_core::Error::SizeMismatch {
            er,
            ec,
            ar: fp.rows(),
            ac: fp.cols(),
        }
        .into());
    }
    Zip::from(&mut data).and(fp.data()).for_each(|v, &f| {
        if f == 0 {
            *v = 0.0;
        }
    });
    Ok(raster.with_data(data)?)
}

/// Detect vegetation clearing between the start and end dates.
///
/// Fails without producing output when parameters are invalid, a
/// reflectance stack lacks bands, the baseline is too small, a start/end
/// proxy cannot be resolved, or the inputs share no common extent.
pub fn detect_clearing(
    request: &DetectionRequest,
    params: &DetectionParams,
) -> Result<DetectionOutput> {
    params.validate()?;
    require_reflectance(&request.start_reflectance, "start")?;
    require_reflectance(&request.end_reflectance, "end")?;

    let mode = params.processing_mode();
    let block_rows = params.block_rows;
    let (start_date, end_date) = (request.start_date, request.end_date);

    // Baseline selection
    let dates: Vec<DateTag> = request.proxies.iter().map(|p| p.date).collect();
    let selector = params.selector_params(start_date, end_date);
    let selection = select_baseline(&dates, start_date, end_date, &selector)?;
    let baseline_dates: Vec<DateTag> = selection.baseline.iter().map(|&i| dates[i]).collect();
    info!(
        window = %selector.window,
        baseline = ?baseline_dates.iter().map(ToString::to_string).collect::<Vec<_>>(),
        start_proxy = %dates[selection.start],
        end_proxy = %dates[selection.end],
        "baseline selected"
    );

    // Common extent over every participating raster
    let mut used: Vec<usize> = selection.baseline.clone();
    for idx in [selection.start, selection.end] {
        if !used.contains(&idx) {
            used.push(idx);
        }
    }
    let mut grids: Vec<GridSpec> = vec![
        request.start_reflectance.grid_spec(),
        request.end_reflectance.grid_spec(),
    ];
    grids.extend(used.iter().map(|&i| request.proxies[i].raster.grid_spec()));
    grids.extend(request.masks.iter().map(|m| m.raster.grid_spec()));
    grids.extend(request.footprint.iter().map(Raster::grid_spec));
    let windows = common_windows(&grids).map_err(DetectError::from_extent)?;
    let (rows, cols) = (windows[0].rows, windows[0].cols);
    debug!(rows, cols, inputs = grids.len(), "common extent");

    let mut window_iter = windows.iter();
    let mut next_window = || {
        window_iter
            .next()
            .ok_or_else(|| DetectError::ShapeMismatch("missing crop window".into()))
    };
    let start_reflectance = request.start_reflectance.crop(next_window()?)?;
    let end_reflectance = request.end_reflectance.crop(next_window()?)?;
    let mut proxies: Vec<(usize, Raster<f64>)> = Vec::with_capacity(used.len());
    for &i in &used {
        proxies.push((i, request.proxies[i].raster.crop(next_window()?)?));
    }
    let mut masks = Vec::with_capacity(request.masks.len());
    for m in &request.masks {
        masks.push(MaskLayer::new(m.kind, m.acquisition, m.raster.crop(next_window()?)?));
    }
    let footprint = match &request.footprint {
        Some(fp) => Some(fp.crop(next_window()?)?),
        None => None,
    };
    let cropped = |idx: usize| {
        proxies
            .iter()
            .find(|(i, _)| *i == idx)
            .map(|(_, r)| r)
            .ok_or_else(|| {
                DetectError::InvalidConfig(format!("proxy {idx} was not cropped"))
            })
    };

    // Normalization and baseline statistics
    let mut baseline = Vec::with_capacity(selection.baseline.len());
    for &i in &selection.baseline {
        baseline.push(normalize_proxy(cropped(i)?, mode, block_rows)?);
    }
    let times: Vec<f64> = baseline_dates.iter().map(DateTag::decimal_year).collect();
    let stats = baseline_statistics(&baseline, &times, mode, block_rows)?;

    let raw_start = cropped(selection.start)?;
    let start_proxy = normalize_proxy(raw_start, mode, block_rows)?;
    let end_proxy = normalize_proxy(cropped(selection.end)?, mode, block_rows)?;

    // Indices and classification
    let spectral = spectral_change_index(&start_reflectance, &end_reflectance, mode, block_rows)?;
    let indices = compute_indices(
        &stats,
        &spectral,
        &start_proxy,
        &end_proxy,
        end_date.decimal_year(),
        mode,
        block_rows,
    )?;

    let reflectance_nodata = zero_band_mask(&start_reflectance, &end_reflectance)?;
    let mask_rules = MaskOverrides::resolve(&masks, params.omit_cloud_masks);
    let ctx = ClassifyContext {
        raw_start_proxy: raw_start,
        masks: &mask_rules,
        reflectance_nodata: &reflectance_nodata,
        footprint: footprint.as_ref(),
        start_threshold: params.effective_start_threshold(),
    };
    let classification = classify(&indices, &ctx, mode, block_rows)?;

    // Interpretation
    let fp = footprint.as_ref();
    let interpretation = render_interpretation(
        &zero_outside(&indices.spectral, fp)?,
        &zero_outside(&indices.s_test, fp)?,
        &zero_outside(&indices.combined, fp)?,
        mode,
        block_rows,
    )?;

    let output = DetectionOutput {
        classification,
        interpretation,
        indices,
        baseline_dates,
        start_proxy_date: dates[selection.start],
        end_proxy_date: dates[selection.end],
        baseline_fell_back: selection.fell_back,
    };
    info!(rows, cols, classes = ?output.class_counts(), "clearing detection complete");
    Ok(output)
}

/// [`detect_clearing`] behind the common [`Algorithm`] interface
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalChangeDetector;

impl Algorithm for SeasonalChangeDetector {
    type Input = DetectionRequest;
    type Output = DetectionOutput;
    type Params = DetectionParams;
    type Error = DetectError;

    fn name(&self) -> &'static str {
        "SeasonalChangeDetector"
    }

    fn description(&self) -> &'static str {
        "Seasonal-window vegetation clearing detection from a reflectance pair and proxy series"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        detect_clearing(&input, &params)
    }
}
