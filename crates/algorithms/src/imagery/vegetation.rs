//! Vegetation-index proxies
//!
//! Where no fractional-cover product exists, a vegetation index computed
//! from surface reflectance serves as the proxy. Indices are rescaled from
//! `[-1, 1]` into `[0, 200]` so they share the proxy domain.

use crate::error::Result;
use crate::imagery::bands::{require_bands, ReflectanceBand};
use clearsight_core::raster::{Raster, RasterStack};
use clearsight_parallel::{ParallelStrategy, ProcessingMode};
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-6;

/// Supported vegetation indices
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VegetationIndex {
    /// `(NIR - Red) / (NIR + Red)`
    #[default]
    Ndvi,
    /// `2.5 (NIR - Red) / (NIR + 6 Red - 7.5 Blue + 1)`
    Evi,
    /// `(1 + L)(NIR - Red) / (NIR + Red + L)`
    Savi { l: f64 },
    /// `(NIR - SWIR1) / (NIR + SWIR1)`
    Ndmi,
}

impl VegetationIndex {
    /// SAVI with the usual soil brightness factor
    pub fn savi() -> Self {
        VegetationIndex::Savi { l: 0.5 }
    }

    pub fn required_bands(&self) -> &'static [ReflectanceBand] {
        use ReflectanceBand::*;
        match self {
            VegetationIndex::Ndvi | VegetationIndex::Savi { .. } => &[Red, Nir],
            VegetationIndex::Evi => &[Blue, Red, Nir],
            VegetationIndex::Ndmi => &[Nir, Swir1],
        }
    }

    /// Raw index for one pixel; `px` is indexed by [`ReflectanceBand::index`]
    pub fn evaluate(&self, px: &[f64]) -> f64 {
        let blue = px[ReflectanceBand::Blue.index()];
        let red = px[ReflectanceBand::Red.index()];
        let nir = px[ReflectanceBand::Nir.index()];
        match *self {
            VegetationIndex::Ndvi => (nir - red) / (nir + red + EPS),
            VegetationIndex::Evi => 2.5 * (nir - red) / (nir + 6.0 * red - 7.5 * blue + 1.0 + EPS),
            VegetationIndex::Savi { l } => (1.0 + l) * (nir - red) / (nir + red + l + EPS),
            VegetationIndex::Ndmi => {
                let swir1 = px[ReflectanceBand::Swir1.index()];
                (nir - swir1) / (nir + swir1 + EPS)
            }
        }
    }
}

/// Rescale an index from `[-1, 1]` into the proxy domain `[0, 200]`
pub fn scale_to_proxy(vi: f64) -> f64 {
    ((vi + 1.0) * 100.0).clamp(0.0, 200.0)
}

/// Compute a vegetation-index proxy raster from a reflectance stack.
///
/// Pixels where any band of the stack is zero are nodata and come out as 0,
/// which the proxy normalizer treats as invalid.
pub fn vegetation_proxy(
    stack: &RasterStack<f64>,
    index: VegetationIndex,
    mode: ProcessingMode,
    block_rows: usize,
) -> Result<Raster<f64>> {
    require_bands(stack, "proxy", index.required_bands())?;
    let (rows, cols) = stack.shape();
    let bands: Vec<_> = stack.bands().collect();

    let data = mode.map_cells(rows, cols, block_rows, |row, col| {
        let mut px = [0.0; 6];
        for (i, band) in bands.iter().enumerate() {
            let v = band[[row, col]];
            if v == 0.0 {
                return 0.0;
            }
            if i < px.len() {
                px[i] = v;
            }
        }
        scale_to_proxy(index.evaluate(&px))
    });

    let mut out = Raster::from_array(data);
    out.set_transform(*stack.transform());
    out.set_crs(stack.crs().cloned());
    out.set_nodata(Some(0.0));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clearsight_core::GeoTransform;
    use ndarray::Array2;

    fn stack(values: [f64; 6]) -> RasterStack<f64> {
        let arrays = values.iter().map(|&v| Array2::from_elem((2, 3), v)).collect();
        RasterStack::from_arrays(arrays, GeoTransform::default(), None).unwrap()
    }

    #[test]
    fn test_ndvi_proxy() {
        let s = stack([0.04, 0.07, 0.1, 0.3, 0.2, 0.1]);
        let p =
            vegetation_proxy(&s, VegetationIndex::Ndvi, ProcessingMode::Sequential, 1).unwrap();
        let ndvi = 0.2 / (0.4 + 1e-6);
        assert_relative_eq!(p.data()[[1, 2]], (ndvi + 1.0) * 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_band_is_nodata() {
        let s = stack([0.04, 0.07, 0.1, 0.3, 0.0, 0.1]);
        let p =
            vegetation_proxy(&s, VegetationIndex::Ndvi, ProcessingMode::Sequential, 1).unwrap();
        assert!(p.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_scale_clips() {
        assert_eq!(scale_to_proxy(-3.0), 0.0);
        assert_eq!(scale_to_proxy(2.5), 200.0);
        assert_relative_eq!(scale_to_proxy(0.0), 100.0);
    }

    #[test]
    fn test_other_indices() {
        let px = [0.05, 0.08, 0.1, 0.4, 0.25, 0.12];
        assert_relative_eq!(
            VegetationIndex::savi().evaluate(&px),
            1.5 * 0.3 / (0.5 + 0.5 + 1e-6),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            VegetationIndex::Ndmi.evaluate(&px),
            0.15 / (0.65 + 1e-6),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            VegetationIndex::Evi.evaluate(&px),
            2.5 * 0.3 / (0.4 + 0.6 - 0.375 + 1.0 + 1e-6),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_missing_band() {
        let arrays = (0..3).map(|_| Array2::from_elem((2, 2), 0.1)).collect();
        let s = RasterStack::from_arrays(arrays, GeoTransform::default(), None).unwrap();
        let result = vegetation_proxy(&s, VegetationIndex::Ndvi, ProcessingMode::Sequential, 1);
        assert!(result.is_err());
    }
}
