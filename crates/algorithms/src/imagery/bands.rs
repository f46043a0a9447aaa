//! Six-band surface reflectance layout

use crate::error::{DetectError, Result};
use clearsight_core::raster::RasterStack;
use clearsight_core::Error;
use ndarray::{Array2, Zip};
use serde::{Deserialize, Serialize};

/// Canonical reflectance bands, in stack order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReflectanceBand {
    Blue,
    Green,
    Red,
    Nir,
    Swir1,
    Swir2,
}

impl ReflectanceBand {
    pub const ALL: [ReflectanceBand; 6] = [
        ReflectanceBand::Blue,
        ReflectanceBand::Green,
        ReflectanceBand::Red,
        ReflectanceBand::Nir,
        ReflectanceBand::Swir1,
        ReflectanceBand::Swir2,
    ];

    /// Bands the spectral change index reads
    pub const SPECTRAL: [ReflectanceBand; 4] = [
        ReflectanceBand::Green,
        ReflectanceBand::Red,
        ReflectanceBand::Swir1,
        ReflectanceBand::Swir2,
    ];

    /// 0-based position in a reflectance stack
    pub fn index(self) -> usize {
        match self {
            ReflectanceBand::Blue => 0,
            ReflectanceBand::Green => 1,
            ReflectanceBand::Red => 2,
            ReflectanceBand::Nir => 3,
            ReflectanceBand::Swir1 => 4,
            ReflectanceBand::Swir2 => 5,
        }
    }
}

/// Number of bands a reflectance stack must carry
pub const REFLECTANCE_BANDS: usize = 6;

/// Check that `stack` carries the canonical six bands.
///
/// `image` names the stack in the error ("start" or "end").
pub fn require_reflectance(stack: &RasterStack<f64>, image: &'static str) -> Result<()> {
    require_bands(stack, image, &ReflectanceBand::ALL)
}

/// Check that every band in `needed` is present in `stack`
pub fn require_bands(
    stack: &RasterStack<f64>,
    image: &'static str,
    needed: &[ReflectanceBand],
) -> Result<()> {
    let bands = stack.band_count();
    let missing: Vec<ReflectanceBand> =
        needed.iter().copied().filter(|b| b.index() >= bands).collect();
    if !missing.is_empty() {
        return Err(DetectError::InputResolution { image, bands, missing });
    }
    Ok(())
}

/// Pixels where any band of either stack is exactly zero
pub fn zero_band_mask(start: &RasterStack<f64>, end: &RasterStack<f64>) -> Result<Array2<bool>> {
    let (rows, cols) = start.shape();
    let mut mask = Array2::from_elem((rows, cols), false);
    for band in start.bands().chain(end.bands()) {
        if band.dim() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: band.nrows(),
                ac: band.ncols(),
            }
            .into());
        }
        Zip::from(&mut mask).and(band).for_each(|m, &v| *m |= v == 0.0);
    }
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearsight_core::GeoTransform;

    fn stack(bands: usize, value: f64) -> RasterStack<f64> {
        let arrays = (0..bands).map(|_| Array2::from_elem((2, 2), value)).collect();
        RasterStack::from_arrays(arrays, GeoTransform::default(), None).unwrap()
    }

    #[test]
    fn test_full_stack_accepted() {
        assert!(require_reflectance(&stack(6, 0.1), "start").is_ok());
        assert!(require_reflectance(&stack(7, 0.1), "start").is_ok());
    }

    #[test]
    fn test_short_stack_lists_missing_bands() {
        match require_reflectance(&stack(3, 0.1), "end") {
            Err(DetectError::InputResolution { image, bands, missing }) => {
                assert_eq!(image, "end");
                assert_eq!(bands, 3);
                assert_eq!(
                    missing,
                    vec![ReflectanceBand::Nir, ReflectanceBand::Swir1, ReflectanceBand::Swir2]
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(require_bands(&stack(5, 0.1), "end", &ReflectanceBand::SPECTRAL).is_err());
    }

    #[test]
    fn test_zero_band_mask() {
        let start = stack(6, 0.2);
        let mut arrays: Vec<Array2<f64>> = (0..6).map(|_| Array2::from_elem((2, 2), 0.3)).collect();
        arrays[4][[1, 0]] = 0.0;
        let end = RasterStack::from_arrays(arrays, GeoTransform::default(), None).unwrap();

        let mask = zero_band_mask(&start, &end).unwrap();
        assert!(mask[[1, 0]]);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 1);
    }
}
