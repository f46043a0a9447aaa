//! Multi-band raster stacks

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, GridSpec, PixelWindow, Raster, RasterElement};
use ndarray::{s, Array2, ArrayView2};

/// A stack of co-registered bands sharing one grid.
///
/// Surface-reflectance products are read as a stack (band 0 = Blue through
/// band 5 = SWIR2), and the interpretation output is written as one.
#[derive(Debug, Clone)]
pub struct RasterStack<T: RasterElement> {
    bands: Vec<Array2<T>>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> RasterStack<T> {
    /// Build a stack from bands that all share `shape`
    pub fn from_arrays(
        bands: Vec<Array2<T>>,
        transform: GeoTransform,
        crs: Option<CRS>,
    ) -> Result<Self> {
        if let Some(first) = bands.first() {
            let (er, ec) = first.dim();
            for band in &bands[1..] {
                if band.dim() != (er, ec) {
                    return Err(Error::SizeMismatch {
                        er,
                        ec,
                        ar: band.nrows(),
                        ac: band.ncols(),
                    });
                }
            }
        }
        Ok(Self {
            bands,
            transform,
            crs,
            nodata: None,
        })
    }

    /// Number of bands
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Grid dimensions as (rows, cols); (0, 0) for an empty stack
    pub fn shape(&self) -> (usize, usize) {
        self.bands.first().map(|b| b.dim()).unwrap_or((0, 0))
    }

    /// View of band `index` (0-based)
    pub fn band(&self, index: usize) -> Result<ArrayView2<'_, T>> {
        self.bands
            .get(index)
            .map(|b| b.view())
            .ok_or(Error::BandOutOfRange {
                band: index,
                bands: self.bands.len(),
            })
    }

    /// Copy band `index` out as a georeferenced raster
    pub fn band_raster(&self, index: usize) -> Result<Raster<T>> {
        let data = self.band(index)?.to_owned();
        let mut raster = Raster::from_array(data);
        raster.set_transform(self.transform);
        raster.set_crs(self.crs.clone());
        raster.set_nodata(self.nodata);
        Ok(raster)
    }

    /// Iterate over band views in order
    pub fn bands(&self) -> impl Iterator<Item = ArrayView2<'_, T>> {
        self.bands.iter().map(|b| b.view())
    }

    /// Crop every band to `window`
    pub fn crop(&self, window: &PixelWindow) -> Result<RasterStack<T>> {
        let (rows, cols) = self.shape();
        window.check_within(rows, cols)?;
        let bands = self
            .bands
            .iter()
            .map(|b| {
                b.slice(s![
                    window.row_off..window.row_off + window.rows,
                    window.col_off..window.col_off + window.cols
                ])
                .to_owned()
            })
            .collect();
        Ok(Self {
            bands,
            transform: self.transform.offset(window.col_off, window.row_off),
            crs: self.crs.clone(),
            nodata: self.nodata,
        })
    }

    /// Grid description used for common-extent computation
    pub fn grid_spec(&self) -> GridSpec {
        let (rows, cols) = self.shape();
        GridSpec {
            transform: self.transform,
            crs: self.crs.clone(),
            rows,
            cols,
        }
    }

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the CRS
    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Set the CRS
    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }
}
