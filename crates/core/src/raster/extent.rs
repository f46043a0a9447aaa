//! Common-extent computation
//!
//! Every raster taking part in a detection run is cropped to the area all of
//! them cover before any pixel math happens.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};

/// A rectangular pixel window inside a raster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    /// First row of the window
    pub row_off: usize,
    /// First column of the window
    pub col_off: usize,
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
}

impl PixelWindow {
    /// Create a new window
    pub fn new(row_off: usize, col_off: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_off,
            col_off,
            rows,
            cols,
        }
    }

    /// Whether the window has no pixels
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Fail unless the window lies inside a `rows` x `cols` grid
    pub fn check_within(&self, rows: usize, cols: usize) -> Result<()> {
        if self.row_off + self.rows > rows || self.col_off + self.cols > cols {
            return Err(Error::IndexOutOfBounds {
                row: self.row_off + self.rows,
                col: self.col_off + self.cols,
                rows,
                cols,
            });
        }
        Ok(())
    }
}

/// Georeference and size of one grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
    pub rows: usize,
    pub cols: usize,
}

impl<T: RasterElement> Raster<T> {
    /// Grid description used for common-extent computation
    pub fn grid_spec(&self) -> GridSpec {
        GridSpec {
            transform: *self.transform(),
            crs: self.crs().cloned(),
            rows: self.rows(),
            cols: self.cols(),
        }
    }
}

/// Compute one window per grid covering the intersection of all grids.
///
/// All grids must be north-up, share a pixel size and (where known) a CRS.
/// The returned windows have identical shape, so cropping each input with its
/// window yields pixel-aligned rasters. Grids that share a transform reduce to
/// cropping from the top-left corner to the smallest rows/cols.
pub fn common_windows(grids: &[GridSpec]) -> Result<Vec<PixelWindow>> {
    let Some(reference) = grids.first() else {
        return Ok(Vec::new());
    };
    let reference_crs = grids.iter().find_map(|g| g.crs.as_ref());

    let mut min_x = f64::NEG_INFINITY;
    let mut min_y = f64::NEG_INFINITY;
    let mut max_x = f64::INFINITY;
    let mut max_y = f64::INFINITY;

    for grid in grids {
        if !grid.transform.is_north_up() {
            return Err(Error::IncompatibleGrids("rotated or south-up transform".into()));
        }
        if !grid.transform.same_resolution(&reference.transform) {
            return Err(Error::IncompatibleGrids(format!(
                "pixel size {}x{} differs from {}x{}",
                grid.transform.pixel_width,
                grid.transform.pixel_height,
                reference.transform.pixel_width,
                reference.transform.pixel_height
            )));
        }
        if let (Some(a), Some(b)) = (reference_crs, grid.crs.as_ref()) {
            if !a.is_equivalent(b) {
                return Err(Error::IncompatibleGrids(format!("CRS {} vs {}", a, b)));
            }
        }

        let (gx0, gy0, gx1, gy1) = grid.transform.bounds(grid.cols, grid.rows);
        min_x = min_x.max(gx0);
        min_y = min_y.max(gy0);
        max_x = max_x.min(gx1);
        max_y = max_y.min(gy1);
    }

    if max_x <= min_x || max_y <= min_y {
        return Err(Error::NoOverlap);
    }

    let pixel_w = reference.transform.pixel_width.abs();
    let pixel_h = reference.transform.pixel_height.abs();
    let mut rows = ((max_y - min_y) / pixel_h + 1e-6).floor() as usize;
    let mut cols = ((max_x - min_x) / pixel_w + 1e-6).floor() as usize;

    let offsets: Vec<(usize, usize)> = grids
        .iter()
        .map(|grid| {
            let col_off = ((min_x - grid.transform.origin_x) / pixel_w).round().max(0.0) as usize;
            let row_off = ((grid.transform.origin_y - max_y) / pixel_h).round().max(0.0) as usize;
            (row_off, col_off)
        })
        .collect();

    for (grid, &(row_off, col_off)) in grids.iter().zip(&offsets) {
        rows = rows.min(grid.rows.saturating_sub(row_off));
        cols = cols.min(grid.cols.saturating_sub(col_off));
    }

    if rows == 0 || cols == 0 {
        return Err(Error::NoOverlap);
    }

    Ok(offsets
        .into_iter()
        .map(|(row_off, col_off)| PixelWindow::new(row_off, col_off, rows, cols))
        .collect())
}
