//! # clearsight core
//!
//! Core raster types and I/O shared by the clearsight detection engine.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced single-band grid
//! - `RasterStack<T>`: co-registered multi-band grid (reflectance stacks, interpretation output)
//! - `GeoTransform`: affine georeferencing and common-extent windows
//! - `CRS`: coordinate reference system tag carried through a run
//! - GeoTIFF reading and writing without a GDAL dependency

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{common_windows, GeoTransform, PixelWindow, Raster, RasterElement, RasterStack};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, PixelWindow, Raster, RasterElement, RasterStack};
    pub use crate::Algorithm;
}

/// Core trait for the analysis steps built on top of this crate.
///
/// Algorithms are pure functions of their input and parameters; any file
/// writing happens outside `execute`.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;
}
