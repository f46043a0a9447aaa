//! Raster data structures and operations

mod element;
mod extent;
mod geotransform;
mod grid;
mod stack;

pub use element::RasterElement;
pub use extent::{common_windows, GridSpec, PixelWindow};
pub use geotransform::GeoTransform;
pub use grid::Raster;
pub use stack::RasterStack;
