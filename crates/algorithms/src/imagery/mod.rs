//! Reflectance imagery
//!
//! - Band layout of the six-band surface reflectance stacks
//! - Spectral change index between a start and an end image
//! - Vegetation-index proxies (NDVI, EVI, SAVI, NDMI)

mod bands;
mod spectral_change;
mod vegetation;

pub use bands::{
    require_bands, require_reflectance, zero_band_mask, ReflectanceBand, REFLECTANCE_BANDS,
};
pub use spectral_change::{spectral_change_index, spectral_index_value, END_WEIGHTS, START_WEIGHTS};
pub use vegetation::{scale_to_proxy, vegetation_proxy, VegetationIndex};
