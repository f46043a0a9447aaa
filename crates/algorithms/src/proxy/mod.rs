//! Vegetation proxy preparation

mod normalize;

pub use normalize::{normalize_proxy, normalize_value, NORMALIZED_CENTER, NORMALIZED_SCALE};
