//! Change classification
//!
//! - **classify**: combined index and the class cascade
//! - **masks**: quality-mask recode rules
//! - **interpret**: interpretation raster and clearing probability
//! - **params**: run parameters
//! - **engine**: end-to-end detection run

pub mod classify;
pub mod engine;
pub mod interpret;
pub mod masks;
pub mod params;

pub use classify::{
    classify, clearing_class, compute_indices, final_class, ChangeClass, ChangeIndices,
    ClassifyContext, ClearingThreshold, PixelIndices, PixelOverrides, CLEARING_THRESHOLDS,
    DEFAULT_START_THRESHOLD,
};
pub use engine::{
    detect_clearing, DetectionOutput, DetectionRequest, ProxyObservation, SeasonalChangeDetector,
    DIAGNOSTIC_FILL,
};
pub use interpret::{
    clearing_probability, render_interpretation, Stretch, COMBINED_WIDTH, SPECTRAL_WIDTH,
    S_TEST_WIDTH,
};
pub use masks::{Acquisition, MaskKind, MaskLayer, MaskOverrides, MaskRule, STANDARD_MASK_RULES};
pub use params::DetectionParams;
