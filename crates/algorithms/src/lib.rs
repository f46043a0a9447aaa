//! # clearsight algorithms
//!
//! Seasonal-window vegetation clearing detection.
//!
//! ## Modules
//!
//! - **seasonal**: date tags, seasonal windows, date catalogs, baseline selection
//! - **proxy**: vegetation proxy normalization
//! - **statistics**: per-pixel baseline statistics and trend
//! - **imagery**: reflectance band layout, spectral change index, vegetation indices
//! - **change**: combined index, classification, mask rules, interpretation, engine
//!
//! A run takes a start/end reflectance pair and a dated series of vegetation
//! proxy rasters and produces a classification raster plus a 4-band
//! interpretation raster; see [`change::detect_clearing`].

pub mod change;
pub mod error;
pub mod imagery;
pub mod proxy;
pub mod seasonal;
pub mod statistics;

pub use error::{DetectError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::change::{
        detect_clearing, Acquisition, ChangeClass, DetectionOutput, DetectionParams,
        DetectionRequest, MaskKind, MaskLayer, ProxyObservation, SeasonalChangeDetector,
    };
    pub use crate::error::{DetectError, Result};
    pub use crate::imagery::{vegetation_proxy, ReflectanceBand, VegetationIndex};
    pub use crate::seasonal::{
        candidate_dates, DateCatalog, DateTag, InMemoryCatalog, SeasonalWindow,
    };
    pub use clearsight_core::prelude::*;
    pub use clearsight_parallel::ProcessingMode;
}
