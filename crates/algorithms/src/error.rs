//! Error type for the detection engine
//!
//! Every failure is fatal to one detection run; nothing is written when any
//! of these is returned.

use crate::imagery::ReflectanceBand;
use crate::seasonal::DateTag;
use thiserror::Error;

/// Discriminated failure of a detection run
#[derive(Error, Debug)]
pub enum DetectError {
    /// A reflectance stack is missing or lacks the bands the indices need
    #[error("{image} reflectance has {bands} band(s); missing {missing:?}")]
    InputResolution {
        image: &'static str,
        bands: usize,
        missing: Vec<ReflectanceBand>,
    },

    /// Fewer than the required baseline samples survived selection
    #[error("baseline too small: {found} usable sample(s), need at least {required}")]
    InsufficientBaseline { found: usize, required: usize },

    /// The inputs have no usable common extent
    #[error("inputs have no common extent: {0}")]
    ShapeMismatch(String),

    /// No proxy observation could stand in for a requested date
    #[error("no proxy observation for {target}: {reason}")]
    DateResolution { target: DateTag, reason: String },

    /// A `YYYYMMDD` or `MMDD` string that is not a calendar date
    #[error("invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    /// Run parameters that cannot be honoured
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("raster error: {0}")]
    Raster(#[from] clearsight_core::Error),
}

impl DetectError {
    /// Map a core error from common-extent computation onto `ShapeMismatch`
    pub(crate) fn from_extent(err: clearsight_core::Error) -> Self {
        match err {
            clearsight_core::Error::NoOverlap | clearsight_core::Error::IncompatibleGrids(_) => {
                DetectError::ShapeMismatch(err.to_string())
            }
            other => DetectError::Raster(other),
        }
    }
}

/// Result alias for detection operations
pub type Result<T> = std::result::Result<T, DetectError>;
