//! Acquisition dates, seasonal windows and baseline selection
//!
//! Dates are identified by `YYYYMMDD` tags; seasonal windows by a pair of
//! `MMDD` month-days which may wrap through the new year.

mod catalog;
mod date;
mod selector;
mod window;

pub use catalog::{
    candidate_dates, CatalogEntry, DateCatalog, InMemoryCatalog, DEFAULT_MAX_CLOUD_PERCENT,
};
pub use date::DateTag;
pub use selector::{
    nearest_observation, select_baseline, BaselineSelection, SelectorParams, MIN_BASELINE,
};
pub use window::{MonthDay, SeasonalWindow};
