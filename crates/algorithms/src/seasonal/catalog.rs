//! Candidate acquisition dates for a scene

use crate::seasonal::DateTag;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Cloud cover threshold, in percent, for routine candidate listing
pub const DEFAULT_MAX_CLOUD_PERCENT: f64 = 40.0;

/// One acquisition known to a catalog
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub date: DateTag,
    /// Cloud cover in percent
    pub cloud_fraction: f64,
}

/// Source of acquisitions available for a scene
pub trait DateCatalog {
    fn list_candidates(&self, scene_id: &str) -> Vec<CatalogEntry>;
}

/// Catalog held in memory, keyed by scene
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    scenes: HashMap<String, Vec<CatalogEntry>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, scene_id: impl Into<String>, entry: CatalogEntry) {
        self.scenes.entry(scene_id.into()).or_default().push(entry);
    }
}

impl DateCatalog for InMemoryCatalog {
    fn list_candidates(&self, scene_id: &str) -> Vec<CatalogEntry> {
        self.scenes.get(scene_id).cloned().unwrap_or_default()
    }
}

/// Dates for `scene_id` with cloud cover strictly below `max_cloud`, in date order
pub fn candidate_dates<C: DateCatalog + ?Sized>(
    catalog: &C,
    scene_id: &str,
    max_cloud: f64,
) -> Vec<DateTag> {
    let entries = catalog.list_candidates(scene_id);
    let total = entries.len();
    let mut dates: Vec<DateTag> = entries
        .into_iter()
        .filter(|e| e.cloud_fraction < max_cloud)
        .map(|e| e.date)
        .collect();
    dates.sort();
    dates.dedup();
    debug!(scene_id, total, kept = dates.len(), max_cloud, "listed candidate dates");
    dates
}
