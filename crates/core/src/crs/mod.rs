//! Coordinate Reference System handling
//!
//! The engine never reprojects; a CRS is carried from the inputs to the
//! outputs and checked for agreement when grids are intersected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG codes of the geographic (lat/lon) systems seen in the imagery archive.
const GEOGRAPHIC_EPSG: [u32; 3] = [4326, 4283, 7844];

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// EPSG code if known
    epsg: Option<u32>,
    /// WKT representation, as read from a source product
    wkt: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// GDA94 / Australian Albers (EPSG:3577), the national Landsat grid
    pub fn australian_albers() -> Self {
        Self::from_epsg(3577)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether the EPSG code names a geographic (degree-based) system
    pub fn is_geographic(&self) -> bool {
        self.epsg.is_some_and(|code| GEOGRAPHIC_EPSG.contains(&code))
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(32755);
        assert_eq!(crs.epsg(), Some(32755));
        assert_eq!(crs.identifier(), "EPSG:32755");
        assert!(!crs.is_geographic());
        assert!(CRS::from_epsg(4283).is_geographic());
    }

    #[test]
    fn test_crs_equivalence() {
        let a = CRS::from_epsg(3577);
        let b = CRS::australian_albers();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&CRS::from_wkt("LOCAL_CS[\"x\"]")));
    }
}
