//! Mask override rules
//!
//! Quality masks supplied with the start and end images recode the class
//! of affected pixels. The rule set is closed and ordered; when several
//! masks hit one pixel the last rule in [`STANDARD_MASK_RULES`] wins.

use crate::error::Result;
use clearsight_core::raster::Raster;
use clearsight_core::Error;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Kind of quality mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskKind {
    Water,
    TopoIncidence,
    TopoCastShadow,
    Snow,
    Cloud,
    CloudShadow,
}

impl MaskKind {
    /// Cloud and cloud-shadow masks, which runs may choose to ignore
    pub fn is_cloud(self) -> bool {
        matches!(self, MaskKind::Cloud | MaskKind::CloudShadow)
    }
}

/// Which image of the change pair a mask belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acquisition {
    Start,
    End,
}

/// One recode rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskRule {
    pub kind: MaskKind,
    pub acquisition: Acquisition,
    /// Class code written where the mask is set
    pub recode: u8,
}

const fn rule(kind: MaskKind, acquisition: Acquisition, recode: u8) -> MaskRule {
    MaskRule {
        kind,
        acquisition,
        recode,
    }
}

/// Rules in application order
pub const STANDARD_MASK_RULES: [MaskRule; 12] = [
    rule(MaskKind::Water, Acquisition::Start, 108),
    rule(MaskKind::TopoIncidence, Acquisition::Start, 107),
    rule(MaskKind::TopoCastShadow, Acquisition::Start, 107),
    rule(MaskKind::Snow, Acquisition::Start, 109),
    rule(MaskKind::Cloud, Acquisition::Start, 103),
    rule(MaskKind::CloudShadow, Acquisition::Start, 105),
    rule(MaskKind::Water, Acquisition::End, 108),
    rule(MaskKind::TopoIncidence, Acquisition::End, 107),
    rule(MaskKind::TopoCastShadow, Acquisition::End, 107),
    rule(MaskKind::Snow, Acquisition::End, 109),
    rule(MaskKind::Cloud, Acquisition::End, 104),
    rule(MaskKind::CloudShadow, Acquisition::End, 106),
];

/// A mask raster; non-zero pixels are masked
#[derive(Debug, Clone)]
pub struct MaskLayer {
    pub kind: MaskKind,
    pub acquisition: Acquisition,
    pub raster: Raster<u8>,
}

impl MaskLayer {
    pub fn new(kind: MaskKind, acquisition: Acquisition, raster: Raster<u8>) -> Self {
        Self {
            kind,
            acquisition,
            raster,
        }
    }
}

/// Mask layers matched to their rules, in rule order
#[derive(Debug, Clone, Default)]
pub struct MaskOverrides<'a> {
    rules: Vec<(ArrayView2<'a, u8>, u8)>,
}

impl<'a> MaskOverrides<'a> {
    /// No masks at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Match `layers` against [`STANDARD_MASK_RULES`].
    ///
    /// Rules without a layer are skipped. With `omit_cloud` the cloud and
    /// cloud-shadow rules are skipped too.
    pub fn resolve(layers: &'a [MaskLayer], omit_cloud: bool) -> Self {
        let mut rules = Vec::new();
        for r in STANDARD_MASK_RULES.iter().filter(|r| !(omit_cloud && r.kind.is_cloud())) {
            let mut matching = layers
                .iter()
                .filter(|l| l.kind == r.kind && l.acquisition == r.acquisition);
            if let Some(layer) = matching.next() {
                if matching.next().is_some() {
                    warn!(
                        kind = ?r.kind,
                        acquisition = ?r.acquisition,
                        "duplicate mask layer, using the first"
                    );
                }
                rules.push((layer.raster.view(), r.recode));
            }
        }
        debug!(rules = rules.len(), omit_cloud, "mask rules resolved");
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn check_shape(&self, shape: (usize, usize)) -> Result<()> {
        for (view, _) in &self.rules {
            if view.dim() != shape {
                return Err(Error::SizeMismatch {
                    er: shape.0,
                    ec: shape.1,
                    ar: view.nrows(),
                    ac: view.ncols(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Recode of the last rule whose mask is set at the pixel
    pub fn recode_at(&self, row: usize, col: usize) -> Option<u8> {
        self.rules
            .iter()
            .rev()
            .find(|(view, _)| view[[row, col]] != 0)
            .map(|&(_, recode)| recode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn layer(kind: MaskKind, acquisition: Acquisition, data: ndarray::Array2<u8>) -> MaskLayer {
        MaskLayer::new(kind, acquisition, Raster::from_array(data))
    }

    #[test]
    fn test_last_rule_wins() {
        let layers = vec![
            layer(MaskKind::Cloud, Acquisition::End, array![[1, 0], [0, 0]]),
            layer(MaskKind::Water, Acquisition::Start, array![[1, 1], [0, 0]]),
            layer(MaskKind::Snow, Acquisition::End, array![[0, 1], [0, 0]]),
        ];
        let masks = MaskOverrides::resolve(&layers, false);
        assert_eq!(masks.len(), 3);
        assert_eq!(masks.recode_at(0, 0), Some(104));
        assert_eq!(masks.recode_at(0, 1), Some(109));
        assert_eq!(masks.recode_at(1, 1), None);
    }

    #[test]
    fn test_omit_cloud() {
        let layers = vec![
            layer(MaskKind::Cloud, Acquisition::Start, array![[1]]),
            layer(MaskKind::CloudShadow, Acquisition::End, array![[1]]),
            layer(MaskKind::TopoCastShadow, Acquisition::End, array![[0]]),
        ];
        let masks = MaskOverrides::resolve(&layers, true);
        assert_eq!(masks.len(), 1);
        assert_eq!(masks.recode_at(0, 0), None);
        assert_eq!(MaskOverrides::resolve(&layers, false).recode_at(0, 0), Some(106));
    }

    #[test]
    fn test_rule_table() {
        let start: Vec<u8> = STANDARD_MASK_RULES[..6].iter().map(|r| r.recode).collect();
        let end: Vec<u8> = STANDARD_MASK_RULES[6..].iter().map(|r| r.recode).collect();
        assert_eq!(start, vec![108, 107, 107, 109, 103, 105]);
        assert_eq!(end, vec![108, 107, 107, 109, 104, 106]);
        assert!(STANDARD_MASK_RULES.iter().all(|r| r.recode > 100));
    }

    #[test]
    fn test_shape_check() {
        let layers = vec![layer(MaskKind::Water, Acquisition::End, array![[1, 0]])];
        let masks = MaskOverrides::resolve(&layers, false);
        assert!(masks.check_shape((1, 2)).is_ok());
        assert!(masks.check_shape((2, 2)).is_err());
        assert!(MaskOverrides::none().is_empty());
    }
}
