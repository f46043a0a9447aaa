//! Run parameters

use crate::change::classify::DEFAULT_START_THRESHOLD;
use crate::error::{DetectError, Result};
use crate::seasonal::{DateTag, SeasonalWindow, SelectorParams};
use clearsight_parallel::ProcessingMode;
use serde::{Deserialize, Serialize};

/// Parameters for one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionParams {
    /// Seasonal window; defaults to the month-days of the start and end dates
    pub window: Option<SeasonalWindow>,
    /// Calendar years of history, counting the end year
    pub lookback_years: u32,
    /// Disable the low start proxy reset
    pub omit_start_threshold: bool,
    /// Raw start proxy below which pixels are reset to no clearing
    pub start_threshold: f64,
    /// Ignore cloud and cloud-shadow masks
    pub omit_cloud_masks: bool,
    /// Maximum day gap when resolving the start/end proxy; `None` is unlimited
    pub date_tolerance_days: Option<u32>,
    /// Worker threads; `None` uses every core, 1 runs sequentially
    pub threads: Option<usize>,
    /// Row-block height for sharding per-pixel work
    pub block_rows: usize,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            window: None,
            lookback_years: 10,
            omit_start_threshold: false,
            start_threshold: DEFAULT_START_THRESHOLD,
            omit_cloud_masks: false,
            date_tolerance_days: None,
            threads: None,
            block_rows: 64,
        }
    }
}

impl DetectionParams {
    /// Parse parameters from a JSON document; absent fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(json)
            .map_err(|e| DetectError::InvalidConfig(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DetectError::InvalidConfig(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.lookback_years == 0 {
            return Err(DetectError::InvalidConfig(
                "lookback_years must be at least 1".into(),
            ));
        }
        if i32::try_from(self.lookback_years).is_err() {
            return Err(DetectError::InvalidConfig(format!(
                "lookback_years out of range, got {}",
                self.lookback_years
            )));
        }
        if self.block_rows == 0 {
            return Err(DetectError::InvalidConfig(
                "block_rows must be at least 1".into(),
            ));
        }
        if self.threads == Some(0) {
            return Err(DetectError::InvalidConfig(
                "threads must be at least 1".into(),
            ));
        }
        if !self.start_threshold.is_finite() {
            return Err(DetectError::InvalidConfig(format!(
                "start_threshold must be finite, got {}",
                self.start_threshold
            )));
        }
        Ok(())
    }

    pub fn processing_mode(&self) -> ProcessingMode {
        ProcessingMode::from_threads(self.threads)
    }

    /// Start threshold in effect, `None` when disabled
    pub fn effective_start_threshold(&self) -> Option<f64> {
        (!self.omit_start_threshold).then_some(self.start_threshold)
    }

    pub fn window_for(&self, start: DateTag, end: DateTag) -> SeasonalWindow {
        self.window
            .unwrap_or_else(|| SeasonalWindow::spanning(start, end))
    }

    pub fn selector_params(&self, start: DateTag, end: DateTag) -> SelectorParams {
        SelectorParams {
            window: self.window_for(start, end),
            lookback_years: self.lookback_years,
            date_tolerance_days: self.date_tolerance_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = DetectionParams::default();
        assert_eq!(p.lookback_years, 10);
        assert_eq!(p.effective_start_threshold(), Some(108.0));
        assert!(p.validate().is_ok());
        assert_eq!(p.processing_mode(), ProcessingMode::Parallel);
    }

    #[test]
    fn test_from_json_partial() {
        let json = r#"{
            "window": {"start": "1101", "end": "0201"},
            "omit_start_threshold": true,
            "threads": 1
        }"#;
        let p = DetectionParams::from_json(json).unwrap();
        assert!(p.window.is_some_and(|w| w.wraps()));
        assert_eq!(p.effective_start_threshold(), None);
        assert_eq!(p.processing_mode(), ProcessingMode::Sequential);
        assert_eq!(p.block_rows, 64);
    }

    #[test]
    fn test_json_round_trip() {
        let p = DetectionParams {
            date_tolerance_days: Some(16),
            ..Default::default()
        };
        assert_eq!(DetectionParams::from_json(&p.to_json().unwrap()).unwrap(), p);
    }

    #[test]
    fn test_rejects_bad_config() {
        for json in [
            r#"{"lookback_years": 0}"#,
            r#"{"lookback_years": 2147483648}"#,
            r#"{"block_rows": 0}"#,
            r#"{"threads": 0}"#,
            r#"{"window": {"start": "1301", "end": "0201"}}"#,
            r#"{"lookbak_years": 3}"#,
        ] {
            assert!(
                matches!(DetectionParams::from_json(json), Err(DetectError::InvalidConfig(_))),
                "{json} accepted"
            );
        }
    }

    #[test]
    fn test_default_window_spans_dates() {
        let p = DetectionParams::default();
        let start = DateTag::parse("20191115").unwrap();
        let end = DateTag::parse("20200210").unwrap();
        let w = p.window_for(start, end);
        assert_eq!(w.to_string(), "1115-0210");
    }
}
