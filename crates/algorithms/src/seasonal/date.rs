//! `YYYYMMDD` acquisition date tags

use crate::error::{DetectError, Result};
use crate::seasonal::MonthDay;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar date identified by its `YYYYMMDD` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateTag(NaiveDate);

impl DateTag {
    /// Parse an eight-digit `YYYYMMDD` tag
    pub fn parse(tag: &str) -> Result<Self> {
        let invalid = |reason: &str| DetectError::InvalidDate {
            value: tag.to_string(),
            reason: reason.to_string(),
        };
        if tag.len() != 8 || !tag.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected eight digits YYYYMMDD"));
        }
        let year: i32 = tag[0..4].parse().map_err(|_| invalid("bad year"))?;
        let month: u32 = tag[4..6].parse().map_err(|_| invalid("bad month"))?;
        let day: u32 = tag[6..8].parse().map_err(|_| invalid("bad day"))?;
        NaiveDate::from_ymd_opt(year, month, day)
            .map(DateTag)
            .ok_or_else(|| invalid("not a calendar date"))
    }

    /// Build a tag from year, month and day
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(DateTag)
            .ok_or_else(|| DetectError::InvalidDate {
                value: format!("{year:04}{month:02}{day:02}"),
                reason: "not a calendar date".to_string(),
            })
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month_day(&self) -> MonthDay {
        MonthDay::from_date(self.0)
    }

    /// Fractional year: `year + dayOfYear0 / daysInYear`, leap-aware
    pub fn decimal_year(&self) -> f64 {
        let days_in_year = NaiveDate::from_ymd_opt(self.0.year(), 12, 31)
            .map(|d| d.ordinal())
            .unwrap_or(365);
        self.0.year() as f64 + self.0.ordinal0() as f64 / days_in_year as f64
    }

    /// Absolute number of days between two tags
    pub fn days_between(&self, other: &DateTag) -> i64 {
        self.0.signed_duration_since(other.0).num_days().abs()
    }
}

impl From<NaiveDate> for DateTag {
    fn from(date: NaiveDate) -> Self {
        DateTag(date)
    }
}

impl FromStr for DateTag {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self> {
        DateTag::parse(s)
    }
}

impl TryFrom<String> for DateTag {
    type Error = DetectError;

    fn try_from(value: String) -> Result<Self> {
        DateTag::parse(&value)
    }
}

impl From<DateTag> for String {
    fn from(tag: DateTag) -> Self {
        tag.to_string()
    }
}

impl fmt::Display for DateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.0.year(), self.0.month(), self.0.day())
    }
}
