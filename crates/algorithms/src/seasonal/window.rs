//! Month-day seasonal windows

use crate::error::{DetectError, Result};
use crate::seasonal::DateTag;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Month and day of month, ignoring the year
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    /// Validates against a leap year, so `0229` is accepted
    pub fn new(month: u32, day: u32) -> Result<Self> {
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(DetectError::InvalidDate {
                value: format!("{month:02}{day:02}"),
                reason: "not a month-day".to_string(),
            });
        }
        Ok(Self { month, day })
    }

    /// Parse a four-digit `MMDD` string
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DetectError::InvalidDate {
                value: s.to_string(),
                reason: "expected four digits MMDD".to_string(),
            });
        }
        let month: u32 = s[0..2].parse().unwrap_or(0);
        let day: u32 = s[2..4].parse().unwrap_or(0);
        Self::new(month, day)
    }

    pub(crate) fn from_date(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Calendar distance proxy `|(m - m') * 31 + (d - d')|`
    pub fn distance(&self, other: &MonthDay) -> u32 {
        let dm = self.month as i64 - other.month as i64;
        let dd = self.day as i64 - other.day as i64;
        (dm * 31 + dd).unsigned_abs() as u32
    }
}

impl FromStr for MonthDay {
    type Err = DetectError;

    fn from_str(s: &str) -> Result<Self> {
        MonthDay::parse(s)
    }
}

impl TryFrom<String> for MonthDay {
    type Error = DetectError;

    fn try_from(value: String) -> Result<Self> {
        MonthDay::parse(&value)
    }
}

impl From<MonthDay> for String {
    fn from(md: MonthDay) -> Self {
        md.to_string()
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}", self.month, self.day)
    }
}

/// Inclusive month-day range; wraps through the new year when `start > end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalWindow {
    pub start: MonthDay,
    pub end: MonthDay,
}

impl SeasonalWindow {
    pub fn new(start: MonthDay, end: MonthDay) -> Self {
        Self { start, end }
    }

    /// Parse a pair of `MMDD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(MonthDay::parse(start)?, MonthDay::parse(end)?))
    }

    /// Window spanning the month-days of two acquisition dates
    pub fn spanning(start: DateTag, end: DateTag) -> Self {
        Self::new(start.month_day(), end.month_day())
    }

    pub fn wraps(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, md: MonthDay) -> bool {
        if self.wraps() {
            md >= self.start || md <= self.end
        } else {
            md >= self.start && md <= self.end
        }
    }

    pub fn contains_date(&self, date: DateTag) -> bool {
        self.contains(date.month_day())
    }
}

impl fmt::Display for SeasonalWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn md(s: &str) -> MonthDay {
        MonthDay::parse(s).unwrap()
    }

    #[test]
    fn test_parse_month_day() {
        assert_eq!(md("0229").to_string(), "0229");
        assert!(MonthDay::parse("1301").is_err());
        assert!(MonthDay::parse("0431").is_err());
        assert!(MonthDay::parse("101").is_err());
    }

    #[test]
    fn test_plain_window() {
        let w = SeasonalWindow::parse("0301", "0531").unwrap();
        assert!(!w.wraps());
        assert!(w.contains(md("0301")));
        assert!(w.contains(md("0415")));
        assert!(w.contains(md("0531")));
        assert!(!w.contains(md("0601")));
        assert!(!w.contains(md("0228")));
    }

    #[test]
    fn test_wrapping_window() {
        let w = SeasonalWindow::parse("1101", "0201").unwrap();
        assert!(w.wraps());
        assert!(w.contains(md("1215")));
        assert!(w.contains(md("0115")));
        assert!(w.contains(md("1101")));
        assert!(w.contains(md("0201")));
        assert!(!w.contains(md("0601")));
        assert!(!w.contains(md("0202")));
    }

    #[test]
    fn test_distance() {
        assert_eq!(md("0201").distance(&md("0201")), 0);
        assert_eq!(md("0115").distance(&md("0201")), 17);
        assert_eq!(md("0201").distance(&md("0115")), 17);
        assert_eq!(md("1215").distance(&md("0201")), 324);
    }

    #[test]
    fn test_window_serde() {
        let w: SeasonalWindow = serde_json::from_str(r#"{"start":"1101","end":"0201"}"#).unwrap();
        assert_eq!(w, SeasonalWindow::parse("1101", "0201").unwrap());
    }
}
