//! Shared primitive types used across the entire pipeline.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stable account identifier as it appears in the source tables.
pub type AccountId = String;

/// The canonical run identifier.
pub type RunId = String;

/// A calendar month. Every date in the pipeline is floored to one of these.
///
/// Ordering is chronological. Rendered as `YYYY-MM-01` in artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year:  i32,
    month: u32,
}

impl YearMonth {
    /// Returns `None` when `month` is outside 1..=12 or the year is outside
    /// the range chrono can represent.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// Floor a date to its calendar month.
    pub fn from_date(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    pub fn year(&self) -> i32  { self.year }
    pub fn month(&self) -> u32 { self.month }

    /// Absolute month index (year * 12 + zero-based month).
    /// Differences between indices are month counts.
    pub fn index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month - 1)
    }

    pub fn from_index(index: i64) -> Self {
        let year = index.div_euclid(12) as i32;
        let month = index.rem_euclid(12) as u32 + 1;
        Self { year, month }
    }

    pub fn next(&self) -> Self { Self::from_index(self.index() + 1) }
    pub fn prev(&self) -> Self { Self::from_index(self.index() - 1) }

    /// Whole months from `earlier` to `self`; negative when `earlier` is later.
    pub fn months_since(&self, earlier: YearMonth) -> i64 {
        self.index() - earlier.index()
    }

    pub fn first_day(&self) -> NaiveDate {
        // `new` and `from_date` only build representable months. Stepping
        // past chrono's last year with `next` is the one way to miss.
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .unwrap_or(NaiveDate::MAX)
    }

    /// Short human label, e.g. `Mar 2024`.
    pub fn label(&self) -> String {
        self.first_day().format("%b %Y").to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-01", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Accepts `YYYY-MM` or any `YYYY-MM-DD` date (the day is discarded).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::from_date(date));
        }
        let (y, m) = s
            .split_once('-')
            .ok_or_else(|| format!("not a year-month: {s:?}"))?;
        let year: i32 = y.parse().map_err(|_| format!("bad year in {s:?}"))?;
        let month: u32 = m.parse().map_err(|_| format!("bad month in {s:?}"))?;
        Self::new(year, month).ok_or_else(|| format!("month out of range in {s:?}"))
    }
}

/// The three candidate revenue-decline drivers.
///
/// Declaration order is the tie-break order used when ranking drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Driver {
    Acquisition,
    Retention,
    Pricing,
}

impl Driver {
    pub const ALL: [Driver; 3] = [Driver::Acquisition, Driver::Retention, Driver::Pricing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::Acquisition => "acquisition",
            Driver::Retention   => "retention",
            Driver::Pricing     => "pricing",
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Driver {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "acquisition" => Ok(Driver::Acquisition),
            "retention"   => Ok(Driver::Retention),
            "pricing"     => Ok(Driver::Pricing),
            other         => Err(format!("unknown driver: {other:?}")),
        }
    }
}
