//! Business date handling.
//!
//! A business date is the operating day a terminal's open/close counters
//! roll over on, distinct from the calendar date: a store that opens at
//! 23:00 and closes at 05:00 the next morning still posts every sale under
//! the business date the terminal was opened on.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A business date, stored and compared as a plain calendar date
/// (`YYYY-MM-DD`). Rollover is decided by the terminal lifecycle, not by
/// this type: `BusinessDate` itself carries no time-of-day logic.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BusinessDate(NaiveDate);

impl BusinessDate {
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    #[must_use]
    pub fn date(self) -> NaiveDate {
        self.0
    }

    /// The next business date, used when a terminal opens for the first
    /// time after its previous business date closed.
    #[must_use]
    pub fn succ(self) -> Self {
        Self(self.0.succ_opt().unwrap_or(self.0))
    }

    /// Parses the compact `YYYYMMDD` form used on receipts and report keys.
    #[must_use]
    pub fn parse_compact(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(Self)
    }

    /// Renders the compact `YYYYMMDD` form used on receipts and report keys.
    #[must_use]
    pub fn to_compact(self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for BusinessDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_compact())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_roundtrip() {
        let date = BusinessDate::from_ymd(2026, 7, 28).expect("valid date");
        assert_eq!(date.to_compact(), "20260728");
        assert_eq!(BusinessDate::parse_compact("20260728"), Some(date));
    }

    #[test]
    fn succ_advances_one_day() {
        let date = BusinessDate::from_ymd(2026, 7, 28).expect("valid date");
        assert_eq!(date.succ().to_compact(), "20260729");
    }

    #[test]
    fn rejects_malformed_compact_dates() {
        assert_eq!(BusinessDate::parse_compact("2026-07-28"), None);
        assert_eq!(BusinessDate::parse_compact("not-a-date"), None);
    }
}
