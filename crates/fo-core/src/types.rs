//! Shared value types

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::FoError;

/// A completion percentage, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Percentage(u8);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const FULL: Percentage = Percentage(100);

    pub fn new(value: i32) -> Result<Self, FoError> {
        if (0..=100).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(FoError::invalid(
                "completionPercentage",
                "must be between 0 and 100",
            ))
        }
    }

    pub fn value(&self) -> i32 {
        self.0 as i32
    }
}

impl TryFrom<i32> for Percentage {
    type Error = FoError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Percentage::new(value)
    }
}

impl From<Percentage> for i32 {
    fn from(p: Percentage) -> Self {
        p.value()
    }
}

/// An inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, FoError> {
        if end < start {
            return Err(FoError::invalid("endDate", "must be on or after the start date"));
        }
        Ok(Self { start, end })
    }

    /// Number of Monday..=Friday days, both ends included
    pub fn business_days(&self) -> i64 {
        self.start
            .iter_days()
            .take_while(|d| *d <= self.end)
            .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .count() as i64
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}
