use crate::error::{AdjustmentReportError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month. Ordering is chronological, which matches the
/// lexicographic order of the zero-padded `"YYYY-MM"` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Builds a month from a compact `YYYYMMDD` ledger date by slicing the
    /// year and month digits. The day part is not inspected.
    pub fn from_compact(raw: &str) -> Option<Self> {
        let year = raw.get(0..4)?;
        let month = raw.get(4..6)?;
        if !year.bytes().all(|b| b.is_ascii_digit()) || !month.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// `"MM-YYYY"`, the key used for balances, index points and headers.
    pub fn month_key(&self) -> String {
        format!("{:02}-{:04}", self.month, self.year)
    }

    /// `"YYYY-MM"`, the form filter bounds arrive in.
    pub fn range_key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month, self.year)
    }
}

/// Inclusive month range taken from the report filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl MonthRange {
    pub fn new(start: YearMonth, end: YearMonth) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.start <= month && month <= self.end
    }

    pub fn months(&self) -> Vec<YearMonth> {
        months_between(self.start, self.end)
    }
}

/// Parses a `"YYYY-MM"` filter bound.
pub fn parse_year_month(value: &str) -> Result<YearMonth> {
    let with_day = format!("{}-01", value.trim());
    let date = NaiveDate::parse_from_str(&with_day, "%Y-%m-%d")
        .map_err(|_| AdjustmentReportError::InvalidPeriod(value.to_string()))?;
    Ok(YearMonth::from_date(date))
}

/// Ordered months from `start` to `end`, both inclusive. Empty when
/// `start` comes after `end`.
pub fn months_between(start: YearMonth, end: YearMonth) -> Vec<YearMonth> {
    let mut months = Vec::new();
    let mut current = start;
    while current <= end {
        months.push(current);
        current = current.succ();
    }
    months
}

/// String form of [`months_between`]: `"YYYY-MM"` bounds in, `"MM-YYYY"` keys out.
pub fn months_between_str(start: &str, end: &str) -> Result<Vec<String>> {
    let start = parse_year_month(start)?;
    let end = parse_year_month(end)?;
    Ok(months_between(start, end)
        .iter()
        .map(YearMonth::month_key)
        .collect())
}

/// Source extracts are Latin-1; every byte maps to the code point of the same value.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

pub fn strip_quotes(field: &str) -> String {
    field.replace('"', "").trim().to_string()
}
