//! Requested history span.
//!
//! Accepts the `max` sentinel, a named lookback period (`1d`, `5d`, `1mo`, `3mo`,
//! `6mo`, `1y`, `2y`, `5y`, `10y`, `ytd`) or an explicit inclusive range.
//! Named periods are resolved against a caller-supplied "today".

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::domain::error::StockError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    Days(u32),
    Months(u32),
    YearToDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRange {
    Max,
    Period(Lookback),
    Between { start: NaiveDate, end: NaiveDate },
}

impl Default for DateRange {
    fn default() -> Self {
        Self::Max
    }
}

impl DateRange {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Result<Self, StockError> {
        if start > end {
            return Err(StockError::validation(
                "date_range",
                format!("start {start} is after end {end}"),
            ));
        }
        Ok(Self::Between { start, end })
    }

    /// Concrete inclusive `(start, end)` bounds.
    pub fn resolve(&self, today: NaiveDate, max_start: NaiveDate) -> Result<(NaiveDate, NaiveDate), StockError> {
        let (start, end) = match *self {
            DateRange::Max => (max_start, today),
            DateRange::Between { start, end } => (start, end),
            DateRange::Period(Lookback::Days(days)) => (today - Duration::days(i64::from(days)), today),
            DateRange::Period(Lookback::Months(months)) => {
                let start = today.checked_sub_months(Months::new(months)).ok_or_else(|| {
                    StockError::validation("date_range", format!("{months} months before {today} is out of range"))
                })?;
                (start, today)
            }
            DateRange::Period(Lookback::YearToDate) => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).ok_or_else(|| {
                    StockError::validation("date_range", format!("no January 1st for {today}"))
                })?;
                (start, today)
            }
        };

        if start > end {
            return Err(StockError::validation(
                "date_range",
                format!("start {start} is after end {end}"),
            ));
        }
        Ok((start, end))
    }
}

impl FromStr for DateRange {
    type Err = StockError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let period = match value.trim().to_ascii_lowercase().as_str() {
            "" | "max" => return Ok(DateRange::Max),
            "1d" => Lookback::Days(1),
            "5d" => Lookback::Days(5),
            "1mo" => Lookback::Months(1),
            "3mo" => Lookback::Months(3),
            "6mo" => Lookback::Months(6),
            "1y" => Lookback::Months(12),
            "2y" => Lookback::Months(24),
            "5y" => Lookback::Months(60),
            "10y" => Lookback::Months(120),
            "ytd" => Lookback::YearToDate,
            other => {
                return Err(StockError::validation(
                    "date_range",
                    format!("'{other}' is not max, ytd or one of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y"),
                ));
            }
        };
        Ok(DateRange::Period(period))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRange::Max => write!(f, "max"),
            DateRange::Period(Lookback::Days(d)) => write!(f, "{d}d"),
            DateRange::Period(Lookback::Months(m)) if m % 12 == 0 => write!(f, "{}y", m / 12),
            DateRange::Period(Lookback::Months(m)) => write!(f, "{m}mo"),
            DateRange::Period(Lookback::YearToDate) => write!(f, "ytd"),
            DateRange::Between { start, end } => write!(f, "{start}..{end}"),
        }
    }
}

/// Parses a `YYYY-MM-DD` request parameter.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, StockError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| StockError::validation(field, format!("'{value}' is not a YYYY-MM-DD date")))
}
