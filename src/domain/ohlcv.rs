//! OHLCV bar representation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl OhlcvBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// low <= {open, close} <= high, all prices finite.
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite()) {
            return false;
        }
        self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> OhlcvBar {
        OhlcvBar::new(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            100.0,
            110.0,
            90.0,
            105.0,
            50_000,
        )
    }

    #[test]
    fn consistent_bar() {
        assert!(sample_bar().is_consistent());
    }

    #[test]
    fn close_above_high_is_inconsistent() {
        let mut bar = sample_bar();
        bar.close = 111.0;
        assert!(!bar.is_consistent());
    }

    #[test]
    fn open_below_low_is_inconsistent() {
        let mut bar = sample_bar();
        bar.open = 89.0;
        assert!(!bar.is_consistent());
    }

    #[test]
    fn nan_price_is_inconsistent() {
        let mut bar = sample_bar();
        bar.high = f64::NAN;
        assert!(!bar.is_consistent());
    }
}
