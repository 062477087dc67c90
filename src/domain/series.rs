//! Ordered bar series for a single symbol.

use crate::domain::error::StockError;
use crate::domain::interval::Interval;
use crate::domain::ohlcv::OhlcvBar;

/// Bars in strictly increasing date order. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    symbol: String,
    interval: Interval,
    bars: Vec<OhlcvBar>,
}

impl Series {
    /// Builds a series, rejecting out-of-order or duplicate dates.
    pub fn new(
        symbol: impl Into<String>,
        interval: Interval,
        bars: Vec<OhlcvBar>,
    ) -> Result<Self, StockError> {
        if let Some(pair) = bars.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(StockError::validation(
                "series",
                format!(
                    "dates must be strictly increasing ({} followed by {})",
                    pair[0].date, pair[1].date
                ),
            ));
        }
        Ok(Self {
            symbol: symbol.into(),
            interval,
            bars,
        })
    }

    /// Sorts by date and collapses duplicate dates, keeping the last bar seen for a date.
    pub fn from_unsorted(symbol: impl Into<String>, interval: Interval, mut bars: Vec<OhlcvBar>) -> Self {
        // stable sort keeps arrival order within a date
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => deduped.push(bar),
            }
        }
        Self {
            symbol: symbol.into(),
            interval,
            bars: deduped,
        }
    }

    pub fn empty(symbol: impl Into<String>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            interval,
            bars: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

}
