//! Technical indicators computed over a bar series.
//!
//! - `IndicatorPoint`: one value of an indicator, `None` while warming up
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: one indicator aligned bar-for-bar with its series
//! - `IndicatorSet`: the moving averages attached to a series, keyed by window

pub mod sma;

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::series::Series;

/// Moving-average windows attached to every history response.
pub const MA_WINDOWS: [usize; 5] = [10, 20, 50, 150, 200];

/// Largest standard window; series shorter than this cannot support a prediction.
pub const LONGEST_MA_WINDOW: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
}

impl IndicatorType {
    pub fn period(&self) -> usize {
        match self {
            IndicatorType::Sma(period) => *period,
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(|p| p.value)
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.last().and_then(|p| p.value)
    }
}

/// Simple moving averages aligned with a series.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSet {
    len: usize,
    series: BTreeMap<usize, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Windows present in the set, ascending.
    pub fn windows(&self) -> impl Iterator<Item = usize> + '_ {
        self.series.keys().copied()
    }

    pub fn get(&self, window: usize) -> Option<&IndicatorSeries> {
        self.series.get(&window)
    }

    /// SMA for `window` at bar `index`; `None` if the window is not attached or still warming up.
    pub fn value(&self, window: usize, index: usize) -> Option<f64> {
        self.series.get(&window).and_then(|s| s.value(index))
    }

    pub fn latest(&self, window: usize) -> Option<f64> {
        self.series.get(&window).and_then(|s| s.latest())
    }
}

/// Computes one SMA per window over the series closes. Zero windows are skipped
/// and duplicates collapse.
pub fn attach_moving_averages(series: &Series, windows: &[usize]) -> IndicatorSet {
    let mut set = BTreeMap::new();
    for &window in windows {
        if window == 0 || set.contains_key(&window) {
            continue;
        }
        set.insert(window, sma::calculate_sma(series.bars(), window));
    }
    IndicatorSet {
        len: series.len(),
        series: set,
    }
}
