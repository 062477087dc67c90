//! History query orchestration.
//!
//! resolve dates -> fetch daily bars -> resample -> moving averages -> optional prediction.
//!
//! The upstream fetch is the only await point. It runs inside the caller's future
//! under a timeout; dropping that future (for example when an HTTP client goes away)
//! cancels the fetch, nothing is spawned on its behalf.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::date_range::DateRange;
use crate::domain::error::StockError;
use crate::domain::indicator::{attach_moving_averages, IndicatorSet, MA_WINDOWS};
use crate::domain::interval::Interval;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::prediction::{predict, Prediction, PredictionConfig};
use crate::domain::resample::resample;
use crate::domain::series::Series;
use crate::ports::history_port::HistorySource;

pub const MAX_SYMBOL_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub symbol: String,
    pub date_range: DateRange,
    pub interval: Interval,
    pub auto_predict: bool,
}

impl HistoryQuery {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            date_range: DateRange::Max,
            interval: Interval::Daily,
            auto_predict: false,
        }
    }

    pub fn with_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_prediction(mut self, auto_predict: bool) -> Self {
        self.auto_predict = auto_predict;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySettings {
    pub timeout: Duration,
    /// Start date the `max` range resolves to.
    pub max_start: NaiveDate,
    pub prediction: PredictionConfig,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(10_000),
            max_start: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default(),
            prediction: PredictionConfig::default(),
        }
    }
}

/// One response row, in the field layout the charting client reads.
/// Missing averages serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
    #[serde(rename = "Volume")]
    pub volume: u64,
    #[serde(rename = "10MA")]
    pub ma10: Option<f64>,
    #[serde(rename = "20MA")]
    pub ma20: Option<f64>,
    #[serde(rename = "50MA")]
    pub ma50: Option<f64>,
    #[serde(rename = "150MA")]
    pub ma150: Option<f64>,
    #[serde(rename = "200MA")]
    pub ma200: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

/// A resampled series with its moving averages and, when requested, a prediction
/// for the most recent bar.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedSeries {
    pub series: Series,
    pub indicators: IndicatorSet,
    pub prediction: Option<Prediction>,
}

impl AnnotatedSeries {
    pub fn records(&self) -> Vec<BarRecord> {
        let last = self.series.len().saturating_sub(1);
        self.series
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| BarRecord {
                date: bar.date,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
                ma10: self.indicators.value(10, i),
                ma20: self.indicators.value(20, i),
                ma50: self.indicators.value(50, i),
                ma150: self.indicators.value(150, i),
                ma200: self.indicators.value(200, i),
                prediction: if i == last { self.prediction.clone() } else { None },
            })
            .collect()
    }
}

pub struct HistoryService {
    source: Arc<dyn HistorySource>,
    settings: HistorySettings,
    today: fn() -> NaiveDate,
}

fn utc_today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

impl HistoryService {
    pub fn new(source: Arc<dyn HistorySource>, settings: HistorySettings) -> Self {
        Self {
            source,
            settings,
            today: utc_today,
        }
    }

    /// Replaces the clock used to resolve relative date ranges.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub async fn get_history(&self, query: &HistoryQuery) -> Result<AnnotatedSeries, StockError> {
        let symbol = normalize_symbol(&query.symbol)?;
        let (start, end) = query
            .date_range
            .resolve((self.today)(), self.settings.max_start)?;

        let bars = self.fetch(&symbol, start, end).await?;
        let daily = Series::from_unsorted(symbol.as_str(), Interval::Daily, bars);
        let series = resample(&daily, query.interval)?;
        let indicators = attach_moving_averages(&series, &MA_WINDOWS);

        let prediction = if !query.auto_predict {
            None
        } else if series.is_empty() {
            log::warn!("{}: no bars, prediction skipped", symbol);
            None
        } else {
            let prediction = predict(&series, &indicators, &self.settings.prediction);
            log::debug!("{}: prediction {:?}", symbol, prediction);
            Some(prediction)
        };

        Ok(AnnotatedSeries {
            series,
            indicators,
            prediction,
        })
    }

    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, StockError> {
        let started = Instant::now();
        let fetched = tokio::time::timeout(
            self.settings.timeout,
            self.source.fetch_daily(symbol, start, end),
        )
        .await
        .map_err(|_| {
            StockError::upstream(format!(
                "{} did not answer for {} within {} ms",
                self.source.name(),
                symbol,
                self.settings.timeout.as_millis()
            ))
        })?;

        let bars = match fetched {
            Ok(bars) => bars,
            Err(StockError::NoData { .. }) => {
                log::warn!("{}: no bars between {} and {}", symbol, start, end);
                Vec::new()
            }
            Err(e) => {
                log::error!("{}: {} fetch failed: {}", symbol, self.source.name(), e);
                return Err(e);
            }
        };

        let received = bars.len();
        let bars: Vec<OhlcvBar> = bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end && b.is_consistent())
            .collect();
        if bars.len() < received {
            log::warn!(
                "{}: dropped {} bars outside range or with inconsistent prices",
                symbol,
                received - bars.len()
            );
        }

        log::info!(
            "{}: {} daily bars from {} in {:?}",
            symbol,
            bars.len(),
            self.source.name(),
            started.elapsed()
        );
        Ok(bars)
    }
}

/// Trims and uppercases a ticker, rejecting empty or malformed input.
pub fn normalize_symbol(raw: &str) -> Result<String, StockError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(StockError::validation("symbol", "symbol is required"));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(StockError::validation(
            "symbol",
            format!("longer than {MAX_SYMBOL_LEN} characters"),
        ));
    }
    if let Some(bad) = symbol
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^')))
    {
        return Err(StockError::validation(
            "symbol",
            format!("unexpected character '{bad}'"),
        ));
    }
    Ok(symbol)
}
