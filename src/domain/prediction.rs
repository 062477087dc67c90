//! Directional prediction from moving-average state.
//!
//! # Outcomes
//!
//! - `insufficient_data`: fewer bars than the longest standard window (200)
//! - `prediction_error`: an indicator needed for the latest bar is missing or not finite
//! - `success`: BUY when the short trend (mean of SMA10, SMA20) is above the long
//!   trend (mean of SMA50, SMA150, SMA200), SELL otherwise
//!
//! # Confidence
//!
//! Sum of three parts, rounded and clipped to 0..=100:
//! - spread: percentage gap between short and long trend times `spread_weight`,
//!   capped at `max_spread_points`
//! - alignment: `alignment_weight` for each rung of
//!   `close > SMA10 > SMA20 > SMA50 > SMA150 > SMA200` that agrees with the call
//! - crossover: `crossover_bonus` if SMA20 crossed SMA50 in the called direction
//!   within the last `crossover_lookback` bars

use serde::{Deserialize, Serialize};

use crate::domain::indicator::{IndicatorSet, LONGEST_MA_WINDOW};
use crate::domain::series::Series;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Success,
    InsufficientData,
    PredictionError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
}

/// Recommendation and confidence are present exactly when the status is `Success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    status: PredictionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    recommendation: Option<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    confidence: Option<u8>,
}

impl Prediction {
    pub fn success(recommendation: Recommendation, confidence: u8) -> Self {
        Self {
            status: PredictionStatus::Success,
            recommendation: Some(recommendation),
            confidence: Some(confidence.min(100)),
        }
    }

    pub fn insufficient_data() -> Self {
        Self {
            status: PredictionStatus::InsufficientData,
            recommendation: None,
            confidence: None,
        }
    }

    pub fn error() -> Self {
        Self {
            status: PredictionStatus::PredictionError,
            recommendation: None,
            confidence: None,
        }
    }

    pub fn status(&self) -> PredictionStatus {
        self.status
    }

    pub fn recommendation(&self) -> Option<Recommendation> {
        self.recommendation
    }

    pub fn confidence(&self) -> Option<u8> {
        self.confidence
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionConfig {
    pub spread_weight: f64,
    pub max_spread_points: f64,
    pub alignment_weight: f64,
    pub crossover_bonus: f64,
    pub crossover_lookback: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            spread_weight: 5.0,
            max_spread_points: 50.0,
            alignment_weight: 6.0,
            crossover_bonus: 20.0,
            crossover_lookback: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("SMA({window}) undefined at bar {index}")]
    MissingIndicator { window: usize, index: usize },

    #[error("non-finite value for {what}")]
    NonFinite { what: &'static str },

    #[error("long-term average must be positive, got {value}")]
    NonPositiveAverage { value: f64 },
}

const SHORT_WINDOWS: [usize; 2] = [10, 20];
const LONG_WINDOWS: [usize; 3] = [50, 150, 200];
const CROSS_FAST: usize = 20;
const CROSS_SLOW: usize = 50;

pub fn predict(series: &Series, indicators: &IndicatorSet, config: &PredictionConfig) -> Prediction {
    if series.len() < LONGEST_MA_WINDOW {
        log::debug!(
            "{}: {} bars, need {} for a prediction",
            series.symbol(),
            series.len(),
            LONGEST_MA_WINDOW
        );
        return Prediction::insufficient_data();
    }

    match compute_signal(series, indicators, config) {
        Ok((recommendation, confidence)) => Prediction::success(recommendation, confidence),
        Err(e) => {
            log::warn!("{}: prediction failed: {}", series.symbol(), e);
            Prediction::error()
        }
    }
}

fn sma_at(indicators: &IndicatorSet, window: usize, index: usize) -> Result<f64, PredictionError> {
    let value = indicators
        .value(window, index)
        .ok_or(PredictionError::MissingIndicator { window, index })?;
    if !value.is_finite() {
        return Err(PredictionError::NonFinite { what: "moving average" });
    }
    Ok(value)
}

fn mean_of(indicators: &IndicatorSet, windows: &[usize], index: usize) -> Result<f64, PredictionError> {
    let mut sum = 0.0;
    for &window in windows {
        sum += sma_at(indicators, window, index)?;
    }
    Ok(sum / windows.len() as f64)
}

fn compute_signal(
    series: &Series,
    indicators: &IndicatorSet,
    config: &PredictionConfig,
) -> Result<(Recommendation, u8), PredictionError> {
    let last = series.len() - 1;
    let close = series.bars()[last].close;
    if !close.is_finite() {
        return Err(PredictionError::NonFinite { what: "close" });
    }

    let short = mean_of(indicators, &SHORT_WINDOWS, last)?;
    let long = mean_of(indicators, &LONG_WINDOWS, last)?;
    if long <= 0.0 {
        return Err(PredictionError::NonPositiveAverage { value: long });
    }

    let recommendation = if short > long {
        Recommendation::Buy
    } else {
        Recommendation::Sell
    };

    let spread_pct = (short - long).abs() / long * 100.0;
    let spread_points = (spread_pct * config.spread_weight).min(config.max_spread_points);

    let ladder = [
        close,
        sma_at(indicators, 10, last)?,
        sma_at(indicators, 20, last)?,
        sma_at(indicators, 50, last)?,
        sma_at(indicators, 150, last)?,
        sma_at(indicators, 200, last)?,
    ];
    let agreeing_rungs = ladder
        .windows(2)
        .filter(|pair| match recommendation {
            Recommendation::Buy => pair[0] > pair[1],
            Recommendation::Sell => pair[0] < pair[1],
        })
        .count();
    let alignment_points = agreeing_rungs as f64 * config.alignment_weight;

    let crossover_points = if recent_crossover(indicators, last, config.crossover_lookback)
        == Some(recommendation)
    {
        config.crossover_bonus
    } else {
        0.0
    };

    let total = spread_points + alignment_points + crossover_points;
    if !total.is_finite() {
        return Err(PredictionError::NonFinite { what: "confidence" });
    }
    let confidence = total.round().clamp(0.0, 100.0) as u8;

    Ok((recommendation, confidence))
}

/// Direction of the most recent SMA20/SMA50 crossing within `lookback` bars ending at `last`.
fn recent_crossover(indicators: &IndicatorSet, last: usize, lookback: usize) -> Option<Recommendation> {
    let first = last.saturating_sub(lookback.saturating_sub(1)).max(1);
    for index in (first..=last).rev() {
        let (Some(fast), Some(slow), Some(fast_prev), Some(slow_prev)) = (
            indicators.value(CROSS_FAST, index),
            indicators.value(CROSS_SLOW, index),
            indicators.value(CROSS_FAST, index - 1),
            indicators.value(CROSS_SLOW, index - 1),
        ) else {
            continue;
        };
        if fast > slow && fast_prev <= slow_prev {
            return Some(Recommendation::Buy);
        }
        if fast < slow && fast_prev >= slow_prev {
            return Some(Recommendation::Sell);
        }
    }
    None
}
