//! Daily to weekly/monthly bar aggregation.
//!
//! Bars are grouped by the calendar period of their trading date (ISO week or
//! calendar month). Each group becomes one bar dated on the group's last trading
//! day, so a trailing partial period is emitted with only the days seen so far.

use chrono::{Datelike, NaiveDate};

use crate::domain::error::StockError;
use crate::domain::interval::Interval;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::series::Series;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeriodKey {
    Day(NaiveDate),
    IsoWeek { year: i32, week: u32 },
    Month { year: i32, month: u32 },
}

fn period_key(date: NaiveDate, interval: Interval) -> PeriodKey {
    match interval {
        Interval::Daily => PeriodKey::Day(date),
        Interval::Weekly => {
            let iso = date.iso_week();
            PeriodKey::IsoWeek {
                year: iso.year(),
                week: iso.week(),
            }
        }
        Interval::Monthly => PeriodKey::Month {
            year: date.year(),
            month: date.month(),
        },
    }
}

pub fn resample(series: &Series, interval: Interval) -> Result<Series, StockError> {
    if interval == series.interval() {
        return Ok(series.clone());
    }
    if interval.rank() < series.interval().rank() {
        return Err(StockError::validation(
            "interval",
            format!(
                "cannot resample a {} series down to {}",
                series.interval(),
                interval
            ),
        ));
    }

    let bars = aggregate_bars(series.bars(), interval);
    Series::new(series.symbol(), interval, bars)
}

/// Groups consecutive bars sharing a period and folds each group into one bar.
pub fn aggregate_bars(bars: &[OhlcvBar], interval: Interval) -> Vec<OhlcvBar> {
    let mut aggregated: Vec<OhlcvBar> = Vec::new();
    let mut current: Option<(PeriodKey, OhlcvBar)> = None;

    for bar in bars {
        let key = period_key(bar.date, interval);
        match current.as_mut() {
            Some((current_key, agg)) if *current_key == key => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume = agg.volume.saturating_add(bar.volume);
                agg.date = bar.date;
            }
            _ => {
                if let Some((_, done)) = current.take() {
                    aggregated.push(done);
                }
                current = Some((key, bar.clone()));
            }
        }
    }

    if let Some((_, done)) = current {
        aggregated.push(done);
    }

    aggregated
}
