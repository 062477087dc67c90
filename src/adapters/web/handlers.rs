//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::catalog::{DEFAULT_SEARCH_LIMIT, SymbolRecord};
use crate::domain::date_range::{DateRange, parse_date};
use crate::domain::error::StockError;
use crate::domain::history::{BarRecord, HistoryQuery};
use crate::domain::interval::Interval;

use super::{AppState, WebError};

#[derive(Debug, Default, Deserialize)]
pub struct StockParams {
    pub date_range: Option<String>,
    pub interval: Option<String>,
    pub auto_predict: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl StockParams {
    pub fn into_query(self, symbol: String) -> Result<HistoryQuery, StockError> {
        let date_range = match (self.start.as_deref(), self.end.as_deref()) {
            (Some(start), Some(end)) => {
                DateRange::between(parse_date("start", start)?, parse_date("end", end)?)?
            }
            (Some(_), None) => return Err(StockError::validation("end", "end is required with start")),
            (None, Some(_)) => return Err(StockError::validation("start", "start is required with end")),
            (None, None) => self.date_range.as_deref().unwrap_or("max").parse()?,
        };
        let interval = match self.interval.as_deref() {
            Some(raw) if !raw.trim().is_empty() => raw.parse()?,
            _ => Interval::default(),
        };
        let auto_predict = parse_flag("auto_predict", self.auto_predict.as_deref())?;

        Ok(HistoryQuery::new(symbol)
            .with_range(date_range)
            .with_interval(interval)
            .with_prediction(auto_predict))
    }
}

fn parse_flag(field: &str, raw: Option<&str>) -> Result<bool, StockError> {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(StockError::validation(field, format!("'{other}' is not a boolean"))),
    }
}

pub async fn stock_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(params): Query<StockParams>,
) -> Result<Json<Vec<BarRecord>>, WebError> {
    let query = params.into_query(symbol)?;
    let annotated = state.service.get_history(&query).await?;
    Ok(Json(annotated.records()))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub limit: Option<String>,
}

pub async fn search_symbols(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SymbolRecord>>, WebError> {
    let limit = match params.limit.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_SEARCH_LIMIT,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| WebError::bad_request(format!("invalid limit: '{raw}' is not a count")))?,
    };
    let query = params.query.unwrap_or_default();
    Ok(Json(state.catalog.search(&query, limit)))
}

pub async fn list_symbols(State(state): State<Arc<AppState>>) -> Json<Vec<SymbolRecord>> {
    Json(state.catalog.list_all())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub symbols: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        symbols: state.catalog.len(),
    })
}

pub async fn not_found() -> WebError {
    WebError::not_found("Page not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn defaults_to_max_daily_without_prediction() {
        let query = StockParams::default().into_query("AAPL".into()).unwrap();
        assert_eq!(query.date_range, DateRange::Max);
        assert_eq!(query.interval, Interval::Daily);
        assert!(!query.auto_predict);
    }

    #[test]
    fn explicit_dates_take_precedence() {
        let params = StockParams {
            date_range: Some("1y".into()),
            start: Some("2024-01-01".into()),
            end: Some("2024-03-31".into()),
            ..Default::default()
        };
        let query = params.into_query("AAPL".into()).unwrap();
        assert_eq!(
            query.date_range,
            DateRange::Between {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            }
        );
    }

    #[test]
    fn start_without_end_is_rejected() {
        let params = StockParams {
            start: Some("2024-01-01".into()),
            ..Default::default()
        };
        assert!(params.into_query("AAPL".into()).is_err());
    }

    #[test]
    fn parses_interval_and_flag() {
        let params = StockParams {
            interval: Some("weekly".into()),
            auto_predict: Some("TRUE".into()),
            ..Default::default()
        };
        let query = params.into_query("AAPL".into()).unwrap();
        assert_eq!(query.interval, Interval::Weekly);
        assert!(query.auto_predict);
    }

    #[test]
    fn bad_flag_is_rejected() {
        assert!(parse_flag("auto_predict", Some("maybe")).is_err());
    }
}
