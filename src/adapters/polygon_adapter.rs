//! Polygon.io REST adapter: daily aggregates and the US stock ticker list.
//!
//! Response parsing is kept in free functions so it can be tested without a network.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use crate::domain::catalog::SymbolRecord;
use crate::domain::error::StockError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::config_port::ConfigPort;
use crate::ports::history_port::HistorySource;
use crate::ports::symbol_port::SymbolSource;

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";
pub const DEFAULT_MAX_PAGES: usize = 5;
pub const API_KEY_ENV: &str = "POLYGON_API_KEY";

#[derive(Debug, Deserialize)]
struct AggregatesPayload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    results: Option<Vec<AggregateBar>>,
}

#[derive(Debug, Deserialize)]
struct AggregateBar {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    #[serde(default)]
    v: f64,
}

#[derive(Debug, Deserialize)]
struct TickersPayload {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Vec<TickerEntry>,
    #[serde(default)]
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    ticker: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    locale: Option<String>,
}

/// One page of the ticker listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerPage {
    pub records: Vec<SymbolRecord>,
    pub next_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PolygonClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_pages: usize,
}

impl PolygonClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, StockError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("stocklens/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| StockError::upstream(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Builds a client from `[polygon]`, falling back to `POLYGON_API_KEY` for the key.
    pub fn from_config(config: &dyn ConfigPort, timeout: Duration) -> Result<Self, StockError> {
        let api_key = config
            .get_nonempty("polygon", "api_key")
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| StockError::ConfigMissing {
                section: "polygon".to_string(),
                key: "api_key".to_string(),
            })?;
        let base_url = config
            .get_nonempty("polygon", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let max_pages = config.get_int("polygon", "max_pages", DEFAULT_MAX_PAGES as i64);

        Ok(Self::new(api_key, timeout)?
            .with_base_url(base_url)
            .with_max_pages(usize::try_from(max_pages).unwrap_or(DEFAULT_MAX_PAGES)))
    }

    pub fn aggregates_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}?adjusted=true&sort=asc&limit=50000",
            self.base_url,
            symbol,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )
    }

    pub fn tickers_url(&self) -> String {
        format!(
            "{}/v3/reference/tickers?market=stocks&active=true&limit=1000",
            self.base_url
        )
    }

    async fn get(&self, url: &str) -> Result<(u16, String), StockError> {
        let response = self
            .http
            .get(url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| self.transport_error("polygon request failed", e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error("polygon response body", e))?;
        Ok((status, body))
    }

    /// The request URL carries the api key, so it is stripped before the
    /// error can reach a log line or a response body.
    fn transport_error(&self, context: &str, err: reqwest::Error) -> StockError {
        let err = err.without_url();
        StockError::upstream(format!("{context}: {}", redact(&err.to_string(), &self.api_key)))
    }
}

#[async_trait]
impl HistorySource for PolygonClient {
    async fn fetch_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, StockError> {
        let url = self.aggregates_url(symbol, start_date, end_date);
        let (status, body) = self.get(&url).await?;
        parse_aggregates(symbol, status, &body)
    }

    fn name(&self) -> &str {
        "polygon"
    }
}

#[async_trait]
impl SymbolSource for PolygonClient {
    async fn load_symbols(&self) -> Result<Vec<SymbolRecord>, StockError> {
        let mut url = self.tickers_url();
        let mut records = Vec::new();

        for page in 1..=self.max_pages {
            let (status, body) = self.get(&url).await?;
            let parsed = parse_tickers_page(status, &body)?;
            log::debug!("polygon tickers page {}: {} symbols", page, parsed.records.len());
            records.extend(parsed.records);
            match parsed.next_url {
                Some(next) => url = next,
                None => return Ok(records),
            }
        }

        log::warn!(
            "polygon ticker listing truncated after {} pages ({} symbols)",
            self.max_pages,
            records.len()
        );
        Ok(records)
    }
}

fn redact(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        text.to_string()
    } else {
        text.replace(secret, "***")
    }
}

fn http_status_error(symbol: Option<&str>, status: u16) -> Option<StockError> {
    match (status, symbol) {
        (200..=299, _) => None,
        (404, Some(symbol)) => Some(StockError::UnknownSymbol {
            symbol: symbol.to_string(),
        }),
        (429, _) => Some(StockError::upstream("polygon rate limit exceeded")),
        _ => Some(StockError::upstream(format!("polygon returned HTTP {status}"))),
    }
}

/// Maps an aggregates response to daily bars.
pub fn parse_aggregates(symbol: &str, http_status: u16, body: &str) -> Result<Vec<OhlcvBar>, StockError> {
    if let Some(err) = http_status_error(Some(symbol), http_status) {
        return Err(err);
    }

    let payload: AggregatesPayload = serde_json::from_str(body)
        .map_err(|e| StockError::upstream(format!("polygon aggregates payload: {e}")))?;

    match payload.status.as_deref() {
        Some("OK") | Some("DELAYED") => {}
        Some("NOT_FOUND") => {
            return Err(StockError::UnknownSymbol {
                symbol: symbol.to_string(),
            });
        }
        other => {
            let reason = payload
                .error
                .or(payload.message)
                .unwrap_or_else(|| format!("unexpected status {}", other.unwrap_or("<missing>")));
            return Err(StockError::upstream(format!("polygon: {reason}")));
        }
    }

    let results = payload.results.unwrap_or_default();
    if results.is_empty() {
        return Err(StockError::NoData {
            symbol: symbol.to_string(),
        });
    }

    results
        .into_iter()
        .map(|bar| {
            let date = DateTime::from_timestamp_millis(bar.t)
                .map(|ts| ts.date_naive())
                .ok_or_else(|| StockError::upstream(format!("polygon timestamp {} out of range", bar.t)))?;
            let volume = if bar.v.is_finite() && bar.v > 0.0 { bar.v.round() as u64 } else { 0 };
            Ok(OhlcvBar::new(date, bar.o, bar.h, bar.l, bar.c, volume))
        })
        .collect()
}

/// Parses one page of `/v3/reference/tickers`, keeping US stocks only.
pub fn parse_tickers_page(http_status: u16, body: &str) -> Result<TickerPage, StockError> {
    if let Some(err) = http_status_error(None, http_status) {
        return Err(err);
    }

    let payload: TickersPayload = serde_json::from_str(body)
        .map_err(|e| StockError::upstream(format!("polygon tickers payload: {e}")))?;

    match payload.status.as_deref() {
        Some("OK") | Some("DELAYED") => {}
        other => {
            let reason = payload
                .error
                .unwrap_or_else(|| format!("unexpected status {}", other.unwrap_or("<missing>")));
            return Err(StockError::upstream(format!("polygon: {reason}")));
        }
    }

    let records = payload
        .results
        .into_iter()
        .filter(|t| t.market.as_deref() == Some("stocks") && t.locale.as_deref() == Some("us"))
        .map(|t| SymbolRecord {
            symbol: t.ticker,
            name: t.name,
        })
        .collect();

    Ok(TickerPage {
        records,
        next_url: payload.next_url.filter(|u| !u.is_empty()),
    })
}
