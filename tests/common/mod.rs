#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use stocklens::domain::catalog::SymbolRecord;
use stocklens::domain::error::StockError;
pub use stocklens::domain::ohlcv::OhlcvBar;
use stocklens::ports::history_port::HistorySource;
use stocklens::ports::symbol_port::SymbolSource;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub enum MockFailure {
    Unknown,
    Upstream(String),
    NoData,
}

/// In-memory history source. Returns every stored bar regardless of the range
/// so callers' own filtering is exercised.
pub struct MockHistorySource {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, MockFailure>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl MockHistorySource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, failure: MockFailure) -> Self {
        self.errors.insert(symbol.to_string(), failure);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HistorySource for MockHistorySource {
    async fn fetch_daily(
        &self,
        symbol: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, StockError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.errors.get(symbol) {
            Some(MockFailure::Unknown) => {
                return Err(StockError::UnknownSymbol {
                    symbol: symbol.to_string(),
                });
            }
            Some(MockFailure::Upstream(reason)) => return Err(StockError::upstream(reason.clone())),
            Some(MockFailure::NoData) => {
                return Err(StockError::NoData {
                    symbol: symbol.to_string(),
                });
            }
            None => {}
        }
        self.data
            .get(symbol)
            .cloned()
            .ok_or_else(|| StockError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Symbol source whose answer can be swapped between loads.
pub struct MockSymbolSource {
    pub records: Mutex<Result<Vec<SymbolRecord>, String>>,
    pub loads: AtomicUsize,
}

impl MockSymbolSource {
    pub fn new(records: Vec<SymbolRecord>) -> Self {
        Self {
            records: Mutex::new(Ok(records)),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, next: Result<Vec<SymbolRecord>, String>) {
        *self.records.lock().unwrap() = next;
    }
}

#[async_trait]
impl SymbolSource for MockSymbolSource {
    async fn load_symbols(&self) -> Result<Vec<SymbolRecord>, StockError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .unwrap()
            .clone()
            .map_err(StockError::upstream)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar::new(
        NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        close,
        close + 1.0,
        close - 1.0,
        close,
        1000,
    )
}

/// `count` consecutive calendar-day bars with closes `start_price + i * step`.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64, step: f64) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let close = start_price + i as f64 * step;
            OhlcvBar::new(
                start + chrono::Duration::days(i as i64),
                close,
                close + 1.0,
                close - 1.0,
                close,
                1000,
            )
        })
        .collect()
}

pub fn sample_symbols() -> Vec<SymbolRecord> {
    vec![
        SymbolRecord::new("AAPL").with_name("Apple Inc."),
        SymbolRecord::new("AAP").with_name("Advance Auto Parts"),
        SymbolRecord::new("SNAP").with_name("Snap Inc."),
        SymbolRecord::new("MSFT").with_name("Microsoft Corporation"),
    ]
}
