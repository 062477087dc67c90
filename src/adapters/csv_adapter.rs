//! CSV file adapters: daily bars per symbol and the symbol list.
//!
//! Bars live in `{data_dir}/{SYMBOL}.csv` with a `date,open,high,low,close,volume`
//! header. The symbol list is a single file with `symbol,name` columns.

use async_trait::async_trait;
use chrono::NaiveDate;
use csv::StringRecord;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::catalog::SymbolRecord;
use crate::domain::error::StockError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::history_port::HistorySource;
use crate::ports::symbol_port::SymbolSource;

pub struct CsvHistorySource {
    base_path: PathBuf,
}

impl CsvHistorySource {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn csv_path(&self, symbol: &str) -> Result<PathBuf, StockError> {
        if symbol.is_empty() || symbol.contains(['/', '\\']) {
            return Err(StockError::validation("symbol", format!("'{symbol}' is not a file-safe ticker")));
        }
        Ok(self.base_path.join(format!("{}.csv", symbol)))
    }
}

#[async_trait]
impl HistorySource for CsvHistorySource {
    async fn fetch_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, StockError> {
        let path = self.csv_path(symbol)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StockError::UnknownSymbol {
                    symbol: symbol.to_string(),
                });
            }
            Err(e) => return Err(StockError::Io(e)),
        };

        let mut bars = parse_bars(&path, &content)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        if bars.is_empty() {
            return Err(StockError::NoData {
                symbol: symbol.to_string(),
            });
        }
        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Parses a whole bar file. A malformed row fails the file.
pub fn parse_bars(path: &Path, content: &str) -> Result<Vec<OhlcvBar>, StockError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());
    let mut bars = Vec::new();

    for (row, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| malformed(path, row, format!("CSV parse error: {e}")))?;
        let date_str = field(&record, 0, "date").map_err(|r| malformed(path, row, r))?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| malformed(path, row, format!("invalid date '{date_str}': {e}")))?;

        let price = |index: usize, name: &str| -> Result<f64, StockError> {
            let raw = field(&record, index, name).map_err(|r| malformed(path, row, r))?;
            raw.parse::<f64>()
                .map_err(|e| malformed(path, row, format!("invalid {name} value '{raw}': {e}")))
        };
        let open = price(1, "open")?;
        let high = price(2, "high")?;
        let low = price(3, "low")?;
        let close = price(4, "close")?;

        let raw_volume = field(&record, 5, "volume").map_err(|r| malformed(path, row, r))?;
        let volume = parse_volume(raw_volume)
            .ok_or_else(|| malformed(path, row, format!("invalid volume value '{raw_volume}'")))?;

        bars.push(OhlcvBar::new(date, open, high, low, close, volume));
    }

    Ok(bars)
}

fn field<'r>(record: &'r StringRecord, index: usize, name: &str) -> Result<&'r str, String> {
    record
        .get(index)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("missing {name} column"))
}

/// Volumes are integral, but some exports write them as `1234.0`.
fn parse_volume(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v.round() as u64)
    })
}

fn malformed(path: &Path, row: usize, reason: impl std::fmt::Display) -> StockError {
    StockError::MalformedData {
        location: format!("{} row {}", path.display(), row + 1),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct SymbolRow {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
}

pub struct CsvSymbolSource {
    path: PathBuf,
}

impl CsvSymbolSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SymbolSource for CsvSymbolSource {
    async fn load_symbols(&self) -> Result<Vec<SymbolRecord>, StockError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        parse_symbols(&self.path, &content)
    }
}

pub fn parse_symbols(path: &Path, content: &str) -> Result<Vec<SymbolRecord>, StockError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut records = Vec::new();

    for (row, result) in rdr.deserialize::<SymbolRow>().enumerate() {
        let parsed = result.map_err(|e| malformed(path, row, e))?;
        let record = SymbolRecord {
            symbol: parsed.symbol,
            name: parsed.name.filter(|n| !n.is_empty()),
        };
        records.push(record);
    }

    log::debug!("{}: {} symbol rows", path.display(), records.len());
    Ok(records)
}
