//! Upstream price history port.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::error::StockError;
use crate::domain::ohlcv::OhlcvBar;

/// Source of raw daily bars. Implementations only fetch: no resampling, no indicators.
///
/// Errors: `UnknownSymbol` when the provider does not know the ticker,
/// `UpstreamUnavailable` when it cannot be reached, `NoData` when the ticker is
/// valid but has no bars in `[start_date, end_date]`.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, StockError>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}
