//! In-memory TTL cache in front of a history source.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::error::StockError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::history_port::HistorySource;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    symbol: String,
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug)]
struct CacheEntry {
    bars: Arc<Vec<OhlcvBar>>,
    expires_at: Instant,
}

/// Wraps a [`HistorySource`] and remembers successful fetches for `ttl`.
/// Errors are never cached. A zero TTL disables caching.
pub struct CachedHistorySource<S> {
    inner: S,
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl<S: HistorySource> CachedHistorySource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.ttl.is_zero()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.write().await.retain(|_, e| e.expires_at > now);
    }

    async fn lookup(&self, key: &CacheKey) -> Option<Arc<Vec<OhlcvBar>>> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| Instant::now() <= e.expires_at)
            .map(|e| Arc::clone(&e.bars))
    }
}

#[async_trait]
impl<S: HistorySource> HistorySource for CachedHistorySource<S> {
    async fn fetch_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, StockError> {
        if self.is_disabled() {
            return self.inner.fetch_daily(symbol, start_date, end_date).await;
        }

        let key = CacheKey {
            symbol: symbol.to_string(),
            start: start_date,
            end: end_date,
        };
        if let Some(bars) = self.lookup(&key).await {
            log::debug!("cache hit: {} {}..{}", symbol, start_date, end_date);
            return Ok(bars.as_ref().clone());
        }

        let bars = self.inner.fetch_daily(symbol, start_date, end_date).await?;
        let now = Instant::now();
        let entry = CacheEntry {
            bars: Arc::new(bars.clone()),
            expires_at: now + self.ttl,
        };
        // Keys roll with "today" and with caller-chosen ranges, so stale
        // entries are dropped on every insert.
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.expires_at > now);
        entries.insert(key, entry);
        Ok(bars)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
