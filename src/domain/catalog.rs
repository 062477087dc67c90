//! Symbol catalog: the universe of tradable symbols.
//!
//! The catalog is read by every request and replaced as a whole on refresh.
//! Readers take an `Arc` snapshot, so a refresh never exposes a half-built list.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 20;
pub const MIN_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SymbolRecord {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Default)]
pub struct SymbolCatalog {
    records: RwLock<Arc<Vec<SymbolRecord>>>,
}

impl SymbolCatalog {
    pub fn new(records: Vec<SymbolRecord>) -> Self {
        Self {
            records: RwLock::new(Arc::new(normalize(records))),
        }
    }

    /// Swaps in a freshly loaded catalog.
    pub fn replace(&self, records: Vec<SymbolRecord>) {
        let records = Arc::new(normalize(records));
        let count = records.len();
        let mut guard = match self.records.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = records;
        drop(guard);
        log::info!("symbol catalog replaced: {} symbols", count);
    }

    pub fn snapshot(&self) -> Arc<Vec<SymbolRecord>> {
        let guard = match self.records.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&guard)
    }

    pub fn list_all(&self) -> Vec<SymbolRecord> {
        self.snapshot().as_ref().clone()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        let wanted = symbol.trim().to_uppercase();
        self.snapshot().iter().any(|r| r.symbol == wanted)
    }

    /// Symbols starting with the query come first. The second group holds
    /// records whose name contains the query or whose symbol contains any
    /// two-character fragment of it, so `AAP` still surfaces `SNAP`. Each
    /// group is alphabetical by symbol.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SymbolRecord> {
        let needle = query.trim().to_uppercase();
        if needle.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }
        let limit = limit.min(MAX_SEARCH_LIMIT);
        if limit == 0 {
            return Vec::new();
        }

        let fragments = fragments(&needle);
        let records = self.snapshot();
        let mut prefix: Vec<&SymbolRecord> = Vec::new();
        let mut related: Vec<&SymbolRecord> = Vec::new();

        for record in records.iter() {
            if record.symbol.starts_with(&needle) {
                prefix.push(record);
            } else if fragments.iter().any(|f| record.symbol.contains(f.as_str()))
                || record
                    .name
                    .as_deref()
                    .is_some_and(|name| name.to_uppercase().contains(&needle))
            {
                related.push(record);
            }
        }

        prefix.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        related.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        prefix
            .into_iter()
            .chain(related)
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Every contiguous `MIN_QUERY_LEN`-character window of the query. Longer
/// fragments always contain one of these.
fn fragments(needle: &str) -> Vec<String> {
    let chars: Vec<char> = needle.chars().collect();
    chars
        .windows(MIN_QUERY_LEN)
        .map(|w| w.iter().collect())
        .collect()
}

/// Trims and uppercases symbols, drops blanks, and keeps one record per symbol
/// (the first one carrying a name wins).
fn normalize(records: Vec<SymbolRecord>) -> Vec<SymbolRecord> {
    let mut out: Vec<SymbolRecord> = Vec::with_capacity(records.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());

    for record in records {
        let symbol = record.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            continue;
        }
        let name = record
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        if seen.contains(&symbol) {
            if let Some(existing) = out.iter_mut().find(|r| r.symbol == symbol) {
                if existing.name.is_none() {
                    existing.name = name;
                }
            }
            continue;
        }
        seen.insert(symbol.clone());
        out.push(SymbolRecord { symbol, name });
    }

    out
}
