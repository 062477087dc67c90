//! Symbol universe loading port.

use async_trait::async_trait;

use crate::domain::catalog::SymbolRecord;
use crate::domain::error::StockError;

/// Loads the full symbol universe used to (re)build the catalog.
#[async_trait]
pub trait SymbolSource: Send + Sync {
    async fn load_symbols(&self) -> Result<Vec<SymbolRecord>, StockError>;
}
