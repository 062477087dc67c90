//! HTTP adapter.
//!
//! JSON API consumed by the charting client: price history with moving
//! averages, symbol search and the symbol list.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::domain::catalog::SymbolCatalog;
use crate::domain::history::HistoryService;

pub struct AppState {
    pub service: Arc<HistoryService>,
    pub catalog: Arc<SymbolCatalog>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/stock/{symbol}", get(handlers::stock_history))
        .route("/api/search", get(handlers::search_symbols))
        .route("/api/symbols", get(handlers::list_symbols))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}
