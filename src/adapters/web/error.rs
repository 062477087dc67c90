//! HTTP error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::domain::error::StockError;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    kind: &'a str,
}

impl WebError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }
}

pub fn status_from_error(err: &StockError) -> StatusCode {
    match err {
        StockError::Validation { .. } => StatusCode::BAD_REQUEST,
        StockError::UnknownSymbol { .. } => StatusCode::NOT_FOUND,
        StockError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        StockError::NoData { .. }
        | StockError::MalformedData { .. }
        | StockError::ConfigParse { .. }
        | StockError::ConfigMissing { .. }
        | StockError::ConfigInvalid { .. }
        | StockError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<StockError> for WebError {
    fn from(err: StockError) -> Self {
        let status = status_from_error(&err);
        if status.is_server_error() {
            log::error!("request failed: {}", err);
        }
        Self::new(status, err.kind(), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: &self.message,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_domain_errors_to_statuses() {
        assert_eq!(
            status_from_error(&StockError::validation("interval", "bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_from_error(&StockError::UnknownSymbol { symbol: "X".into() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_from_error(&StockError::upstream("timeout")),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_from_error(&StockError::Io(std::io::Error::other("disk"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_from_error(&StockError::MalformedData {
                location: "AAPL.csv row 3".into(),
                reason: "invalid close".into(),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn keeps_error_kind() {
        let err = WebError::from(StockError::UnknownSymbol { symbol: "ZZZZ".into() });
        assert_eq!(err.kind, "unknown_symbol");
        assert_eq!(err.message, "unknown symbol ZZZZ");
    }
}
