//! Domain error types.

/// Top-level error type for stocklens.
#[derive(Debug, thiserror::Error)]
pub enum StockError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown symbol {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("upstream unavailable: {reason}")]
    UpstreamUnavailable { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("malformed data in {location}: {reason}")]
    MalformedData { location: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StockError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            reason: reason.into(),
        }
    }

    /// Stable machine-readable name, used in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            StockError::Validation { .. } => "validation_error",
            StockError::UnknownSymbol { .. } => "unknown_symbol",
            StockError::UpstreamUnavailable { .. } => "upstream_unavailable",
            StockError::NoData { .. } => "no_data",
            StockError::MalformedData { .. } => "malformed_data",
            StockError::ConfigParse { .. }
            | StockError::ConfigMissing { .. }
            | StockError::ConfigInvalid { .. } => "config_error",
            StockError::Io(_) => "io_error",
        }
    }

    /// Whether retrying the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StockError::UpstreamUnavailable { .. })
    }
}

impl From<&StockError> for std::process::ExitCode {
    fn from(err: &StockError) -> Self {
        let code: u8 = match err {
            StockError::Io(_) | StockError::MalformedData { .. } => 1,
            StockError::ConfigParse { .. }
            | StockError::ConfigMissing { .. }
            | StockError::ConfigInvalid { .. } => 2,
            StockError::Validation { .. } => 3,
            StockError::UnknownSymbol { .. } | StockError::NoData { .. } => 4,
            StockError::UpstreamUnavailable { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
