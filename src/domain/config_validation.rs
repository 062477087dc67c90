//! Configuration validation.
//!
//! Validates all config fields before the service starts.

use crate::domain::error::StockError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::net::SocketAddr;

pub const SOURCE_CSV: &str = "csv";
pub const SOURCE_POLYGON: &str = "polygon";

pub fn validate_service_config(config: &dyn ConfigPort) -> Result<(), StockError> {
    validate_listen(config)?;
    validate_history_source(config)?;
    validate_timeout(config)?;
    validate_cache_ttl(config)?;
    validate_max_start(config)?;
    validate_catalog_source(config)?;
    validate_prediction(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StockError {
    StockError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> StockError {
    StockError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn validate_listen(config: &dyn ConfigPort) -> Result<(), StockError> {
    if let Some(listen) = config.get_nonempty("server", "listen") {
        listen
            .parse::<SocketAddr>()
            .map_err(|_| invalid("server", "listen", format!("'{listen}' is not a host:port socket address")))?;
    }
    Ok(())
}

/// Source name for a section, defaulting to csv.
pub fn source_kind(config: &dyn ConfigPort, section: &str) -> String {
    config
        .get_nonempty(section, "source")
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| SOURCE_CSV.to_string())
}

fn validate_source(config: &dyn ConfigPort, section: &str, csv_key: &str) -> Result<(), StockError> {
    match source_kind(config, section).as_str() {
        SOURCE_CSV => {
            if config.get_nonempty(section, csv_key).is_none() {
                return Err(missing(section, csv_key));
            }
            Ok(())
        }
        SOURCE_POLYGON => {
            let has_key = config.get_nonempty("polygon", "api_key").is_some()
                || std::env::var("POLYGON_API_KEY").is_ok_and(|k| !k.trim().is_empty());
            if !has_key {
                return Err(missing("polygon", "api_key"));
            }
            if config.get_int("polygon", "max_pages", 5) < 1 {
                return Err(invalid("polygon", "max_pages", "max_pages must be at least 1"));
            }
            Ok(())
        }
        other => Err(invalid(
            section,
            "source",
            format!("unknown source '{other}', expected csv or polygon"),
        )),
    }
}

fn validate_history_source(config: &dyn ConfigPort) -> Result<(), StockError> {
    validate_source(config, "history", "data_dir")
}

fn validate_catalog_source(config: &dyn ConfigPort) -> Result<(), StockError> {
    validate_source(config, "catalog", "path")?;
    if config.get_int("catalog", "refresh_secs", 0) < 0 {
        return Err(invalid("catalog", "refresh_secs", "refresh_secs must be non-negative"));
    }
    Ok(())
}

fn validate_timeout(config: &dyn ConfigPort) -> Result<(), StockError> {
    let value = config.get_int("history", "timeout_ms", 10_000);
    if value <= 0 {
        return Err(invalid("history", "timeout_ms", "timeout_ms must be positive"));
    }
    Ok(())
}

fn validate_cache_ttl(config: &dyn ConfigPort) -> Result<(), StockError> {
    let value = config.get_int("history", "cache_ttl_secs", 300);
    if value < 0 {
        return Err(invalid("history", "cache_ttl_secs", "cache_ttl_secs must be non-negative"));
    }
    Ok(())
}

fn validate_max_start(config: &dyn ConfigPort) -> Result<(), StockError> {
    if let Some(value) = config.get_nonempty("history", "max_start") {
        NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
            invalid("history", "max_start", "invalid max_start format, expected YYYY-MM-DD")
        })?;
    }
    Ok(())
}

fn validate_prediction(config: &dyn ConfigPort) -> Result<(), StockError> {
    for key in ["spread_weight", "max_spread_points", "alignment_weight", "crossover_bonus"] {
        let value = config.get_double("prediction", key, 0.0);
        if value < 0.0 || !value.is_finite() {
            return Err(invalid("prediction", key, format!("{key} must be non-negative")));
        }
    }
    if config.get_int("prediction", "crossover_lookback", 5) < 1 {
        return Err(invalid(
            "prediction",
            "crossover_lookback",
            "crossover_lookback must be at least 1",
        ));
    }
    Ok(())
}

fn validate_log_level(config: &dyn ConfigPort) -> Result<(), StockError> {
    if let Some(level) = config.get_nonempty("log", "level") {
        level
            .parse::<log::LevelFilter>()
            .map_err(|_| invalid("log", "level", format!("unknown log level '{level}'")))?;
    }
    Ok(())
}
