//! Core domain types and logic.

pub mod ohlcv;
pub mod interval;
pub mod series;
pub mod date_range;
pub mod resample;
pub mod indicator;
pub mod prediction;
pub mod catalog;
pub mod history;
pub mod config_validation;
pub mod error;
