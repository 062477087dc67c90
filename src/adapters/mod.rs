//! Concrete adapter implementations for ports.

pub mod cache;
pub mod csv_adapter;
pub mod file_config_adapter;
#[cfg(feature = "polygon")]
pub mod polygon_adapter;
#[cfg(feature = "web")]
pub mod web;
