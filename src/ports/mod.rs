//! Port traits at the edges of the domain.

pub mod config_port;
pub mod history_port;
pub mod symbol_port;
