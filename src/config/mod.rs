//! Configuration Module
//!
//! Two independent inputs, both loaded once at startup:
//!
//! - [`TrendConfig`]: analysis tuning from TOML
//!   (`$PDM_CONFIG`, then `./pdm_config.toml`, then built-in defaults)
//! - [`LimitsRegistry`](crate::types::LimitsRegistry): per-sensor operational
//!   ranges from CSV, see [`limits`]
//!
//! Both are handed to [`TrendEngine`](crate::engine::TrendEngine) by value;
//! nothing here is process-global.

mod trend_config;
pub mod defaults;
pub mod limits;

pub use trend_config::*;
