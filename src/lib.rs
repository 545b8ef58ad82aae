//! pdm-trends: Predictive Maintenance Trend Analysis
//!
//! Tracks a sliding window of readings per sensor, fits a linear trend,
//! and turns it into forward-looking health verdicts for sensors and the
//! machines they belong to.
//!
//! ## Architecture
//!
//! - **Window Store**: bounded per-sensor reading history, safe for concurrent producers
//! - **Regression**: closed-form least squares with degenerate-input fallbacks
//! - **Sensor Analyzer**: direction, confidence, forecasts, health, time-to-threshold
//! - **Machine Aggregator**: qualifying-sensor roll-up into a machine verdict
//! - **Engine**: one explicit instance owning store, limits and config

pub mod analysis;
pub mod api;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod report;
pub mod types;
pub mod window;

pub use config::TrendConfig;
pub use engine::{IngestCounts, TrendEngine};

pub use types::{
    Confidence, CycleReport, LimitsRegistry, MachineDirection, MachineTrend, OperationalLimit,
    ReadingMessage, SensorReading, TrendAnalysis, TrendDirection,
};

pub use analysis::{aggregate_machine, analyze_window, linear_regression, LinearFit};
pub use window::{WindowSnapshot, WindowStore};
