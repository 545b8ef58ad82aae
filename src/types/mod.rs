//! Shared data structures for the predictive maintenance pipeline
//!
//! This module defines the types that flow through the engine:
//! - Ingestion: `ReadingMessage` (wire form), `SensorReading` (one numeric point)
//! - Configuration: `OperationalLimit`, `LimitsRegistry`
//! - Analysis: `TrendAnalysis` (per sensor), `MachineTrend` (per machine)
//! - Range status: `SensorRangeStatus`, `MachineStatus`
//! - Output: `CycleReport` (one per analysis cycle)

mod limits;
mod reading;
mod report;
mod trend;

pub use limits::*;
pub use reading::*;
pub use report::*;
pub use trend::*;
