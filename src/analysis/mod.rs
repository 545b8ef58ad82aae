//! Trend Analysis Module
//!
//! Stateless computations over window snapshots:
//!
//! - `regression`: closed-form least squares with deterministic fallbacks
//! - `sensor`: per-sensor trend verdict (direction, confidence, health, ETAs)
//! - `machine`: machine-name rule and machine-level roll-up
//! - `range_status`: cycle-average range labels per sensor and machine

pub mod machine;
pub mod range_status;
pub mod regression;
pub mod sensor;

pub use machine::{aggregate_machine, belongs_to, machine_name};
pub use regression::{linear_regression, LinearFit};
pub use sensor::analyze_window;
