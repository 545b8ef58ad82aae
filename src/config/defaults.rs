//! System-wide default constants.
//!
//! Every tunable in [`TrendConfig`](super::TrendConfig) defaults to the value
//! defined here. Grouped by subsystem for easy discovery.

// ============================================================================
// Window Store
// ============================================================================

/// Readings retained per sensor.
pub const WINDOW_CAPACITY: usize = 100;

// ============================================================================
// Sensor Trend Analysis
// ============================================================================

/// Fewest points a window needs before a trend is reported.
pub const MIN_POINTS_FOR_ANALYSIS: usize = 3;

/// |slope| below this (units/second) is classified STABLE.
pub const STABLE_SLOPE_EPSILON: f64 = 0.001;

/// R² strictly above this is HIGH confidence.
pub const HIGH_CONFIDENCE_R2: f64 = 0.8;

/// R² strictly above this (and not HIGH) is MEDIUM confidence.
pub const MEDIUM_CONFIDENCE_R2: f64 = 0.5;

/// Short forecast horizon (seconds past the latest sample).
pub const FORECAST_SHORT_SECS: f64 = 300.0;

/// Long forecast horizon (seconds past the latest sample).
pub const FORECAST_LONG_SECS: f64 = 600.0;

/// Lower edge of the healthy band (% of range).
pub const WARNING_BAND_LOW_PCT: f64 = 20.0;

/// Upper edge of the healthy band (% of range).
pub const WARNING_BAND_HIGH_PCT: f64 = 80.0;

// ============================================================================
// Health Score
// ============================================================================

/// Points lost per percent outside the healthy band.
pub const POSITION_PENALTY_FACTOR: f64 = 2.0;

/// Points lost per unit/second of slope moving away from mid-range.
pub const TREND_PENALTY_FACTOR: f64 = 100.0;

/// Points gained for a STABLE signal.
pub const STABILITY_BONUS: f64 = 10.0;

// ============================================================================
// Machine Aggregation
// ============================================================================

/// Sensor health below this counts as degrading.
pub const DEGRADING_HEALTH_BELOW: f64 = 60.0;

/// Sensor health above this counts as improving.
pub const IMPROVING_HEALTH_ABOVE: f64 = 80.0;

/// Time-to-warning under this (seconds) marks a sensor at risk.
pub const AT_RISK_HORIZON_SECS: u64 = 600;

/// Separates the machine name from the sensor name in a sensor id.
pub const MACHINE_DELIMITER: char = ':';

// ============================================================================
// Scheduling & Server
// ============================================================================

/// Period of the analyze-and-aggregate pass (seconds).
pub const ANALYSIS_INTERVAL_SECS: u64 = 10;

/// Default bind address for the status API.
pub const SERVER_ADDR: &str = "0.0.0.0:8080";

/// Default operational limits file.
pub const LIMITS_PATH: &str = "files/sensor_operational_range.csv";
