//! Trend verdicts produced each analysis cycle

use serde::{Deserialize, Serialize};

/// Short-term direction of a single sensor signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Stable,
    Increasing,
    Decreasing,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stable => f.pad("STABLE"),
            Self::Increasing => f.pad("INCREASING"),
            Self::Decreasing => f.pad("DECREASING"),
        }
    }
}

/// Qualitative fit quality bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => f.pad("HIGH"),
            Self::Medium => f.pad("MEDIUM"),
            Self::Low => f.pad("LOW"),
        }
    }
}

/// Per-sensor verdict, recomputed from scratch every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub sensor_id: String,
    /// Rate of change per second
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub direction: TrendDirection,
    pub confidence: Confidence,
    /// Extrapolated value 300s after the latest sample
    pub forecast_short: f64,
    /// Extrapolated value 600s after the latest sample
    pub forecast_long: f64,
    /// Latest value's position within the operational range (%)
    pub position_pct: f64,
    /// 0-100, higher is healthier
    pub health_score: f64,
    /// Seconds until the 20%/80% warning band is crossed
    pub time_to_warning: Option<u64>,
    /// Seconds until the hard operational limit is crossed
    pub time_to_critical: Option<u64>,
    pub latest_value: f64,
    pub sample_count: usize,
}

/// Machine-level direction derived from the health of its sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineDirection {
    Improving,
    Degrading,
    Stable,
}

impl std::fmt::Display for MachineDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Improving => f.pad("IMPROVING"),
            Self::Degrading => f.pad("DEGRADING"),
            Self::Stable => f.pad("STABLE"),
        }
    }
}

/// Roll-up of all qualifying sensor verdicts for one machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineTrend {
    pub machine: String,
    pub direction: MachineDirection,
    /// Mean health score of qualifying sensors
    pub health_score: f64,
    /// Qualifying sensors expected to reach their warning band within the horizon
    pub sensors_at_risk: usize,
    /// Earliest time-to-critical across qualifying sensors (seconds)
    pub estimated_fail_time: Option<u64>,
    pub confidence: Confidence,
    pub qualifying_sensors: usize,
}
