//! Range status and cycle report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{MachineTrend, TrendAnalysis};

/// Where a sensor's cycle average sits relative to its operational range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RangeStatus {
    /// 20-80% of range
    Good,
    /// Above 80% of range but within limits
    Warning,
    /// Below 20% of range but within limits
    PossiblyOffline,
    /// Exactly zero while within limits
    Offline,
    AboveRange,
    BelowRange,
}

impl RangeStatus {
    /// Outside the operational range altogether.
    pub fn is_fault(self) -> bool {
        matches!(self, Self::AboveRange | Self::BelowRange)
    }
}

impl std::fmt::Display for RangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => f.pad("GOOD"),
            Self::Warning => f.pad("WARNING"),
            Self::PossiblyOffline => f.pad("POSSIBLY OFFLINE"),
            Self::Offline => f.pad("OFFLINE"),
            Self::AboveRange => f.pad("ABOVE RANGE"),
            Self::BelowRange => f.pad("BELOW RANGE"),
        }
    }
}

/// Cycle-average view of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRangeStatus {
    pub sensor_id: String,
    pub average: f64,
    pub low: f64,
    pub high: f64,
    /// `None` when the range has zero width
    pub position_pct: Option<f64>,
    pub status: RangeStatus,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineHealthStatus {
    Critical,
    Offline,
    Warning,
    Good,
    Uncertain,
}

impl MachineHealthStatus {
    /// Whether the machine is believed to be running.
    pub fn running_label(self) -> &'static str {
        match self {
            Self::Critical => "RUNNING (FAULT)",
            Self::Offline => "NOT RUNNING",
            Self::Warning | Self::Good => "RUNNING",
            Self::Uncertain => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for MachineHealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => f.pad("CRITICAL"),
            Self::Offline => f.pad("OFFLINE"),
            Self::Warning => f.pad("WARNING"),
            Self::Good => f.pad("GOOD"),
            Self::Uncertain => f.pad("UNCERTAIN"),
        }
    }
}

/// Range-status counts for one machine over one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineStatus {
    pub machine: String,
    pub status: MachineHealthStatus,
    pub total_sensors: usize,
    pub good: usize,
    pub warning: usize,
    pub offline: usize,
    pub above: usize,
    pub below: usize,
    /// Mean position of in-range sensors (%)
    pub average_pct: f64,
}

/// Fleet-wide range-status tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSummary {
    pub good: usize,
    pub warning: usize,
    pub offline: usize,
    pub above: usize,
    pub below: usize,
}

impl RangeSummary {
    pub fn record(&mut self, status: RangeStatus) {
        let slot = match status {
            RangeStatus::Good => &mut self.good,
            RangeStatus::Warning => &mut self.warning,
            RangeStatus::Offline | RangeStatus::PossiblyOffline => &mut self.offline,
            RangeStatus::AboveRange => &mut self.above,
            RangeStatus::BelowRange => &mut self.below,
        };
        *slot += 1;
    }

    pub fn total(&self) -> usize {
        self.good + self.warning + self.offline + self.above + self.below
    }
}

/// Everything one analysis cycle produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub generated_at: DateTime<Utc>,
    pub sensors_tracked: usize,
    pub sensor_trends: Vec<TrendAnalysis>,
    pub machine_trends: Vec<MachineTrend>,
    pub sensor_status: Vec<SensorRangeStatus>,
    pub machine_status: Vec<MachineStatus>,
    pub range_summary: RangeSummary,
    /// Sensor ids with no machine delimiter
    pub unassigned_sensors: Vec<String>,
}

impl CycleReport {
    pub fn machine_trend(&self, machine: &str) -> Option<&MachineTrend> {
        self.machine_trends.iter().find(|m| m.machine == machine)
    }

    pub fn sensor_trend(&self, sensor_id: &str) -> Option<&TrendAnalysis> {
        self.sensor_trends.iter().find(|t| t.sensor_id == sensor_id)
    }
}
