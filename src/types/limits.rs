//! Operational limits registry

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Normal operating bounds for one sensor.
///
/// `high >= low` is checked when limits are loaded from disk; values built
/// by hand are trusted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationalLimit {
    pub low: f64,
    pub high: f64,
}

impl OperationalLimit {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Width of the operational range.
    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    /// Position of `value` within the range as a percentage.
    ///
    /// A zero-width range pins the position to 50%.
    pub fn position_pct(&self, value: f64) -> f64 {
        let span = self.span();
        if span == 0.0 {
            50.0
        } else {
            (value - self.low) / span * 100.0
        }
    }

    /// Absolute value at `pct` percent of the range.
    pub fn value_at_pct(&self, pct: f64) -> f64 {
        self.low + self.span() * pct / 100.0
    }
}

/// Immutable sensor id -> limit mapping, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsRegistry {
    limits: HashMap<String, OperationalLimit>,
}

impl LimitsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sensor_id: impl Into<String>, limit: OperationalLimit) {
        self.limits.insert(sensor_id.into(), limit);
    }

    pub fn get(&self, sensor_id: &str) -> Option<&OperationalLimit> {
        self.limits.get(sensor_id)
    }

    pub fn contains(&self, sensor_id: &str) -> bool {
        self.limits.contains_key(sensor_id)
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OperationalLimit)> {
        self.limits.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, OperationalLimit)> for LimitsRegistry {
    fn from_iter<I: IntoIterator<Item = (String, OperationalLimit)>>(iter: I) -> Self {
        Self {
            limits: iter.into_iter().collect(),
        }
    }
}
