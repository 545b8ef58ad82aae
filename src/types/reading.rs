//! Sensor readings as they arrive from the ingestion layer

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One accepted numeric reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    pub fn new(sensor_id: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            value,
            timestamp,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReadingError {
    #[error("Malformed reading message: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wire form of one published batch: every sensor of the fleet at one instant.
///
/// ```json
/// {"timestamp": "2025-03-01T10:00:00.123", "source": "plc-7",
///  "readings": {"GTM2:BearingTemp": "71.25", "GTM2:Mode": "RUN"}}
/// ```
///
/// Values may be JSON numbers or strings; only finite numerics survive
/// [`decode`](ReadingMessage::decode).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadingMessage {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub readings: BTreeMap<String, serde_json::Value>,
}

/// Numeric readings extracted from a [`ReadingMessage`].
#[derive(Debug, Clone, Default)]
pub struct DecodedMessage {
    pub readings: Vec<SensorReading>,
    /// Entries dropped because their value was not a finite number.
    pub skipped: usize,
}

impl ReadingMessage {
    pub fn from_json(line: &str) -> Result<Self, ReadingError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Message timestamp, falling back to `received_at` when absent or unparseable.
    pub fn resolve_timestamp(&self, received_at: DateTime<Utc>) -> DateTime<Utc> {
        match self.timestamp.as_deref() {
            Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
                tracing::debug!(timestamp = raw, "Unparseable message timestamp, using arrival time");
                received_at
            }),
            None => received_at,
        }
    }

    /// Split the message into numeric readings, filtering state values.
    pub fn decode(&self, received_at: DateTime<Utc>) -> DecodedMessage {
        let timestamp = self.resolve_timestamp(received_at);
        let mut decoded = DecodedMessage::default();

        for (sensor_id, raw) in &self.readings {
            match parse_value(raw) {
                Some(value) => decoded
                    .readings
                    .push(SensorReading::new(sensor_id.clone(), value, timestamp)),
                None => decoded.skipped += 1,
            }
        }

        decoded
    }
}

/// Accepts RFC 3339, or naive ISO-8601 interpreted as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn parse_value(raw: &serde_json::Value) -> Option<f64> {
    let value = match raw {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}
