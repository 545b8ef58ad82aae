//! Operational limits loader
//!
//! Reads the per-sensor range table exported from the fleet mapping:
//!
//! ```text
//! machineName:sensorName,operationalHigh,operationalLow
//! GTM2:BearingTemp,95.0,10.0
//! ```
//!
//! The first row is always treated as a header. Rows that are short,
//! unparseable, or inverted (`high < low`) are skipped with a warning; they
//! never abort the load.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::types::{LimitsRegistry, OperationalLimit};

#[derive(Debug, Error)]
pub enum LimitsError {
    #[error("Failed to read limits file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Limits file {} is empty", .0.display())]
    Empty(PathBuf),
}

/// Counts from one load, for startup logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: usize,
    pub skipped: usize,
}

/// Load limits from a CSV file.
pub fn load_limits(path: &Path) -> Result<LimitsRegistry, LimitsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LimitsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Err(LimitsError::Empty(path.to_path_buf()));
    }

    let (registry, stats) = parse_limits(&contents);
    info!(
        path = %path.display(),
        loaded = stats.loaded,
        skipped = stats.skipped,
        "Loaded {} operational limits",
        stats.loaded
    );
    Ok(registry)
}

/// Parse limits from CSV text. The first line is the header.
pub fn parse_limits(contents: &str) -> (LimitsRegistry, LoadStats) {
    let mut registry = LimitsRegistry::new();
    let mut stats = LoadStats::default();

    for (line_no, line) in contents.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = csv_split(line);
        if fields.len() < 3 {
            stats.skipped += 1;
            continue;
        }

        let sensor_id = fields[0].trim();
        let Some(high) = parse_bound(sensor_id, "high", &fields[1], line_no) else {
            stats.skipped += 1;
            continue;
        };
        let Some(low) = parse_bound(sensor_id, "low", &fields[2], line_no) else {
            stats.skipped += 1;
            continue;
        };

        if high < low {
            warn!(
                sensor = sensor_id,
                line = line_no + 1,
                "Operational high {} is below low {}, skipping",
                high,
                low
            );
            stats.skipped += 1;
            continue;
        }

        registry.insert(sensor_id, OperationalLimit::new(low, high));
        stats.loaded += 1;
    }

    (registry, stats)
}

fn parse_bound(sensor_id: &str, which: &str, raw: &str, line_no: usize) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            warn!(
                sensor = sensor_id,
                line = line_no + 1,
                "Invalid {} value {:?}, skipping",
                which,
                raw
            );
            None
        }
    }
}

/// Split a CSV line respecting quoted fields (handles commas inside quotes).
fn csv_split(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    // Escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}
