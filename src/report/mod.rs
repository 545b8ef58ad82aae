//! Report publication
//!
//! Every completed cycle passes through [`ReportPublisher::publish`], which
//! keeps it as the latest report for readers (HTTP API), prints it in the
//! configured format, and optionally mirrors it into a status file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::CycleReport;

const RULE_WIDTH: usize = 110;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write status file ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary through the log
    #[default]
    Text,
    /// One JSON document per cycle on stdout
    Json,
}

pub struct ReportPublisher {
    latest: ArcSwapOption<CycleReport>,
    format: OutputFormat,
    status_file: Option<PathBuf>,
    published: AtomicU64,
}

impl ReportPublisher {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            latest: ArcSwapOption::empty(),
            format,
            status_file: None,
            published: AtomicU64::new(0),
        }
    }

    pub fn with_status_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.status_file = Some(path.into());
        self
    }

    /// Latest published report, if any cycle has completed.
    pub fn latest(&self) -> Option<Arc<CycleReport>> {
        self.latest.load_full()
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Store, print and persist one report.
    ///
    /// Output failures are logged; the report still becomes the latest.
    pub fn publish(&self, report: CycleReport) -> Arc<CycleReport> {
        let report = Arc::new(report);
        self.latest.store(Some(Arc::clone(&report)));
        self.published.fetch_add(1, Ordering::Relaxed);

        match self.format {
            OutputFormat::Text => {
                for line in render_lines(&report) {
                    info!("{}", line);
                }
            }
            OutputFormat::Json => match serde_json::to_string(report.as_ref()) {
                Ok(json) => println!("{}", json),
                Err(e) => warn!("[Report] JSON encoding failed: {}", e),
            },
        }

        if let Some(path) = &self.status_file {
            if let Err(e) = write_status_file(path, &report) {
                warn!("[Report] {}", e);
            }
        }

        report
    }
}

/// Write `report` as JSON to `path` via a sibling temp file and rename.
pub fn write_status_file(path: &Path, report: &CycleReport) -> Result<(), ReportError> {
    let json = serde_json::to_vec_pretty(report)?;
    let tmp = path.with_extension("tmp");
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp, json).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

fn fmt_secs(secs: Option<u64>) -> String {
    match secs {
        Some(s) => format!("{}s", s),
        None => "-".to_string(),
    }
}

/// Console summary of one cycle, one entry per log line.
pub fn render_lines(report: &CycleReport) -> Vec<String> {
    let rule = "━".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        format!(
            "📊 CYCLE #{} @ {} | {} sensors tracked | {} analysed",
            report.cycle,
            report.generated_at.format("%Y-%m-%d %H:%M:%S"),
            report.sensors_tracked,
            report.sensor_trends.len()
        ),
        rule.clone(),
    ];

    if !report.machine_trends.is_empty() {
        lines.push("MACHINE TRENDS".to_string());
        lines.extend(report.machine_trends.iter().map(|m| {
            format!(
                "  {:<20} {:<10} health {:>6.2} | at risk {} | fail in {} | {} confidence ({} sensors)",
                m.machine,
                m.direction,
                m.health_score,
                m.sensors_at_risk,
                fmt_secs(m.estimated_fail_time),
                m.confidence,
                m.qualifying_sensors
            )
        }));
    }

    let at_risk: Vec<String> = report
        .sensor_trends
        .iter()
        .filter(|t| t.time_to_warning.is_some() || t.time_to_critical.is_some())
        .map(|t| {
            format!(
                "  {:<40} {:<10} {:>6.2}% | slope {:+.4}/s | warn in {} | critical in {}",
                t.sensor_id,
                t.direction,
                t.position_pct,
                t.slope,
                fmt_secs(t.time_to_warning),
                fmt_secs(t.time_to_critical)
            )
        })
        .collect();
    if !at_risk.is_empty() {
        lines.push("SENSORS APPROACHING LIMITS".to_string());
        lines.extend(at_risk);
    }

    if !report.machine_status.is_empty() {
        lines.push("MACHINE STATUS".to_string());
        lines.extend(report.machine_status.iter().map(|m| {
            format!(
                "  {:<20} {:<10} | {:<15} | avg {:>6.2}% | {} good, {} warn, {} offline, {} fault",
                m.machine,
                m.status,
                m.status.running_label(),
                m.average_pct,
                m.good,
                m.warning,
                m.offline,
                m.above + m.below
            )
        }));
    }

    let s = &report.range_summary;
    lines.push(format!(
        "Sensor summary: {} good | {} warning | {} offline | {} above range | {} below range",
        s.good, s.warning, s.offline, s.above, s.below
    ));
    if !report.unassigned_sensors.is_empty() {
        lines.push(format!(
            "Unassigned sensors: {}",
            report.unassigned_sensors.join(", ")
        ));
    }
    lines.push(rule);
    lines
}

/// [`render_lines`] joined into one block.
pub fn render_text(report: &CycleReport) -> String {
    render_lines(report).join("\n")
}
