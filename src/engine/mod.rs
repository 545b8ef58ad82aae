//! Trend Engine - one explicit instance owning all analysis state
//!
//! ```text
//! producers ──record()/ingest()──► WindowStore (per-sensor windows)
//!                                       │
//! scheduler ──run_cycle()─────► snapshot ─► analyze_window ─► aggregate_machine
//!                                       │
//!                                       └─► cycle averages ─► range status
//! ```
//!
//! The engine is `Send + Sync` and shared behind an `Arc`. Producers and the
//! analysis pass never contend on a global lock: window access is sharded by
//! sensor id, and the limits registry is read-only after construction.
//! A sensor whose window is sparse or whose limit is missing simply drops
//! out of the cycle; it cannot affect any other sensor or machine.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::analysis::range_status::{classify_sensor, summarize, summarize_machines};
use crate::analysis::{aggregate_machine, analyze_window, belongs_to, machine_name};
use crate::config::TrendConfig;
use crate::types::{
    CycleReport, LimitsRegistry, MachineTrend, ReadingMessage, SensorReading, TrendAnalysis,
};
use crate::window::{StoreStats, WindowSnapshot, WindowStore};

/// Result of ingesting one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestCounts {
    pub accepted: usize,
    pub skipped: usize,
}

pub struct TrendEngine {
    store: WindowStore,
    limits: Arc<LimitsRegistry>,
    config: TrendConfig,
    cycles: AtomicU64,
}

impl TrendEngine {
    pub fn new(limits: LimitsRegistry, config: TrendConfig) -> Self {
        Self::with_shared_limits(Arc::new(limits), config)
    }

    /// Build an engine over a registry shared with other engine instances.
    pub fn with_shared_limits(limits: Arc<LimitsRegistry>, config: TrendConfig) -> Self {
        Self {
            store: WindowStore::new(config.window.capacity),
            limits,
            config,
            cycles: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    pub fn limits(&self) -> &LimitsRegistry {
        &self.limits
    }

    pub fn store_stats(&self) -> StoreStats {
        self.store.stats()
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Ingestion
    // ========================================================================

    pub fn append(&self, sensor_id: &str, value: f64, timestamp: DateTime<Utc>) {
        self.store.append(sensor_id, value, timestamp);
    }

    pub fn record(&self, reading: &SensorReading) {
        self.store
            .append(&reading.sensor_id, reading.value, reading.timestamp);
    }

    /// Append every numeric reading in `message`.
    ///
    /// Repeated delivery of the same message is appended again; the engine
    /// does not deduplicate.
    pub fn ingest(&self, message: &ReadingMessage, received_at: DateTime<Utc>) -> IngestCounts {
        let decoded = message.decode(received_at);
        for reading in &decoded.readings {
            self.record(reading);
        }
        IngestCounts {
            accepted: decoded.readings.len(),
            skipped: decoded.skipped,
        }
    }

    pub fn snapshot(&self, sensor_id: &str) -> WindowSnapshot {
        self.store.snapshot(sensor_id)
    }

    pub fn sensor_ids(&self) -> Vec<String> {
        self.store.sensor_ids()
    }

    // ========================================================================
    // Analysis
    // ========================================================================

    /// Current trend for one sensor; `None` if data is insufficient or no limit exists.
    pub fn analyze_sensor(&self, sensor_id: &str) -> Option<TrendAnalysis> {
        let limit = self.limits.get(sensor_id)?;
        let window = self.store.snapshot(sensor_id);
        analyze_window(sensor_id, &window, Some(limit), &self.config)
    }

    /// Current roll-up for one machine; `None` if no sensor qualifies.
    pub fn analyze_machine(&self, machine: &str) -> Option<MachineTrend> {
        let analyses: Vec<TrendAnalysis> = self
            .store
            .sensor_ids()
            .into_iter()
            .filter(|id| belongs_to(id, machine))
            .filter_map(|id| self.analyze_sensor(&id))
            .collect();
        aggregate_machine(machine, &analyses, &self.config.aggregation)
    }

    /// Full analyze-and-aggregate pass over every tracked sensor.
    ///
    /// Also drains the per-cycle reading averages used for range status.
    pub fn run_cycle(&self) -> CycleReport {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let sensor_ids = self.store.sensor_ids();

        let sensor_trends: Vec<TrendAnalysis> = sensor_ids
            .par_iter()
            .filter_map(|id| self.analyze_sensor(id))
            .collect();

        let mut by_machine: BTreeMap<&str, Vec<&TrendAnalysis>> = BTreeMap::new();
        for analysis in &sensor_trends {
            if let Some(machine) = machine_name(&analysis.sensor_id) {
                by_machine.entry(machine).or_default().push(analysis);
            }
        }
        let machine_trends: Vec<MachineTrend> = by_machine
            .iter()
            .filter_map(|(machine, analyses)| {
                aggregate_machine(machine, analyses.iter().copied(), &self.config.aggregation)
            })
            .collect();

        let sensor_status: Vec<_> = sensor_ids
            .iter()
            .filter_map(|id| {
                let average = self.store.take_cycle_average(id)?;
                let limit = self.limits.get(id)?;
                Some(classify_sensor(id, average, limit, &self.config.analysis))
            })
            .collect();

        let unassigned_sensors: Vec<String> = sensor_ids
            .iter()
            .filter(|id| machine_name(id).is_none())
            .cloned()
            .collect();

        debug!(
            cycle,
            sensors = sensor_ids.len(),
            analysed = sensor_trends.len(),
            machines = machine_trends.len(),
            "Analysis cycle complete"
        );

        CycleReport {
            cycle,
            generated_at: Utc::now(),
            sensors_tracked: sensor_ids.len(),
            machine_status: summarize_machines(&sensor_status),
            range_summary: summarize(&sensor_status),
            sensor_trends,
            machine_trends,
            sensor_status,
            unassigned_sensors,
        }
    }
}
