//! Sliding Window Store - bounded per-sensor reading history
//!
//! Each sensor owns a fixed-capacity ring of `(timestamp, value)` points.
//! Appending to a full window drops exactly the oldest point. Windows are
//! created lazily on the first reading for an unseen sensor id and live for
//! the lifetime of the store.
//!
//! ## Concurrency
//!
//! Windows are held in a sharded [`DashMap`]: appends and snapshots lock only
//! the shard that owns the sensor id, and the map's entry API makes first-time
//! window creation race-free when two producers see a new sensor together.
//! A snapshot is taken under the shard read lock and is therefore never a
//! partially applied append.
//!
//! Timestamps are kept in arrival order; the store does not resequence.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Per-Sensor Window
// ============================================================================

/// Bounded FIFO of readings for one sensor.
#[derive(Debug, Clone)]
pub struct SensorWindow {
    points: VecDeque<(DateTime<Utc>, f64)>,
    capacity: usize,
    /// Sum of values appended since the last cycle drain
    cycle_sum: f64,
    cycle_count: usize,
}

impl SensorWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            cycle_sum: 0.0,
            cycle_count: 0,
        }
    }

    /// Append a point, evicting the oldest when full. Returns true on eviction.
    pub fn push(&mut self, timestamp: DateTime<Utc>, value: f64) -> bool {
        let evicted = if self.points.len() >= self.capacity {
            self.points.pop_front();
            true
        } else {
            false
        };
        self.points.push_back((timestamp, value));
        self.cycle_sum += value;
        self.cycle_count += 1;
        evicted
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        let (timestamps, values): (Vec<_>, Vec<_>) = self.points.iter().copied().unzip();
        WindowSnapshot { timestamps, values }
    }

    /// Average of values appended since the previous call, then reset.
    pub fn take_cycle_average(&mut self) -> Option<CycleAverage> {
        if self.cycle_count == 0 {
            return None;
        }
        let avg = CycleAverage {
            average: self.cycle_sum / self.cycle_count as f64,
            samples: self.cycle_count,
        };
        self.cycle_sum = 0.0;
        self.cycle_count = 0;
        Some(avg)
    }
}

/// Mean of the readings a sensor received during one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleAverage {
    pub average: f64,
    pub samples: usize,
}

// ============================================================================
// Snapshot
// ============================================================================

/// Point-in-time copy of a window, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowSnapshot {
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

impl WindowSnapshot {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Seconds elapsed since the oldest retained point, one per sample.
    pub fn offsets_secs(&self) -> Vec<f64> {
        let Some(&base) = self.timestamps.first() else {
            return Vec::new();
        };
        self.timestamps
            .iter()
            .map(|t| (*t - base).num_milliseconds() as f64 / 1000.0)
            .collect()
    }

    pub fn latest_value(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

// ============================================================================
// Store
// ============================================================================

/// Concurrent map of sensor id -> window.
#[derive(Debug)]
pub struct WindowStore {
    windows: DashMap<String, SensorWindow>,
    capacity: usize,
    appended: AtomicU64,
    evicted: AtomicU64,
}

impl WindowStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            windows: DashMap::new(),
            capacity: capacity.max(1),
            appended: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Append one reading; creates the window on first sight of `sensor_id`.
    pub fn append(&self, sensor_id: &str, value: f64, timestamp: DateTime<Utc>) {
        // Fast path avoids allocating the key for already-known sensors.
        let evicted = match self.windows.get_mut(sensor_id) {
            Some(mut window) => window.push(timestamp, value),
            None => self
                .windows
                .entry(sensor_id.to_string())
                .or_insert_with(|| SensorWindow::new(self.capacity))
                .push(timestamp, value),
        };

        self.appended.fetch_add(1, Ordering::Relaxed);
        if evicted {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Consistent copy of a sensor's window. Unknown sensors yield an empty snapshot.
    pub fn snapshot(&self, sensor_id: &str) -> WindowSnapshot {
        self.windows
            .get(sensor_id)
            .map(|w| w.snapshot())
            .unwrap_or_default()
    }

    pub fn take_cycle_average(&self, sensor_id: &str) -> Option<CycleAverage> {
        self.windows
            .get_mut(sensor_id)
            .and_then(|mut w| w.take_cycle_average())
    }

    /// All tracked sensor ids, sorted.
    pub fn sensor_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.windows.iter().map(|e| e.key().clone()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, sensor_id: &str) -> bool {
        self.windows.contains_key(sensor_id)
    }

    /// Number of tracked sensors.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            sensors: self.windows.len(),
            appended: self.appended.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub sensors: usize,
    pub appended: u64,
    pub evicted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn full_window_evicts_only_the_oldest() {
        let store = WindowStore::new(3);
        for i in 0..5 {
            store.append("M:s", i as f64, t(i));
        }
        let snap = store.snapshot("M:s");

        assert_eq!(snap.values, vec![2.0, 3.0, 4.0]);
        assert_eq!(snap.timestamps, vec![t(2), t(3), t(4)]);
        assert_eq!(store.stats().evicted, 2);
    }

    #[test]
    fn unknown_sensor_is_an_empty_window() {
        let store = WindowStore::new(10);
        assert!(store.snapshot("nope").is_empty());
        assert!(!store.contains("nope"));
    }

    #[test]
    fn arrival_order_is_preserved() {
        let store = WindowStore::new(10);
        store.append("M:s", 1.0, t(10));
        store.append("M:s", 2.0, t(5));
        let snap = store.snapshot("M:s");
        assert_eq!(snap.timestamps, vec![t(10), t(5)]);
    }

    #[test]
    fn offsets_are_relative_to_oldest_retained_point() {
        let store = WindowStore::new(2);
        store.append("M:s", 1.0, t(100));
        store.append("M:s", 2.0, t(160));
        store.append("M:s", 3.0, t(220));
        assert_eq!(store.snapshot("M:s").offsets_secs(), vec![0.0, 60.0]);
    }

    #[test]
    fn cycle_average_resets_after_take() {
        let store = WindowStore::new(2);
        store.append("M:s", 10.0, t(0));
        store.append("M:s", 20.0, t(1));
        store.append("M:s", 30.0, t(2));

        let avg = store.take_cycle_average("M:s").unwrap();
        assert_eq!(avg.samples, 3);
        assert!((avg.average - 20.0).abs() < 1e-9);
        assert!(store.take_cycle_average("M:s").is_none());
        // Window contents are untouched by the drain
        assert_eq!(store.snapshot("M:s").len(), 2);
    }

    #[test]
    fn concurrent_first_appends_create_one_window() {
        let store = Arc::new(WindowStore::new(1_000));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.append("M:new", f64::from(worker * 100 + i), t(i64::from(i)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot("M:new").len(), 800);
        assert_eq!(store.stats().appended, 800);
    }
}
