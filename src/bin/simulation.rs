//! Sensor Fleet Simulation
//!
//! Generates synthetic reading messages for every sensor in a limits CSV,
//! one JSON message per line on stdout. Sensors random-walk around
//! mid-range; now and then a whole machine enters a fault and its sensors
//! are driven past their operational limits.
//!
//! # Usage
//! ```bash
//! ./simulation --limits files/sensor_operational_range.csv --speed 10 \
//!     | ./pdm-trends --stdin --limits files/sensor_operational_range.csv
//! ```

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};

use pdm_trends::config::limits::load_limits;
use pdm_trends::types::{LimitsRegistry, ReadingMessage};

// ============================================================================
// Simulation Constants
// ============================================================================

/// Pull toward 50% per tick, as a fraction of the distance
const CENTER_PULL: f64 = 0.05;
/// Maximum random-walk step (percentage points)
const DRIFT_STEP_PCT: f64 = 2.0;
/// Normal operation is kept within this band (percent of range)
const NORMAL_BAND_PCT: (f64, f64) = (15.0, 85.0);
/// Noise standard deviation as a fraction of range
const NOISE_FRACTION: f64 = 0.01;
/// Values never leave range by more than this fraction of span
const OVERSHOOT_FRACTION: f64 = 0.1;
/// Fault duration bounds (seconds)
const FAULT_DURATION_SECS: (f64, f64) = (30.0, 120.0);

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pdm-simulation")]
#[command(about = "Synthetic sensor readings with fault injection for pdm-trends testing")]
#[command(version)]
struct Args {
    /// Operational limits CSV defining the simulated sensors
    #[arg(long)]
    limits: PathBuf,

    /// Simulated seconds between messages
    #[arg(long, default_value = "1")]
    interval_secs: u64,

    /// Time compression factor (1 = real-time, 0 = no delay)
    #[arg(short, long, default_value = "1")]
    speed: u32,

    /// Stop after this many simulated seconds (runs forever when omitted)
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Chance per tick that an idle fleet enters a fault
    #[arg(long, default_value = "0.05")]
    fault_probability: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Suppress the event log on stderr
    #[arg(short, long)]
    quiet: bool,
}

// ============================================================================
// Simulation State
// ============================================================================

struct SimSensor {
    id: String,
    machine: String,
    low: f64,
    high: f64,
    target_pct: f64,
    /// Direction chosen for the current fault; `true` drives high
    fault_high: Option<bool>,
}

impl SimSensor {
    fn span(&self) -> f64 {
        self.high - self.low
    }

    fn is_binary(&self) -> bool {
        self.low == 0.0 && self.high == 1.0
    }
}

struct Fault {
    machine: String,
    started_at: f64,
    duration: f64,
}

struct Simulation {
    sensors: Vec<SimSensor>,
    machines: Vec<String>,
    fault: Option<Fault>,
    fault_probability: f64,
    rng: StdRng,
    sim_time_seconds: f64,
    faults_triggered: u64,
}

impl Simulation {
    fn new(limits: &LimitsRegistry, fault_probability: f64, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let mut entries: Vec<_> = limits.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let sensors: Vec<SimSensor> = entries
            .into_iter()
            .map(|(id, limit)| SimSensor {
                id: id.to_string(),
                machine: id.split_once(':').map_or("UNKNOWN", |(m, _)| m).to_string(),
                low: limit.low,
                high: limit.high,
                target_pct: rng.gen_range(40.0..60.0),
                fault_high: None,
            })
            .collect();

        let mut machines: Vec<String> = sensors.iter().map(|s| s.machine.clone()).collect();
        machines.sort();
        machines.dedup();

        Self {
            sensors,
            machines,
            fault: None,
            fault_probability,
            rng,
            sim_time_seconds: 0.0,
            faults_triggered: 0,
        }
    }

    /// Advance one tick. Returns log lines for fault transitions.
    fn step(&mut self, dt: f64) -> Vec<String> {
        let mut events = Vec::new();
        self.sim_time_seconds += dt;
        let now = self.sim_time_seconds;

        if let Some(fault) = &self.fault {
            if now - fault.started_at > fault.duration {
                events.push(format!("FAULT CLEARED: {}", fault.machine));
                self.fault = None;
            }
        }

        for sensor in &mut self.sensors {
            match &self.fault {
                Some(fault) if fault.machine == sensor.machine => {
                    let progress = ((now - fault.started_at) / fault.duration).clamp(0.0, 1.0);
                    let high = *sensor.fault_high.get_or_insert_with(|| self.rng.gen_bool(0.5));
                    sensor.target_pct = if high {
                        80.0 + progress * 40.0
                    } else {
                        20.0 - progress * 30.0
                    };
                }
                _ => {
                    let drift = self.rng.gen_range(-DRIFT_STEP_PCT..DRIFT_STEP_PCT);
                    let pull = (50.0 - sensor.target_pct) * CENTER_PULL;
                    sensor.target_pct = (sensor.target_pct + drift + pull)
                        .clamp(NORMAL_BAND_PCT.0, NORMAL_BAND_PCT.1);
                    sensor.fault_high = None;
                }
            }
        }

        if self.fault.is_none()
            && !self.machines.is_empty()
            && self.rng.gen::<f64>() < self.fault_probability
        {
            let idx = self.rng.gen_range(0..self.machines.len());
            let duration = self
                .rng
                .gen_range(FAULT_DURATION_SECS.0..FAULT_DURATION_SECS.1);
            let machine = self.machines[idx].clone();
            events.push(format!("FAULT TRIGGERED: {} for {:.0}s", machine, duration));
            self.fault = Some(Fault {
                machine,
                started_at: now,
                duration,
            });
            self.faults_triggered += 1;
        }

        events
    }

    fn value_of(&mut self, idx: usize) -> f64 {
        let sensor = &self.sensors[idx];
        let span = sensor.span();
        if span <= 0.0 {
            return sensor.low;
        }
        let base = sensor.low + span * sensor.target_pct / 100.0;
        let noise = Normal::new(0.0, span * NOISE_FRACTION)
            .map(|n| n.sample(&mut self.rng))
            .unwrap_or(0.0);
        (base + noise).clamp(
            sensor.low - span * OVERSHOOT_FRACTION,
            sensor.high + span * OVERSHOOT_FRACTION,
        )
    }

    fn message(&mut self, timestamp: DateTime<Utc>) -> ReadingMessage {
        let mut readings = BTreeMap::new();
        for idx in 0..self.sensors.len() {
            let value = self.value_of(idx);
            let sensor = &self.sensors[idx];
            let rendered = if sensor.is_binary() {
                format!("{}", value.round().clamp(0.0, 1.0) as u8)
            } else {
                format!("{:.2}", value)
            };
            readings.insert(sensor.id.clone(), serde_json::Value::String(rendered));
        }
        ReadingMessage {
            timestamp: Some(timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
            source: Some("simulation".to_string()),
            readings,
        }
    }
}

// ============================================================================
// Logging Utilities
// ============================================================================

fn format_time(seconds: f64) -> String {
    let hours = (seconds / 3600.0) as u32;
    let minutes = ((seconds % 3600.0) / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

fn log_event(time: f64, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[{}] {}", format_time(time), message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let limits = load_limits(&args.limits)?;
    let mut sim = Simulation::new(&limits, args.fault_probability, args.seed);

    log_event(0.0, &"=".repeat(70), args.quiet);
    log_event(0.0, "SENSOR FLEET SIMULATION", args.quiet);
    log_event(
        0.0,
        &format!(
            "  {} sensors across {} machines",
            sim.sensors.len(),
            sim.machines.len()
        ),
        args.quiet,
    );
    log_event(0.0, &format!("  Interval: {}s | Speed: {}x", args.interval_secs, args.speed), args.quiet);
    if let Some(seed) = args.seed {
        log_event(0.0, &format!("  Random seed: {}", seed), args.quiet);
    }
    log_event(0.0, &"=".repeat(70), args.quiet);

    let interval = args.interval_secs.max(1);
    let tick_real = if args.speed == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs(interval) / args.speed
    };
    let start_wall = Utc::now();
    let start_time = Instant::now();

    let stdout = io::stdout();
    let mut stdout_lock = stdout.lock();
    let mut messages = 0u64;

    loop {
        let loop_start = Instant::now();

        for event in sim.step(interval as f64) {
            log_event(sim.sim_time_seconds, &event, args.quiet);
        }

        let timestamp =
            start_wall + chrono::Duration::milliseconds((sim.sim_time_seconds * 1000.0) as i64);
        let message = sim.message(timestamp);
        // Broken pipe ends the run
        if writeln!(stdout_lock, "{}", serde_json::to_string(&message)?).is_err() {
            break;
        }
        stdout_lock.flush()?;
        messages += 1;

        if let Some(limit) = args.duration_secs {
            if sim.sim_time_seconds >= limit as f64 {
                break;
            }
        }

        let elapsed = loop_start.elapsed();
        if elapsed < tick_real {
            std::thread::sleep(tick_real - elapsed);
        }
    }

    log_event(sim.sim_time_seconds, &"=".repeat(70), args.quiet);
    log_event(sim.sim_time_seconds, &format!("Messages: {}", messages), args.quiet);
    log_event(sim.sim_time_seconds, &format!("Faults triggered: {}", sim.faults_triggered), args.quiet);
    log_event(
        sim.sim_time_seconds,
        &format!("Real time: {:.1}s", start_time.elapsed().as_secs_f64()),
        args.quiet,
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdm_trends::types::OperationalLimit;

    fn limits() -> LimitsRegistry {
        [
            ("A:temp".to_string(), OperationalLimit::new(0.0, 100.0)),
            ("A:run".to_string(), OperationalLimit::new(0.0, 1.0)),
            ("B:pressure".to_string(), OperationalLimit::new(10.0, 20.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn same_seed_same_stream() {
        let ts = Utc::now();
        let mut a = Simulation::new(&limits(), 0.05, Some(7));
        let mut b = Simulation::new(&limits(), 0.05, Some(7));
        for _ in 0..50 {
            a.step(1.0);
            b.step(1.0);
            assert_eq!(a.message(ts).readings, b.message(ts).readings);
        }
    }

    #[test]
    fn normal_operation_stays_inside_limits() {
        let mut sim = Simulation::new(&limits(), 0.0, Some(1));
        for _ in 0..500 {
            sim.step(1.0);
            for idx in 0..sim.sensors.len() {
                let v = sim.value_of(idx);
                let s = &sim.sensors[idx];
                // 15-85% band plus a few sigma of noise never reaches the limits
                assert!(v > s.low && v < s.high, "{} = {}", s.id, v);
            }
        }
    }

    #[test]
    fn fault_drives_machine_out_of_range_then_clears() {
        let mut sim = Simulation::new(&limits(), 1.0, Some(3));
        sim.step(1.0);
        let (machine, started) = sim
            .fault
            .as_ref()
            .map(|f| (f.machine.clone(), f.started_at))
            .unwrap();

        let mut cleared = false;
        for _ in 0..125 {
            sim.step(1.0);
            match &sim.fault {
                Some(f) if f.machine == machine && f.started_at == started => {}
                _ => {
                    cleared = true;
                    break;
                }
            }
            for s in sim.sensors.iter().filter(|s| s.machine == machine) {
                assert!(s.target_pct >= 80.0 || s.target_pct <= 20.0);
            }
        }
        assert!(cleared);
    }

    #[test]
    fn binary_sensors_emit_zero_or_one() {
        let mut sim = Simulation::new(&limits(), 0.0, Some(9));
        sim.step(1.0);
        let msg = sim.message(Utc::now());
        let run = msg.readings["A:run"].as_str().unwrap();
        assert!(run == "0" || run == "1");
    }
}
