//! Range status classification
//!
//! Complements the trend view with a "where is it right now" view: each
//! sensor's average over the last cycle is placed within its operational
//! range, and machines are labelled from the mix of their sensors' labels.

use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::types::{
    MachineHealthStatus, MachineStatus, OperationalLimit, RangeStatus, RangeSummary,
    SensorRangeStatus,
};
use crate::window::CycleAverage;

use super::machine::machine_name;

/// Machine bucket used for sensors without a delimiter.
pub const UNKNOWN_MACHINE: &str = "UNKNOWN";

pub fn classify_sensor(
    sensor_id: &str,
    cycle: CycleAverage,
    limit: &OperationalLimit,
    cfg: &AnalysisConfig,
) -> SensorRangeStatus {
    let avg = cycle.average;
    let position_pct = (limit.span() > 0.0).then(|| limit.position_pct(avg));
    let pct = position_pct.unwrap_or(50.0);

    let status = if avg > limit.high {
        RangeStatus::AboveRange
    } else if avg < limit.low {
        RangeStatus::BelowRange
    } else if avg == 0.0 {
        RangeStatus::Offline
    } else if pct < cfg.warning_band_low_pct {
        RangeStatus::PossiblyOffline
    } else if pct > cfg.warning_band_high_pct {
        RangeStatus::Warning
    } else {
        RangeStatus::Good
    };

    SensorRangeStatus {
        sensor_id: sensor_id.to_string(),
        average: avg,
        low: limit.low,
        high: limit.high,
        position_pct,
        status,
        samples: cycle.samples,
    }
}

#[derive(Default)]
struct MachineTally {
    counts: RangeSummary,
    in_range: usize,
    pct_sum: f64,
}

/// Group sensor statuses by machine and label each machine.
pub fn summarize_machines(statuses: &[SensorRangeStatus]) -> Vec<MachineStatus> {
    let mut tallies: BTreeMap<&str, MachineTally> = BTreeMap::new();

    for s in statuses {
        let machine = machine_name(&s.sensor_id).unwrap_or(UNKNOWN_MACHINE);
        let tally = tallies.entry(machine).or_default();
        tally.counts.record(s.status);

        if !s.status.is_fault() {
            tally.in_range += 1;
            let pct = s.position_pct.unwrap_or(50.0);
            if (0.0..=100.0).contains(&pct) {
                tally.pct_sum += pct;
            }
        }
    }

    tallies
        .into_iter()
        .map(|(machine, t)| {
            let c = t.counts;
            let total = c.total();
            let average_pct = if t.in_range > 0 {
                t.pct_sum / t.in_range as f64
            } else {
                0.0
            };
            let offline_ratio = c.offline as f64 / total as f64;

            let status = if t.in_range < total {
                MachineHealthStatus::Critical
            } else if offline_ratio > 0.5 {
                MachineHealthStatus::Offline
            } else if c.warning > c.good {
                MachineHealthStatus::Warning
            } else if c.good > 0 {
                MachineHealthStatus::Good
            } else {
                MachineHealthStatus::Uncertain
            };

            MachineStatus {
                machine: machine.to_string(),
                status,
                total_sensors: total,
                good: c.good,
                warning: c.warning,
                offline: c.offline,
                above: c.above,
                below: c.below,
                average_pct,
            }
        })
        .collect()
}

/// Fleet-wide tallies.
pub fn summarize(statuses: &[SensorRangeStatus]) -> RangeSummary {
    statuses.iter().fold(RangeSummary::default(), |mut acc, s| {
        acc.record(s.status);
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(avg: f64, low: f64, high: f64) -> RangeStatus {
        classify_sensor(
            "M:s",
            CycleAverage { average: avg, samples: 1 },
            &OperationalLimit::new(low, high),
            &AnalysisConfig::default(),
        )
        .status
    }

    fn status(id: &str, status: RangeStatus, pct: f64) -> SensorRangeStatus {
        SensorRangeStatus {
            sensor_id: id.to_string(),
            average: 1.0,
            low: 0.0,
            high: 100.0,
            position_pct: Some(pct),
            status,
            samples: 1,
        }
    }

    #[test]
    fn sensor_labels_follow_range_position() {
        assert_eq!(classify(50.0, 0.0, 100.0), RangeStatus::Good);
        assert_eq!(classify(85.0, 0.0, 100.0), RangeStatus::Warning);
        assert_eq!(classify(10.0, 0.0, 100.0), RangeStatus::PossiblyOffline);
        assert_eq!(classify(0.0, 0.0, 100.0), RangeStatus::Offline);
        assert_eq!(classify(101.0, 0.0, 100.0), RangeStatus::AboveRange);
        assert_eq!(classify(-1.0, 0.0, 100.0), RangeStatus::BelowRange);
    }

    #[test]
    fn zero_width_range_reports_no_percentage() {
        let s = classify_sensor(
            "M:flag",
            CycleAverage { average: 1.0, samples: 4 },
            &OperationalLimit::new(1.0, 1.0),
            &AnalysisConfig::default(),
        );
        assert_eq!(s.position_pct, None);
        assert_eq!(s.status, RangeStatus::Good);
    }

    #[test]
    fn any_fault_makes_machine_critical() {
        let statuses = [
            status("A:x", RangeStatus::Good, 50.0),
            status("A:y", RangeStatus::AboveRange, 120.0),
        ];
        let machines = summarize_machines(&statuses);
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].status, MachineHealthStatus::Critical);
        // Only the in-range sensor contributes to the average
        assert!((machines[0].average_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn faulted_flat_range_sensor_is_left_out_of_average() {
        let mut flag = status("A:flag", RangeStatus::AboveRange, 0.0);
        flag.position_pct = None;
        let statuses = [status("A:x", RangeStatus::Warning, 90.0), flag];

        let machines = summarize_machines(&statuses);
        assert_eq!(machines[0].status, MachineHealthStatus::Critical);
        assert_eq!(machines[0].above, 1);
        assert!((machines[0].average_pct - 90.0).abs() < 1e-9);
    }

    #[test]
    fn machine_labels_by_majority() {
        let statuses = [
            status("OFF:a", RangeStatus::Offline, 0.0),
            status("OFF:b", RangeStatus::PossiblyOffline, 5.0),
            status("OFF:c", RangeStatus::Good, 50.0),
            status("WARN:a", RangeStatus::Warning, 90.0),
            status("WARN:b", RangeStatus::Warning, 85.0),
            status("WARN:c", RangeStatus::Good, 50.0),
            status("OK:a", RangeStatus::Good, 40.0),
            status("MIX:a", RangeStatus::Offline, 0.0),
            status("MIX:b", RangeStatus::Warning, 90.0),
        ];
        let machines = summarize_machines(&statuses);
        let by_name = |n: &str| machines.iter().find(|m| m.machine == n).unwrap().status;

        assert_eq!(by_name("OFF"), MachineHealthStatus::Offline);
        assert_eq!(by_name("WARN"), MachineHealthStatus::Warning);
        assert_eq!(by_name("OK"), MachineHealthStatus::Good);
        assert_eq!(by_name("MIX"), MachineHealthStatus::Warning);
    }

    #[test]
    fn sensors_without_delimiter_group_as_unknown() {
        let machines = summarize_machines(&[status("loose", RangeStatus::Good, 50.0)]);
        assert_eq!(machines[0].machine, UNKNOWN_MACHINE);
    }

    #[test]
    fn fleet_summary_counts_each_status() {
        let summary = summarize(&[
            status("A:x", RangeStatus::Good, 50.0),
            status("A:y", RangeStatus::Offline, 0.0),
            status("B:x", RangeStatus::BelowRange, -5.0),
        ]);
        assert_eq!(
            summary,
            RangeSummary { good: 1, warning: 0, offline: 1, above: 0, below: 1 }
        );
    }
}
