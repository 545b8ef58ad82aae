//! Machine Aggregator
//!
//! Machine membership comes from the sensor id: everything before the first
//! `:` names the machine (`"GTM2:BearingTemp"` belongs to `GTM2`). Grouping
//! compares that whole segment, so `GTM2` never picks up `GTM20:*` sensors.
//!
//! Only qualifying sensors (analysis present, confidence above LOW) feed the
//! roll-up. Count thresholds use integer division of the qualifying count,
//! so three sensors need two degrading votes before the machine degrades.

use statrs::statistics::Statistics;

use crate::config::{defaults::MACHINE_DELIMITER, AggregationConfig};
use crate::types::{Confidence, MachineDirection, MachineTrend, TrendAnalysis};

/// Machine name of a sensor id, or `None` for sensors without a delimiter.
pub fn machine_name(sensor_id: &str) -> Option<&str> {
    sensor_id
        .split_once(MACHINE_DELIMITER)
        .map(|(machine, _)| machine)
}

/// Whether `sensor_id` belongs to `machine` (exact first-segment match).
pub fn belongs_to(sensor_id: &str, machine: &str) -> bool {
    machine_name(sensor_id) == Some(machine)
}

pub fn is_qualifying(analysis: &TrendAnalysis) -> bool {
    analysis.confidence != Confidence::Low
}

/// Roll up one machine's sensor analyses.
///
/// Returns `None` when no analysis qualifies.
pub fn aggregate_machine<'a, I>(
    machine: &str,
    analyses: I,
    cfg: &AggregationConfig,
) -> Option<MachineTrend>
where
    I: IntoIterator<Item = &'a TrendAnalysis>,
{
    let qualifying: Vec<&TrendAnalysis> = analyses.into_iter().filter(|a| is_qualifying(a)).collect();
    if qualifying.is_empty() {
        return None;
    }
    let count = qualifying.len();

    let health_score = qualifying.iter().map(|a| a.health_score).mean();

    let degrading = qualifying
        .iter()
        .filter(|a| a.health_score < cfg.degrading_below)
        .count();
    let improving = qualifying
        .iter()
        .filter(|a| a.health_score > cfg.improving_above)
        .count();
    let direction = if degrading > count / 3 {
        MachineDirection::Degrading
    } else if improving > count / 3 {
        MachineDirection::Improving
    } else {
        MachineDirection::Stable
    };

    let sensors_at_risk = qualifying
        .iter()
        .filter(|a| matches!(a.time_to_warning, Some(t) if t > 0 && t < cfg.at_risk_horizon_secs))
        .count();

    let estimated_fail_time = qualifying
        .iter()
        .filter_map(|a| a.time_to_critical)
        .filter(|&t| t > 0)
        .min();

    let high = qualifying
        .iter()
        .filter(|a| a.confidence == Confidence::High)
        .count();
    let confidence = if high > count / 2 {
        Confidence::High
    } else if high > count / 4 {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    Some(MachineTrend {
        machine: machine.to_string(),
        direction,
        health_score,
        sensors_at_risk,
        estimated_fail_time,
        confidence,
        qualifying_sensors: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrendDirection;

    fn analysis(id: &str, health: f64, confidence: Confidence) -> TrendAnalysis {
        TrendAnalysis {
            sensor_id: id.to_string(),
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.9,
            direction: TrendDirection::Stable,
            confidence,
            forecast_short: 0.0,
            forecast_long: 0.0,
            position_pct: 50.0,
            health_score: health,
            time_to_warning: None,
            time_to_critical: None,
            latest_value: 0.0,
            sample_count: 10,
        }
    }

    #[test]
    fn machine_name_splits_on_first_delimiter() {
        assert_eq!(machine_name("GTM2:Bearing:Temp"), Some("GTM2"));
        assert_eq!(machine_name(":orphan"), Some(""));
        assert_eq!(machine_name("NoDelimiter"), None);
    }

    #[test]
    fn membership_is_exact_segment_not_prefix() {
        assert!(belongs_to("GTM2:Temp", "GTM2"));
        assert!(!belongs_to("GTM20:Temp", "GTM2"));
        assert!(!belongs_to("GTM2", "GTM2"));
    }

    #[test]
    fn one_degrading_of_three_is_not_enough() {
        let cfg = AggregationConfig::default();
        let analyses = [
            analysis("M:a", 50.0, Confidence::High),
            analysis("M:b", 90.0, Confidence::High),
            analysis("M:c", 95.0, Confidence::High),
        ];
        let trend = aggregate_machine("M", &analyses, &cfg).unwrap();

        assert_eq!(trend.direction, MachineDirection::Improving);
        assert!((trend.health_score - 235.0 / 3.0).abs() < 1e-9);
        assert_eq!(trend.qualifying_sensors, 3);
        assert_eq!(trend.confidence, Confidence::High);
    }

    #[test]
    fn degrading_is_checked_before_improving() {
        let cfg = AggregationConfig::default();
        let analyses = [
            analysis("M:a", 10.0, Confidence::High),
            analysis("M:b", 20.0, Confidence::High),
            analysis("M:c", 95.0, Confidence::High),
            analysis("M:d", 99.0, Confidence::High),
        ];
        let trend = aggregate_machine("M", &analyses, &cfg).unwrap();
        assert_eq!(trend.direction, MachineDirection::Degrading);
    }

    #[test]
    fn neutral_sensors_make_a_stable_machine() {
        let cfg = AggregationConfig::default();
        let analyses = [
            analysis("M:a", 70.0, Confidence::Medium),
            analysis("M:b", 75.0, Confidence::Medium),
        ];
        let trend = aggregate_machine("M", &analyses, &cfg).unwrap();
        assert_eq!(trend.direction, MachineDirection::Stable);
        assert_eq!(trend.confidence, Confidence::Low);
    }

    #[test]
    fn low_confidence_sensors_do_not_qualify() {
        let cfg = AggregationConfig::default();
        let analyses = [
            analysis("M:a", 10.0, Confidence::Low),
            analysis("M:b", 20.0, Confidence::Low),
        ];
        assert!(aggregate_machine("M", &analyses, &cfg).is_none());
        assert!(aggregate_machine("M", std::iter::empty(), &cfg).is_none());

        let mixed = [
            analysis("M:a", 10.0, Confidence::Low),
            analysis("M:b", 90.0, Confidence::Medium),
        ];
        let trend = aggregate_machine("M", &mixed, &cfg).unwrap();
        assert_eq!(trend.qualifying_sensors, 1);
        assert!((trend.health_score - 90.0).abs() < 1e-9);
    }

    #[test]
    fn at_risk_and_fail_time_use_positive_estimates_only() {
        let cfg = AggregationConfig::default();
        let mut a = analysis("M:a", 70.0, Confidence::High);
        a.time_to_warning = Some(599);
        a.time_to_critical = Some(1_200);
        let mut b = analysis("M:b", 70.0, Confidence::High);
        b.time_to_warning = Some(600);
        b.time_to_critical = Some(0);
        let mut c = analysis("M:c", 70.0, Confidence::Medium);
        c.time_to_warning = Some(0);
        c.time_to_critical = Some(900);

        let trend = aggregate_machine("M", &[a, b, c], &cfg).unwrap();
        assert_eq!(trend.sensors_at_risk, 1);
        assert_eq!(trend.estimated_fail_time, Some(900));
    }

    #[test]
    fn no_time_to_critical_means_no_fail_time() {
        let cfg = AggregationConfig::default();
        let trend = aggregate_machine("M", &[analysis("M:a", 90.0, Confidence::High)], &cfg).unwrap();
        assert_eq!(trend.estimated_fail_time, None);
        assert_eq!(trend.sensors_at_risk, 0);
    }

    #[test]
    fn confidence_uses_half_and_quarter_of_qualifying_count() {
        let cfg = AggregationConfig::default();
        // 2 HIGH of 5: 2 > 5/2 (=2) false, 2 > 5/4 (=1) true
        let analyses: Vec<_> = (0..5)
            .map(|i| {
                let conf = if i < 2 { Confidence::High } else { Confidence::Medium };
                analysis(&format!("M:{i}"), 70.0, conf)
            })
            .collect();
        let trend = aggregate_machine("M", &analyses, &cfg).unwrap();
        assert_eq!(trend.confidence, Confidence::Medium);
    }
}
