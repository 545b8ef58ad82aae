//! Sensor Trend Analyzer
//!
//! Turns one sensor's window plus its operational range into a
//! [`TrendAnalysis`]: direction, confidence, forecasts, health score and
//! time-to-threshold estimates. Every estimate is a fresh linear
//! extrapolation; nothing carries over between cycles.

use crate::analysis::regression::linear_regression;
use crate::config::{AnalysisConfig, HealthConfig, TrendConfig};
use crate::types::{Confidence, OperationalLimit, TrendAnalysis, TrendDirection};
use crate::window::WindowSnapshot;

/// Analyze one sensor window.
///
/// Returns `None` when the window holds fewer than `min_points` samples or
/// when no operational limit is registered; both are normal outcomes, not
/// errors.
pub fn analyze_window(
    sensor_id: &str,
    window: &WindowSnapshot,
    limit: Option<&OperationalLimit>,
    config: &TrendConfig,
) -> Option<TrendAnalysis> {
    let limit = limit?;
    let cfg = &config.analysis;
    if window.len() < cfg.min_points.max(2) {
        return None;
    }
    let latest_value = window.latest_value()?;

    let x = window.offsets_secs();
    let fit = linear_regression(&x, &window.values);
    let current_offset = x.last().copied().unwrap_or(0.0);

    let direction = classify_direction(fit.slope, cfg.stable_slope_epsilon);
    let confidence = classify_confidence(fit.r_squared, cfg);
    let position_pct = limit.position_pct(latest_value);

    Some(TrendAnalysis {
        sensor_id: sensor_id.to_string(),
        slope: fit.slope,
        intercept: fit.intercept,
        r_squared: fit.r_squared,
        direction,
        confidence,
        forecast_short: fit.predict(current_offset + cfg.forecast_short_secs),
        forecast_long: fit.predict(current_offset + cfg.forecast_long_secs),
        position_pct,
        health_score: health_score(position_pct, fit.slope, direction, cfg, &config.health),
        time_to_warning: time_to_warning(direction, fit.slope, latest_value, limit, cfg),
        time_to_critical: time_to_critical(direction, fit.slope, latest_value, limit),
        latest_value,
        sample_count: window.len(),
    })
}

/// A zero slope is always STABLE, whatever the epsilon.
pub fn classify_direction(slope: f64, stable_epsilon: f64) -> TrendDirection {
    if slope == 0.0 || slope.abs() < stable_epsilon {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    }
}

pub fn classify_confidence(r_squared: f64, cfg: &AnalysisConfig) -> Confidence {
    if r_squared > cfg.high_confidence_r2 {
        Confidence::High
    } else if r_squared > cfg.medium_confidence_r2 {
        Confidence::Medium
    } else {
        Confidence::Low
    }
}

/// Composite 0-100 score from range position and trend adversity.
///
/// Penalties and the stability bonus are summed first; the result is
/// clamped exactly once.
pub fn health_score(
    position_pct: f64,
    slope: f64,
    direction: TrendDirection,
    cfg: &AnalysisConfig,
    weights: &HealthConfig,
) -> f64 {
    let mut score = 100.0;

    if position_pct < cfg.warning_band_low_pct {
        score -= (cfg.warning_band_low_pct - position_pct) * weights.position_penalty_factor;
    } else if position_pct > cfg.warning_band_high_pct {
        score -= (position_pct - cfg.warning_band_high_pct) * weights.position_penalty_factor;
    }

    // Moving further from mid-range
    let adverse = (slope > 0.0 && position_pct > 50.0) || (slope < 0.0 && position_pct < 50.0);
    if adverse {
        score -= slope.abs() * weights.trend_penalty_factor;
    }

    if direction == TrendDirection::Stable {
        score += weights.stability_bonus;
    }

    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// Seconds until the latest value reaches the warning band edge it is heading for.
pub fn time_to_warning(
    direction: TrendDirection,
    slope: f64,
    latest_value: f64,
    limit: &OperationalLimit,
    cfg: &AnalysisConfig,
) -> Option<u64> {
    match direction {
        TrendDirection::Increasing => {
            let threshold = limit.value_at_pct(cfg.warning_band_high_pct);
            if latest_value < threshold {
                seconds_to_cover(threshold - latest_value, slope)
            } else {
                None
            }
        }
        TrendDirection::Decreasing => {
            let threshold = limit.value_at_pct(cfg.warning_band_low_pct);
            if latest_value > threshold {
                seconds_to_cover(latest_value - threshold, slope)
            } else {
                None
            }
        }
        TrendDirection::Stable => None,
    }
}

/// Seconds until the latest value reaches the hard limit it is heading for.
pub fn time_to_critical(
    direction: TrendDirection,
    slope: f64,
    latest_value: f64,
    limit: &OperationalLimit,
) -> Option<u64> {
    match direction {
        TrendDirection::Increasing if latest_value < limit.high => {
            seconds_to_cover(limit.high - latest_value, slope)
        }
        TrendDirection::Decreasing if latest_value > limit.low => {
            seconds_to_cover(latest_value - limit.low, slope)
        }
        TrendDirection::Increasing | TrendDirection::Decreasing => None,
        TrendDirection::Stable => None,
    }
}

/// Truncated to whole seconds. `None` when the slope is zero or the
/// estimate does not fit in a `u64`.
fn seconds_to_cover(distance: f64, slope: f64) -> Option<u64> {
    let secs = distance / slope.abs();
    (secs.is_finite() && secs >= 0.0 && secs < u64::MAX as f64).then(|| secs as u64)
}
