//! Closed-form least-squares fit
//!
//! ```text
//! slope     = (n·Σxy − Σx·Σy) / (n·Σxx − (Σx)²)
//! intercept = (Σy − slope·Σx) / n
//! R²        = 1 − SSres/SStot
//! ```
//!
//! Degenerate inputs resolve to fixed fallbacks rather than non-finite output:
//! - fewer than 2 points → all zeros
//! - all `x` identical → slope 0, intercept mean(y), R² 0
//! - constant `y` → R² 0 (a flat line explains nothing)

use serde::{Deserialize, Serialize};

/// Below this the x-variance denominator is treated as zero.
const DENOMINATOR_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearFit {
    /// Value of the fitted line at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit `y = slope·x + intercept` over paired samples.
///
/// Extra elements in the longer slice are ignored.
pub fn linear_regression(x: &[f64], y: &[f64]) -> LinearFit {
    let len = x.len().min(y.len());
    if len < 2 {
        return LinearFit::default();
    }
    let (x, y) = (&x[..len], &y[..len]);
    let n = len as f64;

    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        sum_x += xi;
        sum_y += yi;
        sum_xy += xi * yi;
        sum_xx += xi * xi;
    }
    let mean_y = sum_y / n;

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.abs() < DENOMINATOR_EPSILON * n.max(sum_xx.abs()) {
        return LinearFit {
            slope: 0.0,
            intercept: mean_y,
            r_squared: 0.0,
        };
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;

    let mut ss_total = 0.0;
    let mut ss_residual = 0.0;
    for (&xi, &yi) in x.iter().zip(y) {
        let predicted = slope * xi + intercept;
        ss_total += (yi - mean_y).powi(2);
        ss_residual += (yi - predicted).powi(2);
    }

    // Rounding can push a near-perfect or near-useless fit just outside [0, 1]
    let r_squared = if ss_total > 0.0 {
        (1.0 - ss_residual / ss_total).clamp(0.0, 1.0)
    } else {
        0.0
    };

    if !(slope.is_finite() && intercept.is_finite() && r_squared.is_finite()) {
        return LinearFit {
            slope: 0.0,
            intercept: if mean_y.is_finite() { mean_y } else { 0.0 },
            r_squared: 0.0,
        };
    }

    LinearFit {
        slope,
        intercept,
        r_squared,
    }
}
