//! Trend Configuration - analysis tunables as operator-editable TOML values
//!
//! Each section implements `Default` with the constants from
//! [`defaults`](super::defaults), so a missing file or a partial file
//! behaves exactly like the built-in tuning.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "PDM_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "pdm_config.toml";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config parse error ({}): {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one engine instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl TrendConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PDM_CONFIG`
    /// 2. `./pdm_config.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded trend config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded trend config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config: Self = toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject tunings that would make the analysis meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();
        let a = &self.analysis;

        if a.min_points < 2 {
            errors.push(format!("analysis.min_points ({}) must be at least 2", a.min_points));
        }
        if self.window.capacity < a.min_points {
            errors.push(format!(
                "window.capacity ({}) must be at least analysis.min_points ({})",
                self.window.capacity, a.min_points
            ));
        }
        if !(a.stable_slope_epsilon.is_finite() && a.stable_slope_epsilon > 0.0) {
            errors.push(format!(
                "analysis.stable_slope_epsilon ({}) must be a positive number",
                a.stable_slope_epsilon
            ));
        }
        if a.medium_confidence_r2 > a.high_confidence_r2 {
            errors.push(format!(
                "analysis.medium_confidence_r2 ({:.2}) must not exceed high_confidence_r2 ({:.2})",
                a.medium_confidence_r2, a.high_confidence_r2
            ));
        }
        if a.warning_band_low_pct >= a.warning_band_high_pct {
            errors.push(format!(
                "analysis.warning_band_low_pct ({:.1}) must be less than warning_band_high_pct ({:.1})",
                a.warning_band_low_pct, a.warning_band_high_pct
            ));
        }
        if self.aggregation.degrading_below > self.aggregation.improving_above {
            errors.push(format!(
                "aggregation.degrading_below ({:.1}) must not exceed improving_above ({:.1})",
                self.aggregation.degrading_below, self.aggregation.improving_above
            ));
        }
        if self.schedule.interval_secs == 0 {
            errors.push("schedule.interval_secs must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Readings retained per sensor; the oldest is evicted beyond this.
    pub capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::WINDOW_CAPACITY,
        }
    }
}

/// Regression classification and forecasting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub min_points: usize,
    pub stable_slope_epsilon: f64,
    pub high_confidence_r2: f64,
    pub medium_confidence_r2: f64,
    pub forecast_short_secs: f64,
    pub forecast_long_secs: f64,
    pub warning_band_low_pct: f64,
    pub warning_band_high_pct: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_points: defaults::MIN_POINTS_FOR_ANALYSIS,
            stable_slope_epsilon: defaults::STABLE_SLOPE_EPSILON,
            high_confidence_r2: defaults::HIGH_CONFIDENCE_R2,
            medium_confidence_r2: defaults::MEDIUM_CONFIDENCE_R2,
            forecast_short_secs: defaults::FORECAST_SHORT_SECS,
            forecast_long_secs: defaults::FORECAST_LONG_SECS,
            warning_band_low_pct: defaults::WARNING_BAND_LOW_PCT,
            warning_band_high_pct: defaults::WARNING_BAND_HIGH_PCT,
        }
    }
}

/// Health score weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub position_penalty_factor: f64,
    pub trend_penalty_factor: f64,
    pub stability_bonus: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            position_penalty_factor: defaults::POSITION_PENALTY_FACTOR,
            trend_penalty_factor: defaults::TREND_PENALTY_FACTOR,
            stability_bonus: defaults::STABILITY_BONUS,
        }
    }
}

/// Machine roll-up thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub degrading_below: f64,
    pub improving_above: f64,
    pub at_risk_horizon_secs: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            degrading_below: defaults::DEGRADING_HEALTH_BELOW,
            improving_above: defaults::IMPROVING_HEALTH_ABOVE,
            at_risk_horizon_secs: defaults::AT_RISK_HORIZON_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::ANALYSIS_INTERVAL_SECS,
        }
    }
}

/// HTTP status API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Can be overridden by the `--addr` CLI flag.
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: defaults::SERVER_ADDR.to_string(),
        }
    }
}
