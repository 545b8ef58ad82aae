//! Config Validation Tests
//!
//! Loads TOML tuning files from disk and checks that invalid tunings are
//! rejected before an engine is built.

use std::io::Write;

use pdm_trends::config::{ConfigError, TrendConfig};

fn write_toml(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn file_overrides_only_named_values() {
    let file = write_toml(
        r#"
[window]
capacity = 250

[aggregation]
at_risk_horizon_secs = 1200
"#,
    );
    let config = TrendConfig::load_from_file(file.path()).unwrap();

    assert_eq!(config.window.capacity, 250);
    assert_eq!(config.aggregation.at_risk_horizon_secs, 1200);
    assert_eq!(config.analysis, TrendConfig::default().analysis);
    assert_eq!(config.schedule.interval_secs, 10);
}

#[test]
fn empty_file_is_the_default_tuning() {
    let file = write_toml("");
    assert_eq!(TrendConfig::load_from_file(file.path()).unwrap(), TrendConfig::default());
}

#[test]
fn window_smaller_than_min_points_is_rejected() {
    let file = write_toml(
        r#"
[window]
capacity = 2

[analysis]
min_points = 3
"#,
    );
    match TrendConfig::load_from_file(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("window.capacity"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn every_violation_is_reported_together() {
    let file = write_toml(
        r#"
[analysis]
warning_band_low_pct = 90.0
warning_band_high_pct = 10.0

[schedule]
interval_secs = 0
"#,
    );
    match TrendConfig::load_from_file(file.path()) {
        Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn zero_stable_slope_epsilon_is_rejected() {
    let file = write_toml(
        r#"
[analysis]
stable_slope_epsilon = 0.0
"#,
    );
    match TrendConfig::load_from_file(file.path()) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].contains("stable_slope_epsilon"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    let mut config = TrendConfig::default();
    config.analysis.stable_slope_epsilon = f64::NAN;
    assert!(config.validate().is_err());
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_toml("[window\ncapacity = ");
    assert!(matches!(
        TrendConfig::load_from_file(file.path()),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn written_config_loads_back() {
    let mut config = TrendConfig::default();
    config.health.stability_bonus = 5.0;
    config.server.addr = "127.0.0.1:9000".to_string();

    let file = write_toml(&config.to_toml().unwrap());
    assert_eq!(TrendConfig::load_from_file(file.path()).unwrap(), config);
}
