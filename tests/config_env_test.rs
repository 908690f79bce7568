//! Environment configuration tests
//!
//! These mutate process-wide `JUMP_*` variables, so they run serially.
use jump_analysis::config::{AnalysisConfig, GroundStrategy, LiftoffThreshold};
use serial_test::serial;
use std::env;

const VARS: [&str; 8] = [
    "JUMP_GROUND_STRATEGY",
    "JUMP_CALIBRATION_FRAMES",
    "JUMP_LIFTOFF_MODE",
    "JUMP_LIFTOFF_VALUE",
    "JUMP_MIN_FLIGHT_MS",
    "JUMP_MAX_FLIGHT_MS",
    "JUMP_SMOOTHING_WINDOW",
    "JUMP_ELITE_HEIGHT_INCHES",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_env() {
    clear_env();

    let config = AnalysisConfig::from_env().unwrap();

    assert_eq!(config.ground_strategy, GroundStrategy::HistogramMode { max_bins: 50 });
    assert_eq!(config.liftoff_threshold, LiftoffThreshold::FractionOfGround(0.04));
    assert_eq!(config.scoring.elite_height_inches, 44.0);
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    env::set_var("JUMP_GROUND_STRATEGY", "calibration");
    env::set_var("JUMP_CALIBRATION_FRAMES", "45");
    env::set_var("JUMP_LIFTOFF_MODE", "pixels");
    env::set_var("JUMP_LIFTOFF_VALUE", "3");
    env::set_var("JUMP_MIN_FLIGHT_MS", "150");
    env::set_var("JUMP_SMOOTHING_WINDOW", "7");

    let config = AnalysisConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.ground_strategy, GroundStrategy::CalibrationWindow { frames: 45 });
    assert_eq!(config.liftoff_threshold, LiftoffThreshold::Pixels(3.0));
    assert_eq!(config.flight.min_flight_ms, 150.0);
    assert_eq!(config.smoothing.moving_average_window, 7);
}

#[test]
#[serial]
fn test_unparseable_value_is_reported() {
    clear_env();
    env::set_var("JUMP_MAX_FLIGHT_MS", "a lot");

    let err = AnalysisConfig::from_env().unwrap_err();
    clear_env();

    assert!(err.to_string().contains("JUMP_MAX_FLIGHT_MS"));
}

#[test]
#[serial]
fn test_unknown_strategy_is_rejected() {
    clear_env();
    env::set_var("JUMP_LIFTOFF_MODE", "percent");

    let result = AnalysisConfig::from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_inverted_flight_band_is_rejected() {
    clear_env();
    env::set_var("JUMP_MIN_FLIGHT_MS", "900");
    env::set_var("JUMP_MAX_FLIGHT_MS", "300");

    let result = AnalysisConfig::from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_calibration_frames_alone_select_calibration() {
    clear_env();
    env::set_var("JUMP_CALIBRATION_FRAMES", "45");

    let config = AnalysisConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.ground_strategy, GroundStrategy::CalibrationWindow { frames: 45 });
}

#[test]
#[serial]
fn test_histogram_with_calibration_frames_is_rejected() {
    clear_env();
    env::set_var("JUMP_GROUND_STRATEGY", "histogram");
    env::set_var("JUMP_CALIBRATION_FRAMES", "45");

    let err = AnalysisConfig::from_env().unwrap_err();
    clear_env();

    assert!(err.to_string().contains("JUMP_CALIBRATION_FRAMES"));
}

#[test]
#[serial]
fn test_explicit_histogram_strategy() {
    clear_env();
    env::set_var("JUMP_GROUND_STRATEGY", "histogram");

    let config = AnalysisConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.ground_strategy, GroundStrategy::HistogramMode { max_bins: 50 });
}
