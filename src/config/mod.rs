use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;

/// Frame rate assumed when the caller reports 0 or an unusable value
pub const DEFAULT_FPS: f64 = 30.0;

/// How the standing-ankle baseline is estimated
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundStrategy {
    /// Mean of the first `frames` smoothed samples; the clip must open with
    /// the subject standing still.
    CalibrationWindow { frames: usize },
    /// Most populated histogram bin of the whole smoothed series.
    HistogramMode { max_bins: usize },
}

impl Default for GroundStrategy {
    fn default() -> Self {
        GroundStrategy::HistogramMode { max_bins: 50 }
    }
}

/// Margin below the ground level a signal has to clear to count as airborne
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiftoffThreshold {
    /// Absolute margin in coordinate units (pixels for raw detections)
    Pixels(f64),
    /// Fraction of the ground level magnitude
    FractionOfGround(f64),
}

impl LiftoffThreshold {
    /// Margin in coordinate units for the given ground level
    pub fn margin(&self, ground: f64) -> f64 {
        match *self {
            LiftoffThreshold::Pixels(pixels) => pixels,
            LiftoffThreshold::FractionOfGround(fraction) => {
                let reference = if ground.abs() > 1e-6 { ground.abs() } else { 1.0 };
                fraction * reference
            }
        }
    }
}

impl Default for LiftoffThreshold {
    fn default() -> Self {
        LiftoffThreshold::FractionOfGround(0.04)
    }
}

/// Smoothing windows for the vertical signal
#[derive(Debug, Clone)]
pub struct SmoothingConfig {
    /// Trailing moving-average window used by the causal state machine
    pub moving_average_window: usize,
    /// Savitzky-Golay window used for retrospective height computation
    pub savgol_window: usize,
    /// Savitzky-Golay polynomial order
    pub savgol_order: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            moving_average_window: 5,
            savgol_window: 11,
            savgol_order: 3,
        }
    }
}

/// Plausible flight-time band in milliseconds, both ends inclusive
#[derive(Debug, Clone, Copy)]
pub struct FlightLimits {
    pub min_flight_ms: f64,
    pub max_flight_ms: f64,
}

impl FlightLimits {
    pub fn contains(&self, flight_ms: f64) -> bool {
        flight_ms >= self.min_flight_ms && flight_ms <= self.max_flight_ms
    }
}

impl Default for FlightLimits {
    fn default() -> Self {
        Self {
            min_flight_ms: 100.0,
            max_flight_ms: 1200.0,
        }
    }
}

/// Phase classifier thresholds
#[derive(Debug, Clone)]
pub struct PhaseConfig {
    /// Upward ankle speed, as a fraction of the liftoff margin per frame,
    /// that moves STANDING into APPROACH
    pub rise_speed_ratio: f64,
    /// Hip and knee angle below which a grounded pose is loading (degrees)
    pub loading_angle: f64,
    /// Hip and knee angle above which an airborne pose is extended (degrees)
    pub extended_angle: f64,
    /// Knee angle below which a pose right after landing is absorbing (degrees)
    pub landing_angle: f64,
    /// Frames after a landing during which flexion counts as absorption
    pub landing_window: usize,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            rise_speed_ratio: 0.25,
            loading_angle: 100.0,
            extended_angle: 160.0,
            landing_angle: 130.0,
            landing_window: 10,
        }
    }
}

/// Camera drift compensation
#[derive(Debug, Clone)]
pub struct DriftConfig {
    /// Fewer background tracks than this in a frame means drift is 0
    pub min_tracked_points: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            min_tracked_points: 8,
        }
    }
}

/// Scorecard reference values
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Height that maps to a 99 height sub-score
    pub elite_height_inches: f64,
    /// Knee angle at takeoff that maps to a 99 knee-bend sub-score
    pub optimal_knee_angle: f64,
    /// Points lost per degree of deviation from the optimal knee angle
    pub knee_penalty_per_degree: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            elite_height_inches: 44.0,
            optimal_knee_angle: 90.0,
            knee_penalty_per_degree: 1.5,
        }
    }
}

/// Complete analysis configuration
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfig {
    pub smoothing: SmoothingConfig,
    pub ground_strategy: GroundStrategy,
    pub liftoff_threshold: LiftoffThreshold,
    pub flight: FlightLimits,
    pub phase: PhaseConfig,
    pub drift: DriftConfig,
    pub scoring: ScoringConfig,
}

impl AnalysisConfig {
    /// Create configuration from `JUMP_*` environment variables layered over the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(window) = parse_var::<usize>("JUMP_SMOOTHING_WINDOW")? {
            config.smoothing.moving_average_window = window;
        }

        let calibration_frames = parse_var::<usize>("JUMP_CALIBRATION_FRAMES")?;
        match env::var("JUMP_GROUND_STRATEGY").ok().as_deref() {
            Some("calibration") => {
                config.ground_strategy = GroundStrategy::CalibrationWindow {
                    frames: calibration_frames.unwrap_or(30),
                };
            }
            Some("histogram") => {
                if calibration_frames.is_some() {
                    bail!("JUMP_CALIBRATION_FRAMES conflicts with JUMP_GROUND_STRATEGY=histogram");
                }
            }
            None => {
                if let Some(frames) = calibration_frames {
                    config.ground_strategy = GroundStrategy::CalibrationWindow { frames };
                }
            }
            Some(other) => bail!("Unknown JUMP_GROUND_STRATEGY: {}", other),
        }

        let liftoff_value = parse_var::<f64>("JUMP_LIFTOFF_VALUE")?;
        config.liftoff_threshold = match env::var("JUMP_LIFTOFF_MODE").ok().as_deref() {
            Some("pixels") => LiftoffThreshold::Pixels(liftoff_value.unwrap_or(3.0)),
            Some("fraction") | None => match liftoff_value {
                Some(value) => LiftoffThreshold::FractionOfGround(value),
                None => config.liftoff_threshold,
            },
            Some(other) => bail!("Unknown JUMP_LIFTOFF_MODE: {}", other),
        };

        if let Some(min_ms) = parse_var::<f64>("JUMP_MIN_FLIGHT_MS")? {
            config.flight.min_flight_ms = min_ms;
        }
        if let Some(max_ms) = parse_var::<f64>("JUMP_MAX_FLIGHT_MS")? {
            config.flight.max_flight_ms = max_ms;
        }
        if let Some(elite) = parse_var::<f64>("JUMP_ELITE_HEIGHT_INCHES")? {
            config.scoring.elite_height_inches = elite;
        }

        config.validate()?;
        Ok(config)
    }

    /// Override the ground estimation strategy
    pub fn with_ground_strategy(mut self, strategy: GroundStrategy) -> Self {
        self.ground_strategy = strategy;
        self
    }

    /// Override the liftoff threshold
    pub fn with_liftoff_threshold(mut self, threshold: LiftoffThreshold) -> Self {
        self.liftoff_threshold = threshold;
        self
    }

    /// Override the plausible flight band
    pub fn with_flight_limits(mut self, min_flight_ms: f64, max_flight_ms: f64) -> Self {
        self.flight = FlightLimits {
            min_flight_ms,
            max_flight_ms,
        };
        self
    }

    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.smoothing.moving_average_window == 0 {
            bail!("Moving-average window must be at least 1");
        }
        if self.flight.min_flight_ms >= self.flight.max_flight_ms {
            bail!(
                "Minimum flight time {}ms must be below maximum {}ms",
                self.flight.min_flight_ms,
                self.flight.max_flight_ms
            );
        }
        match self.ground_strategy {
            GroundStrategy::CalibrationWindow { frames } if frames < 2 => {
                bail!("Calibration window needs at least 2 frames")
            }
            GroundStrategy::HistogramMode { max_bins } if max_bins == 0 => {
                bail!("Histogram needs at least 1 bin")
            }
            _ => {}
        }
        let margin = match self.liftoff_threshold {
            LiftoffThreshold::Pixels(value) | LiftoffThreshold::FractionOfGround(value) => value,
        };
        if !margin.is_finite() || margin < 0.0 {
            bail!("Liftoff threshold must be a non-negative number");
        }
        if self.scoring.elite_height_inches <= 0.0 {
            bail!("Elite height must be positive");
        }
        Ok(())
    }
}

fn parse_var<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.smoothing.moving_average_window, 5);
        assert_eq!(config.flight.min_flight_ms, 100.0);
        assert_eq!(config.flight.max_flight_ms, 1200.0);
    }

    #[test]
    fn test_liftoff_margin() {
        assert_eq!(LiftoffThreshold::Pixels(3.0).margin(400.0), 3.0);
        assert!((LiftoffThreshold::FractionOfGround(0.04).margin(400.0) - 16.0).abs() < 1e-9);
        // Degenerate ground falls back to a unit reference
        assert!((LiftoffThreshold::FractionOfGround(0.04).margin(0.0) - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_flight_limits_inclusive() {
        let limits = FlightLimits::default();
        assert!(limits.contains(100.0));
        assert!(limits.contains(1200.0));
        assert!(!limits.contains(99.9));
        assert!(!limits.contains(1200.1));
    }

    #[test]
    fn test_invalid_flight_band_rejected() {
        let config = AnalysisConfig::default().with_flight_limits(500.0, 400.0);
        assert!(config.validate().is_err());
    }
}
