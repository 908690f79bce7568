use serde::{Deserialize, Serialize};

/// Gravitational acceleration (m/s²)
pub const GRAVITY: f64 = 9.81;

pub const INCHES_PER_METER: f64 = 39.3701;

/// Height in meters reached during a flight of `flight_time_ms`, assuming
/// takeoff and landing at the same level
pub fn height_from_flight_time(flight_time_ms: f64) -> f64 {
    let half_flight_s = flight_time_ms / 1000.0 / 2.0;
    GRAVITY * half_flight_s * half_flight_s / 2.0
}

/// Flight time in milliseconds needed to reach `height_m`
pub fn flight_time_from_height(height_m: f64) -> f64 {
    if height_m <= 0.0 {
        return 0.0;
    }
    2.0 * (2.0 * height_m / GRAVITY).sqrt() * 1000.0
}

/// One detected flight segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpEvent {
    pub takeoff_frame: usize,
    pub takeoff_ms: f64,
    pub landing_frame: usize,
    pub landing_ms: f64,
    pub flight_time_ms: f64,
    pub height_inches: f64,
    pub height_cm: f64,
    /// Trajectory symmetry score (0-1)
    pub confidence: f64,
}

impl JumpEvent {
    /// Build an event from its takeoff and landing, deriving the height
    pub fn from_flight(
        takeoff_frame: usize,
        takeoff_ms: f64,
        landing_frame: usize,
        landing_ms: f64,
        confidence: f64,
    ) -> Self {
        let flight_time_ms = landing_ms - takeoff_ms;
        let height_m = height_from_flight_time(flight_time_ms);

        Self {
            takeoff_frame,
            takeoff_ms,
            landing_frame,
            landing_ms,
            flight_time_ms,
            height_inches: height_m * INCHES_PER_METER,
            height_cm: height_m * 100.0,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Placeholder spanning the whole clip when no flight was found
    pub fn zero_confidence(first_frame: usize, last_frame: usize, last_ms: f64) -> Self {
        Self {
            takeoff_frame: first_frame,
            takeoff_ms: 0.0,
            landing_frame: last_frame,
            landing_ms: last_ms,
            flight_time_ms: 0.0,
            height_inches: 0.0,
            height_cm: 0.0,
            confidence: 0.0,
        }
    }

    pub fn height_meters(&self) -> f64 {
        self.height_cm / 100.0
    }
}
