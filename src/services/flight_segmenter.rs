//! Flight Segmenter
//!
//! Finds airborne runs in the conditioned ankle signal and turns each
//! plausible run into a [`JumpEvent`] with a hang-time height.

use tracing::{debug, info};

use crate::config::{AnalysisConfig, FlightLimits, GroundStrategy, LiftoffThreshold};
use crate::errors::AnalysisError;
use crate::models::jump_event::JumpEvent;
use crate::models::keypoint::{JointPair, KeypointFrame};
use crate::services::signal_conditioner::{frame_timestamps, GroundLevel, SignalConditioner};

/// Guards the symmetry ratio against a zero first-half peak
const CONFIDENCE_EPSILON: f64 = 1e-6;

/// Flights shorter than this many samples get a neutral confidence
const MIN_CONFIDENCE_SAMPLES: usize = 3;

/// Half-open `[takeoff, landing)` sequence positions of one airborne run.
///
/// `landing == len` means the run reached the end of the clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlightCandidate {
    pub takeoff: usize,
    pub landing: usize,
}

/// Per-frame timing of a sequence
#[derive(Debug, Clone)]
pub struct FrameClock {
    pub frame_indices: Vec<usize>,
    pub timestamps_ms: Vec<f64>,
    pub fps: f64,
}

impl FrameClock {
    pub fn from_frames(frames: &[KeypointFrame], fps: f64) -> Self {
        Self {
            frame_indices: frames.iter().map(|frame| frame.frame_index).collect(),
            timestamps_ms: frame_timestamps(frames, fps),
            fps,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps_ms.is_empty()
    }

    /// Frame number and timestamp at a position, one frame period past the
    /// last frame when `position == len`
    pub fn at(&self, position: usize) -> (usize, f64) {
        match (self.frame_indices.get(position), self.timestamps_ms.get(position)) {
            (Some(&frame_index), Some(&timestamp)) => (frame_index, timestamp),
            _ => {
                let last_frame = self.frame_indices.last().copied().unwrap_or(0);
                let last_ms = self.timestamps_ms.last().copied().unwrap_or(0.0);
                (last_frame + 1, last_ms + 1000.0 / self.fps)
            }
        }
    }
}

/// Flight segmenter service
#[derive(Debug, Clone)]
pub struct FlightSegmenter {
    conditioner: SignalConditioner,
    ground_strategy: GroundStrategy,
    threshold: LiftoffThreshold,
    limits: FlightLimits,
}

impl FlightSegmenter {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            conditioner: SignalConditioner::new(config.smoothing.clone()),
            ground_strategy: config.ground_strategy,
            threshold: config.liftoff_threshold,
            limits: config.flight,
        }
    }

    /// Detect every plausible flight in a frame sequence, ordered by takeoff
    pub fn calculate(
        &self,
        frames: &[KeypointFrame],
        fps: f64,
    ) -> Result<Vec<JumpEvent>, AnalysisError> {
        let signal = self
            .conditioner
            .condition(frames, JointPair::Ankles, self.ground_strategy)?;
        let clock = FrameClock::from_frames(frames, fps);
        Ok(self.detect(&signal.smoothed, &signal.ground, &clock))
    }

    /// Airborne test per frame; `None` where the signal is missing
    pub fn airborne_series(&self, smoothed: &[Option<f64>], ground: &GroundLevel) -> Vec<Option<bool>> {
        let margin = self.threshold.margin(ground.value);
        smoothed
            .iter()
            .enumerate()
            .map(|(i, value)| value.map(|y| y < ground.at(i) - margin))
            .collect()
    }

    /// Detect flights in an already smoothed vertical series
    pub fn detect(
        &self,
        smoothed: &[Option<f64>],
        ground: &GroundLevel,
        clock: &FrameClock,
    ) -> Vec<JumpEvent> {
        let airborne = self.airborne_series(smoothed, ground);
        let candidates = flight_candidates(&airborne);

        let mut events = Vec::new();
        for candidate in &candidates {
            let (takeoff_frame, takeoff_ms) = clock.at(candidate.takeoff);
            let (landing_frame, landing_ms) = clock.at(candidate.landing);
            let flight_ms = landing_ms - takeoff_ms;

            if !self.limits.contains(flight_ms) {
                debug!(
                    "Rejected flight at frame {}: {:.1}ms outside {}-{}ms",
                    takeoff_frame, flight_ms, self.limits.min_flight_ms, self.limits.max_flight_ms
                );
                continue;
            }

            let magnitudes: Vec<f64> = (candidate.takeoff..candidate.landing)
                .filter_map(|i| smoothed.get(i).copied().flatten().map(|y| ground.at(i) - y))
                .collect();
            let confidence = flight_confidence(&magnitudes);

            let event = JumpEvent::from_flight(
                takeoff_frame,
                takeoff_ms,
                landing_frame,
                landing_ms,
                confidence,
            );
            debug!(
                "Accepted flight at frame {}: {:.1}ms, {:.2}in, confidence {:.2}",
                takeoff_frame, flight_ms, event.height_inches, confidence
            );
            events.push(event);
        }

        info!(
            "{} flight candidates, {} within the plausible band",
            candidates.len(),
            events.len()
        );
        events
    }
}

/// Maximal airborne runs. A missing sample keeps the previous state and the
/// sequence is grounded before its first sample.
pub fn flight_candidates(airborne: &[Option<bool>]) -> Vec<FlightCandidate> {
    let mut candidates = Vec::new();
    let mut state = false;
    let mut takeoff = 0;

    for (i, sample) in airborne.iter().enumerate() {
        let now = sample.unwrap_or(state);
        match (state, now) {
            (false, true) => takeoff = i,
            (true, false) => candidates.push(FlightCandidate { takeoff, landing: i }),
            _ => {}
        }
        state = now;
    }

    if state {
        candidates.push(FlightCandidate {
            takeoff,
            landing: airborne.len(),
        });
    }

    candidates
}

/// Symmetry of the peak height between the two halves of a flight
pub fn flight_confidence(magnitudes: &[f64]) -> f64 {
    if magnitudes.len() < MIN_CONFIDENCE_SAMPLES {
        return 0.5;
    }
    let mid = magnitudes.len() / 2;
    let peak = |values: &[f64]| values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let first = peak(&magnitudes[..mid]);
    let second = peak(&magnitudes[mid..]);

    (1.0 - (first - second).abs() / (first + CONFIDENCE_EPSILON)).clamp(0.0, 1.0)
}

/// Highest jump; the earliest takeoff wins a tie
pub fn best_jump(events: &[JumpEvent]) -> Option<&JumpEvent> {
    events.iter().fold(None, |best: Option<&JumpEvent>, event| match best {
        Some(current) if current.height_inches > event.height_inches => Some(current),
        Some(current)
            if current.height_inches == event.height_inches
                && current.takeoff_frame <= event.takeoff_frame =>
        {
            Some(current)
        }
        _ => Some(event),
    })
}
