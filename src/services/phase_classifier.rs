//! Phase Classifier
//!
//! Causal state machine over the ankle signal, fed one frame at a time.
//! The ankle/velocity machine decides takeoff and landing frames. A second,
//! joint-angle posture label is computed alongside it for display only.

use tracing::debug;

use crate::config::{AnalysisConfig, FlightLimits, PhaseConfig};
use crate::models::jump_event::JumpEvent;
use crate::models::keypoint::{JointName, JointPair, KeypointFrame};
use crate::models::phase::{FramePhase, JumpPhase, TakeoffStyle};
use crate::services::flight_segmenter::{flight_confidence, FrameClock};
use crate::services::joint_angles::{mean_joint_angle, JointAngleKind};
use crate::services::signal_conditioner::{GroundLevel, MovingAverage};

/// Everything the classifier produced for one sequence
#[derive(Debug, Clone, Default)]
pub struct PhaseTimeline {
    pub frames: Vec<FramePhase>,
    /// Flights closed by the state machine that passed the plausibility band
    pub events: Vec<JumpEvent>,
    /// Liftoff frame and takeoff style of every completed flight
    pub liftoffs: Vec<(usize, TakeoffStyle)>,
}

impl PhaseTimeline {
    pub fn phases(&self) -> Vec<JumpPhase> {
        self.frames.iter().map(|frame| frame.phase).collect()
    }

    /// Style of the liftoff closest to a takeoff frame
    pub fn takeoff_style_near(&self, takeoff_frame: usize) -> TakeoffStyle {
        self.liftoffs
            .iter()
            .min_by_key(|(frame, _)| frame.abs_diff(takeoff_frame))
            .map(|(_, style)| *style)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy)]
struct Liftoff {
    frame_index: usize,
    timestamp_ms: f64,
    style: TakeoffStyle,
}

/// Caller-owned classifier state for a single pass over one sequence
#[derive(Debug, Clone)]
pub struct PhaseClassifier {
    config: PhaseConfig,
    limits: FlightLimits,
    margin: f64,
    rise_threshold: f64,
    average: MovingAverage,
    previous_level: Option<f64>,
    state: JumpPhase,
    posture: JumpPhase,
    liftoff: Option<Liftoff>,
    flight_magnitudes: Vec<f64>,
    last_landing: Option<usize>,
    position: usize,
    timeline: PhaseTimeline,
}

impl PhaseClassifier {
    /// Start a pass; the liftoff margin is fixed from the base ground level
    pub fn new(config: &AnalysisConfig, ground_level: f64) -> Self {
        let margin = config.liftoff_threshold.margin(ground_level);
        Self {
            config: config.phase.clone(),
            limits: config.flight,
            margin,
            rise_threshold: margin * config.phase.rise_speed_ratio,
            average: MovingAverage::new(config.smoothing.moving_average_window),
            previous_level: None,
            state: JumpPhase::Standing,
            posture: JumpPhase::Standing,
            liftoff: None,
            flight_magnitudes: Vec::new(),
            last_landing: None,
            position: 0,
            timeline: PhaseTimeline::default(),
        }
    }

    /// Classify every frame of a sequence
    pub fn run(
        config: &AnalysisConfig,
        frames: &[KeypointFrame],
        ground: &GroundLevel,
        clock: &FrameClock,
    ) -> PhaseTimeline {
        let mut classifier = Self::new(config, ground.value);
        for (i, frame) in frames.iter().enumerate() {
            let (_, timestamp_ms) = clock.at(i);
            classifier.step(frame, ground.at(i), timestamp_ms);
        }
        classifier.finish()
    }

    pub fn state(&self) -> JumpPhase {
        self.state
    }

    /// Feed the next frame and return its labels
    pub fn step(&mut self, frame: &KeypointFrame, ground: f64, timestamp_ms: f64) -> FramePhase {
        let level = self.average.push(frame.pair_y(JointPair::Ankles));
        let airborne = level.map(|y| y < ground - self.margin);
        let velocity = match (self.previous_level, level) {
            (Some(previous), Some(current)) => Some(previous - current),
            _ => None,
        };
        if level.is_some() {
            self.previous_level = level;
        }

        let next = match airborne {
            Some(airborne) => self.transition(airborne, velocity, frame, ground, timestamp_ms),
            None => self.state,
        };
        debug_assert!(self.state.can_transition_to(next));
        if next != self.state {
            debug!("Frame {}: {} -> {}", frame.frame_index, self.state, next);
        }
        self.state = next;

        if next.is_airborne() {
            if let Some(y) = level {
                self.flight_magnitudes.push(ground - y);
            }
        }

        self.posture = self.posture_label(frame, airborne);
        let labels = FramePhase {
            frame_index: frame.frame_index,
            phase: self.state,
            posture: self.posture,
            airborne,
        };
        self.timeline.frames.push(labels);
        self.position += 1;
        labels
    }

    fn transition(
        &mut self,
        airborne: bool,
        velocity: Option<f64>,
        frame: &KeypointFrame,
        ground: f64,
        timestamp_ms: f64,
    ) -> JumpPhase {
        let rising = velocity.map_or(false, |v| v > self.rise_threshold);
        let falling = velocity.map_or(false, |v| v < -self.rise_threshold);
        let still = velocity.map_or(false, |v| v.abs() <= self.rise_threshold);

        match (self.state, airborne) {
            (JumpPhase::Standing, true) => {
                if self.liftoff.is_none() {
                    self.record_liftoff(frame, ground, timestamp_ms);
                }
                JumpPhase::Approach
            }
            (JumpPhase::Standing, false) => {
                // Rebound liftoff from LANDING did not hold
                self.liftoff = None;
                if rising {
                    JumpPhase::Approach
                } else {
                    JumpPhase::Standing
                }
            }
            (JumpPhase::Approach, true) => {
                if self.liftoff.is_none() {
                    self.record_liftoff(frame, ground, timestamp_ms);
                }
                JumpPhase::Takeoff
            }
            (JumpPhase::Approach, false) => {
                // Liftoff seen from STANDING did not hold
                self.liftoff = None;
                self.flight_magnitudes.clear();
                if falling {
                    JumpPhase::Standing
                } else {
                    JumpPhase::Approach
                }
            }
            (JumpPhase::Takeoff, true) | (JumpPhase::Flight, true) => JumpPhase::Flight,
            (JumpPhase::Takeoff, false) | (JumpPhase::Flight, false) => {
                self.land(frame, timestamp_ms);
                JumpPhase::Landing
            }
            (JumpPhase::Landing, true) => {
                // Rebound: the next flight re-enters through APPROACH
                self.record_liftoff(frame, ground, timestamp_ms);
                JumpPhase::Standing
            }
            (JumpPhase::Landing, false) if still => JumpPhase::Standing,
            (JumpPhase::Landing, false) => JumpPhase::Landing,
        }
    }

    fn record_liftoff(&mut self, frame: &KeypointFrame, ground: f64, timestamp_ms: f64) {
        let threshold = ground - self.margin;
        let crosses = |joint: JointName| frame.joint(joint).map(|ankle| ankle.y < threshold);
        let style = match (crosses(JointName::LeftAnkle), crosses(JointName::RightAnkle)) {
            (Some(true), Some(true)) => TakeoffStyle::TwoLeg,
            (Some(true), Some(false)) | (Some(false), Some(true)) => TakeoffStyle::OneLeg,
            _ => TakeoffStyle::Unknown,
        };

        self.flight_magnitudes.clear();
        self.liftoff = Some(Liftoff {
            frame_index: frame.frame_index,
            timestamp_ms,
            style,
        });
    }

    fn land(&mut self, frame: &KeypointFrame, timestamp_ms: f64) {
        self.last_landing = Some(self.position);
        let Some(liftoff) = self.liftoff.take() else {
            return;
        };
        self.timeline.liftoffs.push((liftoff.frame_index, liftoff.style));

        let flight_ms = timestamp_ms - liftoff.timestamp_ms;
        if !self.limits.contains(flight_ms) {
            debug!(
                "Flight from frame {} to {} rejected: {:.1}ms",
                liftoff.frame_index, frame.frame_index, flight_ms
            );
            return;
        }

        let event = JumpEvent::from_flight(
            liftoff.frame_index,
            liftoff.timestamp_ms,
            frame.frame_index,
            timestamp_ms,
            flight_confidence(&self.flight_magnitudes),
        );
        debug!(
            "Flight from frame {} to {}: {:.1}ms ({:?})",
            event.takeoff_frame, event.landing_frame, event.flight_time_ms, liftoff.style
        );
        self.timeline.events.push(event);
        self.flight_magnitudes.clear();
    }

    fn posture_label(&self, frame: &KeypointFrame, airborne: Option<bool>) -> JumpPhase {
        let hip = mean_joint_angle(frame, JointAngleKind::Hip);
        let knee = mean_joint_angle(frame, JointAngleKind::Knee);
        let (hip, knee, airborne) = match (hip, knee, airborne) {
            (Some(hip), Some(knee), Some(airborne)) => (hip, knee, airborne),
            _ => return self.posture,
        };

        let after_landing = self
            .last_landing
            .map_or(false, |landing| self.position - landing <= self.config.landing_window);

        if !airborne && hip < self.config.loading_angle && knee < self.config.loading_angle {
            JumpPhase::Approach
        } else if airborne && hip > self.config.extended_angle && knee > self.config.extended_angle {
            JumpPhase::Flight
        } else if !airborne && after_landing && knee < self.config.landing_angle {
            JumpPhase::Landing
        } else {
            JumpPhase::Standing
        }
    }

    /// End the pass; a flight still open at the end of the clip is dropped
    pub fn finish(self) -> PhaseTimeline {
        if let Some(liftoff) = self.liftoff {
            if self.state.is_airborne() {
                debug!(
                    "Flight from frame {} still open at end of sequence, dropped",
                    liftoff.frame_index
                );
            }
        }
        self.timeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ankles(frame_index: usize, left_y: f64, right_y: f64) -> KeypointFrame {
        KeypointFrame::new(frame_index, frame_index as f64 * 1000.0 / 30.0)
            .with_joint(JointName::LeftAnkle, 290.0, left_y, 0.9)
            .with_joint(JointName::RightAnkle, 310.0, right_y, 0.9)
    }

    fn jump_frames() -> Vec<KeypointFrame> {
        (0..80)
            .map(|i| {
                let y = if (30..=50).contains(&i) {
                    400.0 - 60.0 * (std::f64::consts::PI * (i as f64 - 30.0) / 20.0).sin()
                } else {
                    400.0
                };
                ankles(i, y, y)
            })
            .collect()
    }

    fn run(frames: &[KeypointFrame]) -> PhaseTimeline {
        let ground = GroundLevel::new(400.0, 30);
        let clock = FrameClock::from_frames(frames, 30.0);
        PhaseClassifier::run(&AnalysisConfig::default(), frames, &ground, &clock)
    }

    #[test]
    fn test_single_jump_cycle() {
        let timeline = run(&jump_frames());
        assert_eq!(timeline.events.len(), 1);
        let event = &timeline.events[0];
        assert!((31..=36).contains(&event.takeoff_frame));
        assert!(event.landing_frame > 45);
        assert_eq!(timeline.takeoff_style_near(event.takeoff_frame), TakeoffStyle::TwoLeg);

        let phases = timeline.phases();
        assert_eq!(phases[0], JumpPhase::Standing);
        assert!(phases.contains(&JumpPhase::Flight));
        assert!(phases.contains(&JumpPhase::Landing));
        assert_eq!(phases[79], JumpPhase::Standing);
    }

    #[test]
    fn test_transitions_are_adjacent() {
        let phases = run(&jump_frames()).phases();
        for pair in phases.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_missing_ankles_hold_state() {
        let mut frames = jump_frames();
        for frame in frames.iter_mut().take(44).skip(40) {
            frame.clear_joint(JointName::LeftAnkle);
            frame.clear_joint(JointName::RightAnkle);
        }
        let timeline = run(&frames);
        assert_eq!(timeline.frames[41].phase, JumpPhase::Flight);
        assert_eq!(timeline.frames[41].airborne, None);
        assert_eq!(timeline.events.len(), 1);
    }

    #[test]
    fn test_quick_rebound_is_a_second_flight() {
        let frames: Vec<KeypointFrame> = (0..90)
            .map(|i| {
                if (30..45).contains(&i) || (50..65).contains(&i) {
                    ankles(i, 300.0, 300.0)
                } else {
                    ankles(i, 400.0, 400.0)
                }
            })
            .collect();
        let timeline = run(&frames);

        assert_eq!(timeline.events.len(), 2);
        assert_eq!(timeline.liftoffs, vec![(30, TakeoffStyle::TwoLeg), (50, TakeoffStyle::TwoLeg)]);
        assert_eq!(timeline.events[1].takeoff_frame, 50);
        assert_eq!(timeline.events[1].landing_frame, 69);
        assert_eq!(timeline.takeoff_style_near(50), TakeoffStyle::TwoLeg);

        let phases = timeline.phases();
        assert_eq!(phases[49], JumpPhase::Landing);
        assert_eq!(phases[50], JumpPhase::Standing);
        assert_eq!(phases[51], JumpPhase::Approach);
        assert_eq!(phases[52], JumpPhase::Takeoff);
        for labels in &timeline.frames[53..69] {
            assert_eq!(labels.phase, JumpPhase::Flight, "frame {}", labels.frame_index);
        }
        for pair in phases.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_state_follows_steps() {
        let config = AnalysisConfig::default();
        let mut classifier = PhaseClassifier::new(&config, 400.0);
        for i in 0..5 {
            classifier.step(&ankles(i, 400.0, 400.0), 400.0, i as f64 * 33.3);
        }
        assert_eq!(classifier.state(), JumpPhase::Standing);
        classifier.step(&ankles(5, 300.0, 300.0), 400.0, 166.7);
        assert_eq!(classifier.state(), JumpPhase::Approach);
        classifier.step(&ankles(6, 300.0, 300.0), 400.0, 200.0);
        assert_eq!(classifier.state(), JumpPhase::Takeoff);
    }

    #[test]
    fn test_one_leg_takeoff() {
        let frames: Vec<KeypointFrame> = (0..60)
            .map(|i| {
                if (20..35).contains(&i) {
                    ankles(i, 300.0, 400.0)
                } else {
                    ankles(i, 400.0, 400.0)
                }
            })
            .collect();
        let timeline = run(&frames);
        assert_eq!(timeline.liftoffs.len(), 1);
        assert_eq!(timeline.liftoffs[0].1, TakeoffStyle::OneLeg);
    }

    #[test]
    fn test_open_flight_is_dropped() {
        let frames: Vec<KeypointFrame> = (0..40)
            .map(|i| if i < 30 { ankles(i, 400.0, 400.0) } else { ankles(i, 300.0, 300.0) })
            .collect();
        let timeline = run(&frames);
        assert!(timeline.events.is_empty());
        assert_eq!(timeline.frames[39].phase, JumpPhase::Flight);
    }

    #[test]
    fn test_crouch_posture_is_advisory() {
        let crouch = ankles(0, 400.0, 400.0)
            .with_joint(JointName::LeftShoulder, 300.0, 250.0, 0.9)
            .with_joint(JointName::LeftHip, 300.0, 320.0, 0.9)
            .with_joint(JointName::LeftKnee, 360.0, 320.0, 0.9)
            .with_joint(JointName::LeftAnkle, 360.0, 400.0, 0.9);
        let config = AnalysisConfig::default();
        let mut classifier = PhaseClassifier::new(&config, 400.0);
        let labels = classifier.step(&crouch, 400.0, 0.0);
        assert_eq!(labels.posture, JumpPhase::Approach);
        assert_eq!(labels.phase, JumpPhase::Standing);
    }
}
