use tracing::{debug, info, instrument, warn};

use crate::config::{AnalysisConfig, DEFAULT_FPS};
use crate::errors::AnalysisError;
use crate::models::analysis::{AnalysisInput, AnalysisResult, AnalysisStatus};
use crate::models::biomechanics::BiomechanicsReport;
use crate::models::jump_event::JumpEvent;
use crate::models::keypoint::{JointPair, KeypointFrame};
use crate::models::phase::{JumpPhase, TakeoffStyle};
use crate::services::biomechanics_analyzer::BiomechanicsAnalyzer;
use crate::services::drift_compensator::DriftCompensator;
use crate::services::flight_segmenter::{best_jump, FlightSegmenter, FrameClock};
use crate::services::phase_classifier::PhaseClassifier;
use crate::services::scoring_service::ScoringService;
use crate::services::signal_conditioner::{SignalConditioner, MIN_GROUND_SAMPLES};

/// Jump analysis pipeline: keypoint frames in, jump event and scorecard out
#[derive(Debug, Clone)]
pub struct JumpAnalysisService {
    config: AnalysisConfig,
    conditioner: SignalConditioner,
    segmenter: FlightSegmenter,
    drift: DriftCompensator,
    analyzer: BiomechanicsAnalyzer,
    scorer: ScoringService,
}

impl JumpAnalysisService {
    /// Create a new JumpAnalysisService
    ///
    /// # Example
    /// ```no_run
    /// use jump_analysis::config::AnalysisConfig;
    /// use jump_analysis::models::AnalysisInput;
    /// use jump_analysis::services::JumpAnalysisService;
    ///
    /// let config = AnalysisConfig::from_env().expect("Invalid JUMP_* configuration");
    /// let service = JumpAnalysisService::new(config);
    /// let input = AnalysisInput::from_json(r#"{"frames": [], "fps": 30.0}"#).unwrap();
    /// let result = service.analyze(&input).unwrap();
    /// println!("{}", result.scorecard.overall_score);
    /// ```
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            conditioner: SignalConditioner::new(config.smoothing.clone()),
            segmenter: FlightSegmenter::new(&config),
            drift: DriftCompensator::new(config.drift.clone()),
            analyzer: BiomechanicsAnalyzer::new(),
            scorer: ScoringService::new(config.scoring.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one video's keypoint sequence.
    ///
    /// Noisy or incomplete data never fails: too few frames and clips without
    /// a plausible flight return a zero-confidence result with the matching
    /// status. Only out-of-order frame numbers are rejected.
    #[instrument(skip_all, fields(frames = input.frames.len(), fps = input.fps))]
    pub fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisResult, AnalysisError> {
        let frames = input.frames.as_slice();
        validate_frames(frames)?;

        let fps = effective_fps(input.fps);
        let clock = FrameClock::from_frames(frames, fps);

        if frames.len() < MIN_GROUND_SAMPLES {
            warn!("Only {} frames, returning insufficient-data result", frames.len());
            return Ok(self.insufficient_data(frames, &clock, input.elite_similarity));
        }

        let drift = input
            .camera_motion
            .as_ref()
            .map(|motion| self.drift.cumulative_drift(motion, frames.len()));
        let signal = match self.conditioner.condition_with_drift(
            frames,
            JointPair::Ankles,
            self.config.ground_strategy,
            drift,
        ) {
            Ok(signal) => signal,
            Err(err) if err.is_recoverable() => {
                warn!("Ground level unavailable: {}", err);
                return Ok(self.insufficient_data(frames, &clock, input.elite_similarity));
            }
            Err(err) => return Err(err),
        };

        let ground = &signal.ground;
        let events = self.segmenter.detect(&signal.smoothed, ground, &clock);
        let timeline = PhaseClassifier::run(&self.config, frames, ground, &clock);
        debug!(
            "Phase classifier closed {} flights, segmenter accepted {}",
            timeline.events.len(),
            events.len()
        );

        let best = match best_jump(&events) {
            Some(best) => best.clone(),
            None => {
                warn!("{}", AnalysisError::NoFlightDetected);
                return Ok(self.fallback(
                    AnalysisStatus::NoFlightDetected,
                    frames,
                    &clock,
                    timeline.phases(),
                    input.elite_similarity,
                ));
            }
        };

        let biomechanics = self
            .analyzer
            .analyze(frames, &best, fps)
            .with_elite_similarity(input.elite_similarity);
        let scorecard = self.scorer.compute_scorecard(
            best.height_inches,
            &biomechanics,
            biomechanics.elite_similarity_score,
        );

        info!(
            "Jump at frame {}: {:.1}ms flight, {:.2}in, overall score {}",
            best.takeoff_frame, best.flight_time_ms, best.height_inches, scorecard.overall_score
        );

        Ok(AnalysisResult {
            status: AnalysisStatus::Completed,
            jumps_detected: events.len(),
            takeoff_style: timeline.takeoff_style_near(best.takeoff_frame),
            jump_event: best,
            biomechanics,
            scorecard,
            phases: timeline.phases(),
        })
    }

    /// JSON in, JSON out
    pub fn analyze_json(&self, json: &str) -> Result<String, AnalysisError> {
        let input = AnalysisInput::from_json(json)?;
        self.analyze(&input)?.to_json()
    }

    fn insufficient_data(
        &self,
        frames: &[KeypointFrame],
        clock: &FrameClock,
        elite_similarity: f64,
    ) -> AnalysisResult {
        self.fallback(
            AnalysisStatus::InsufficientData,
            frames,
            clock,
            vec![JumpPhase::Standing; frames.len()],
            elite_similarity,
        )
    }

    /// Well-formed zero-confidence result: height 0, every detector off
    fn fallback(
        &self,
        status: AnalysisStatus,
        frames: &[KeypointFrame],
        clock: &FrameClock,
        phases: Vec<JumpPhase>,
        elite_similarity: f64,
    ) -> AnalysisResult {
        let first_frame = frames.first().map_or(0, |frame| frame.frame_index);
        let last_frame = frames.last().map_or(0, |frame| frame.frame_index);
        let last_ms = clock.timestamps_ms.last().copied().unwrap_or(0.0);

        let biomechanics = BiomechanicsReport::neutral().with_elite_similarity(elite_similarity);
        let scorecard =
            self.scorer
                .compute_scorecard(0.0, &biomechanics, biomechanics.elite_similarity_score);

        AnalysisResult {
            status,
            jumps_detected: 0,
            takeoff_style: TakeoffStyle::Unknown,
            jump_event: JumpEvent::zero_confidence(first_frame, last_frame, last_ms),
            biomechanics,
            scorecard,
            phases,
        }
    }
}

impl Default for JumpAnalysisService {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

/// Frame numbers must be strictly increasing
fn validate_frames(frames: &[KeypointFrame]) -> Result<(), AnalysisError> {
    match frames
        .windows(2)
        .find(|pair| pair[1].frame_index <= pair[0].frame_index)
    {
        Some(pair) => Err(AnalysisError::MalformedInput(format!(
            "frame_index {} follows {}, frames must be strictly increasing",
            pair[1].frame_index, pair[0].frame_index
        ))),
        None => Ok(()),
    }
}

/// Reported frame rate, or the default when unknown
fn effective_fps(fps: f64) -> f64 {
    if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        debug!("Frame rate {} unusable, assuming {}", fps, DEFAULT_FPS);
        DEFAULT_FPS
    }
}
