use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;
use crate::models::biomechanics::BiomechanicsReport;
use crate::models::jump_event::JumpEvent;
use crate::models::keypoint::KeypointFrame;
use crate::models::phase::{JumpPhase, TakeoffStyle};
use crate::models::scorecard::Scorecard;

/// A static background feature tracked between two consecutive frames
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureTrack {
    pub prev_y: f64,
    pub curr_y: f64,
}

impl FeatureTrack {
    pub fn vertical_shift(&self) -> f64 {
        self.curr_y - self.prev_y
    }
}

/// Everything the pipeline needs for one video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// Frames ordered by `frame_index`
    pub frames: Vec<KeypointFrame>,
    /// Video frame rate; 0 means unknown
    #[serde(default)]
    pub fps: f64,
    /// Score from the external embedding-similarity service, 0-99
    #[serde(default)]
    pub elite_similarity: f64,
    /// Optional background tracks per frame for camera-drift compensation
    #[serde(default)]
    pub camera_motion: Option<Vec<Vec<FeatureTrack>>>,
}

impl AnalysisInput {
    pub fn new(frames: Vec<KeypointFrame>, fps: f64) -> Self {
        Self {
            frames,
            fps,
            elite_similarity: 0.0,
            camera_motion: None,
        }
    }

    pub fn with_elite_similarity(mut self, elite_similarity: f64) -> Self {
        self.elite_similarity = elite_similarity;
        self
    }

    pub fn with_camera_motion(mut self, camera_motion: Vec<Vec<FeatureTrack>>) -> Self {
        self.camera_motion = Some(camera_motion);
        self
    }

    /// Parse the JSON input contract
    pub fn from_json(json: &str) -> Result<Self, AnalysisError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Outcome of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed,
    InsufficientData,
    NoFlightDetected,
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisStatus::Completed => write!(f, "completed"),
            AnalysisStatus::InsufficientData => write!(f, "insufficient_data"),
            AnalysisStatus::NoFlightDetected => write!(f, "no_flight_detected"),
        }
    }
}

/// Complete analysis result for one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub status: AnalysisStatus,
    /// Number of flights that passed the plausibility filter
    pub jumps_detected: usize,
    pub takeoff_style: TakeoffStyle,
    /// Best jump, or a zero-confidence placeholder
    pub jump_event: JumpEvent,
    pub biomechanics: BiomechanicsReport,
    pub scorecard: Scorecard,
    /// Ankle state machine label per frame
    pub phases: Vec<JumpPhase>,
}

impl AnalysisResult {
    pub fn is_completed(&self) -> bool {
        self.status == AnalysisStatus::Completed
    }

    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string(self)?)
    }
}
