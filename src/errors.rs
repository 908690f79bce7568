use thiserror::Error;

/// Failure kinds raised while analyzing a keypoint sequence.
///
/// Only `MalformedInput` and `Json` cross the `analyze` boundary. The
/// remaining variants are absorbed into the result: `InsufficientData` and
/// `NoFlightDetected` become an [`AnalysisStatus`](crate::models::AnalysisStatus),
/// `MissingJoint` makes a single feature fall back to its neutral default.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Insufficient data: {frames} usable frames, at least {required} required")]
    InsufficientData { frames: usize, required: usize },

    #[error("No flight segment passed the plausibility filter")]
    NoFlightDetected,

    #[error("Feature {feature} is missing joint {joint}")]
    MissingJoint {
        feature: &'static str,
        joint: &'static str,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AnalysisError {
    /// Whether the pipeline can still emit a well-formed fallback result.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::InsufficientData { .. }
                | AnalysisError::NoFlightDetected
                | AnalysisError::MissingJoint { .. }
        )
    }
}
