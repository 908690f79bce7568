//! Vertical-jump detection and biomechanics scoring from pose keypoints.
//!
//! The pipeline is a pure function of one video's keypoint sequence:
//! conditioning, flight segmentation, phase classification, feature
//! extraction and scoring. See [`services::JumpAnalysisService`].

pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use config::AnalysisConfig;
pub use errors::AnalysisError;
pub use models::{AnalysisInput, AnalysisResult, AnalysisStatus};
pub use services::JumpAnalysisService;

/// Analyze a keypoint sequence with the default configuration
pub fn analyze(input: &AnalysisInput) -> Result<AnalysisResult, AnalysisError> {
    JumpAnalysisService::default().analyze(input)
}
