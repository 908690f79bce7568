// Pipeline stages, leaf-first

pub mod joint_angles;
pub mod signal_conditioner;
pub mod drift_compensator;
pub mod flight_segmenter;
pub mod phase_classifier;
pub mod biomechanics_analyzer;
pub mod scoring_service;
pub mod jump_analysis_service;

pub use signal_conditioner::SignalConditioner;
pub use drift_compensator::DriftCompensator;
pub use flight_segmenter::FlightSegmenter;
pub use phase_classifier::{PhaseClassifier, PhaseTimeline};
pub use biomechanics_analyzer::BiomechanicsAnalyzer;
pub use scoring_service::ScoringService;
pub use jump_analysis_service::JumpAnalysisService;
