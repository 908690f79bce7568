use tracing::debug;

use crate::config::ScoringConfig;
use crate::models::biomechanics::{clip_similarity, BiomechanicsReport};
use crate::models::scorecard::{ScoreWeights, Scorecard};

/// Highest sub-score
pub const MAX_SCORE: u8 = 99;

const HEEL_PLANT_DETECTED: u8 = 99;
const HEEL_PLANT_MISSING: u8 = 30;
const PENULTIMATE_MISSING: u8 = 20;

/// Scorer service
#[derive(Debug, Clone, Default)]
pub struct ScoringService {
    config: ScoringConfig,
    weights: ScoreWeights,
}

impl ScoringService {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            weights: ScoreWeights::REFERENCE,
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Map a jump height and its technique features onto the 0-99 scorecard.
    ///
    /// Every input has a defined score, including NaN and out-of-range values.
    pub fn compute_scorecard(
        &self,
        height_inches: f64,
        report: &BiomechanicsReport,
        elite_similarity: f64,
    ) -> Scorecard {
        let knee_deviation = (report.knee_bend_angle_at_takeoff - self.config.optimal_knee_angle).abs();
        let knee_penalty = (knee_deviation * self.config.knee_penalty_per_degree).trunc();

        let mut scorecard = Scorecard {
            jump_height_score: to_score(height_inches / self.config.elite_height_inches * 99.0),
            arm_swing_score: unit_score(report.arm_swing_contribution),
            knee_bend_score: to_score(99.0 - knee_penalty),
            penultimate_step_score: if report.penultimate_step_detected {
                unit_score(report.penultimate_step_quality)
            } else {
                PENULTIMATE_MISSING
            },
            heel_plant_score: if report.heel_plant_detected {
                HEEL_PLANT_DETECTED
            } else {
                HEEL_PLANT_MISSING
            },
            hip_drive_score: unit_score(report.peak_hip_height_normalized),
            body_alignment_score: unit_score(report.body_alignment_airborne),
            landing_score: unit_score(report.soft_landing_score),
            elite_similarity_score: to_score(clip_similarity(elite_similarity)),
            overall_score: 0,
        };
        scorecard.overall_score = self.overall(&scorecard);

        debug!(
            "Scorecard for {:.2}in: overall {}",
            height_inches, scorecard.overall_score
        );
        scorecard
    }

    /// Weighted sum of the sub-scores, truncated
    fn overall(&self, scorecard: &Scorecard) -> u8 {
        let w = &self.weights;
        let weighted = [
            (scorecard.jump_height_score, w.jump_height),
            (scorecard.arm_swing_score, w.arm_swing),
            (scorecard.knee_bend_score, w.knee_bend),
            (scorecard.penultimate_step_score, w.penultimate_step),
            (scorecard.heel_plant_score, w.heel_plant),
            (scorecard.hip_drive_score, w.hip_drive),
            (scorecard.body_alignment_score, w.body_alignment),
            (scorecard.landing_score, w.landing),
            (scorecard.elite_similarity_score, w.elite_similarity),
        ]
        .iter()
        .map(|(score, weight)| u32::from(*score) * weight)
        .sum::<u32>();

        let total = w.total().max(1);
        (weighted / total).min(u32::from(MAX_SCORE)) as u8
    }
}

/// Truncate onto 0-99; NaN scores 0
fn to_score(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, f64::from(MAX_SCORE)).trunc() as u8
}

/// Rescale a [0, 1] feature onto 0-99
fn unit_score(value: f64) -> u8 {
    to_score(value * 99.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saturated_report() -> BiomechanicsReport {
        BiomechanicsReport {
            penultimate_step_detected: true,
            penultimate_step_quality: 1.0,
            heel_plant_detected: true,
            knee_bend_angle_at_takeoff: 90.0,
            arm_swing_contribution: 1.0,
            body_alignment_airborne: 1.0,
            peak_hip_height_normalized: 1.0,
            soft_landing_detected: true,
            soft_landing_score: 1.0,
            ..BiomechanicsReport::neutral()
        }
    }

    #[test]
    fn test_saturated_scorecard_is_99() {
        let scorecard = ScoringService::default().compute_scorecard(44.0, &saturated_report(), 99.0);
        for (name, score) in scorecard.sub_scores() {
            assert_eq!(score, 99, "{}", name);
        }
        assert_eq!(scorecard.overall_score, 99);
    }

    #[test]
    fn test_height_scale_clips() {
        let service = ScoringService::default();
        let report = BiomechanicsReport::neutral();
        assert_eq!(service.compute_scorecard(22.0, &report, 0.0).jump_height_score, 49);
        assert_eq!(service.compute_scorecard(60.0, &report, 0.0).jump_height_score, 99);
        assert_eq!(service.compute_scorecard(-5.0, &report, 0.0).jump_height_score, 0);
        assert_eq!(service.compute_scorecard(f64::NAN, &report, 0.0).jump_height_score, 0);
    }

    #[test]
    fn test_knee_penalty() {
        let service = ScoringService::default();
        let mut report = BiomechanicsReport::neutral();
        report.knee_bend_angle_at_takeoff = 110.0;
        assert_eq!(service.compute_scorecard(0.0, &report, 0.0).knee_bend_score, 69);
        report.knee_bend_angle_at_takeoff = 180.0;
        assert_eq!(service.compute_scorecard(0.0, &report, 0.0).knee_bend_score, 0);
    }

    #[test]
    fn test_binary_detectors_are_not_continuous() {
        let service = ScoringService::default();
        let mut report = BiomechanicsReport::neutral();
        let scorecard = service.compute_scorecard(0.0, &report, 0.0);
        assert_eq!(scorecard.penultimate_step_score, 20);
        assert_eq!(scorecard.heel_plant_score, 30);

        report.penultimate_step_detected = true;
        report.penultimate_step_quality = 0.8;
        report.heel_plant_detected = true;
        let scorecard = service.compute_scorecard(0.0, &report, 0.0);
        assert_eq!(scorecard.penultimate_step_score, 79);
        assert_eq!(scorecard.heel_plant_score, 99);
    }

    #[test]
    fn test_neutral_overall() {
        // 0*30 + 0*10 + 99*10 + 20*10 + 30*5 + 49*10 + 49*5 + 49*5 + 0*15 = 2320
        let scorecard = ScoringService::default().compute_scorecard(0.0, &BiomechanicsReport::neutral(), 0.0);
        assert_eq!(scorecard.overall_score, 23);
    }

    #[test]
    fn test_custom_weights() {
        let height_only = ScoreWeights {
            jump_height: 1,
            arm_swing: 0,
            knee_bend: 0,
            penultimate_step: 0,
            heel_plant: 0,
            hip_drive: 0,
            body_alignment: 0,
            landing: 0,
            elite_similarity: 0,
        };
        let service = ScoringService::default().with_weights(height_only);
        let scorecard = service.compute_scorecard(22.0, &BiomechanicsReport::neutral(), 0.0);
        assert_eq!(scorecard.overall_score, scorecard.jump_height_score);
        assert_eq!(scorecard.overall_score, 49);
    }
}
