use serde::{Deserialize, Serialize};

/// Technique features for one jump.
///
/// Every field has a documented neutral value used when the joints a
/// feature needs were never visible in its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomechanicsReport {
    /// Braking step detected in the approach (neutral: false)
    pub penultimate_step_detected: bool,
    /// Step quality 0-1, only non-zero when detected (neutral: 0.0)
    pub penultimate_step_quality: f64,
    /// Mean absolute horizontal hip displacement per frame (neutral: 0.0)
    pub approach_velocity: f64,
    /// Approach momentum carried into the jump, 0.3-0.9 (neutral: 0.5)
    pub horizontal_momentum_utilized: f64,

    /// Plant foot tracked through the approach (neutral: false)
    pub heel_plant_detected: bool,
    /// Heel-to-toe transition time in seconds (neutral: 0.0)
    pub heel_to_toe_transition: f64,
    /// Most flexed knee angle before takeoff in degrees (neutral: 90.0)
    pub knee_bend_angle_at_takeoff: f64,
    /// Last hip angle before takeoff in degrees (neutral: 45.0)
    pub hip_flexion_at_takeoff: f64,
    /// Wrist travel before takeoff, 0-1 (neutral: 0.0)
    pub arm_swing_contribution: f64,

    /// Upright posture while airborne, 0-1 (neutral: 0.5)
    pub body_alignment_airborne: f64,
    /// Hip rise from standing to apex, 0-1 (neutral: 0.5)
    pub peak_hip_height_normalized: f64,

    /// Ankle height agreement at touchdown, 0-1 (neutral: 0.5)
    pub landing_symmetry: f64,
    /// Knee flexed by more than 15° after touchdown (neutral: false)
    pub soft_landing_detected: bool,
    /// 1.0 absorbing, 0.4 rigid (neutral: 0.5)
    pub soft_landing_score: f64,

    /// Externally supplied similarity to elite jumps, 0-99
    pub elite_similarity_score: f64,
}

impl BiomechanicsReport {
    /// Report with every feature at its neutral value and every flag off
    pub fn neutral() -> Self {
        Self {
            penultimate_step_detected: false,
            penultimate_step_quality: 0.0,
            approach_velocity: 0.0,
            horizontal_momentum_utilized: 0.5,
            heel_plant_detected: false,
            heel_to_toe_transition: 0.0,
            knee_bend_angle_at_takeoff: 90.0,
            hip_flexion_at_takeoff: 45.0,
            arm_swing_contribution: 0.0,
            body_alignment_airborne: 0.5,
            peak_hip_height_normalized: 0.5,
            landing_symmetry: 0.5,
            soft_landing_detected: false,
            soft_landing_score: 0.5,
            elite_similarity_score: 0.0,
        }
    }

    /// Attach the external similarity score, clipped to 0-99
    pub fn with_elite_similarity(mut self, score: f64) -> Self {
        self.elite_similarity_score = clip_similarity(score);
        self
    }
}

impl Default for BiomechanicsReport {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Clip an external similarity score to 0-99; non-finite values become 0
pub fn clip_similarity(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 99.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_flags_are_off() {
        let report = BiomechanicsReport::neutral();
        assert!(!report.penultimate_step_detected);
        assert!(!report.heel_plant_detected);
        assert!(!report.soft_landing_detected);
        assert_eq!(report.knee_bend_angle_at_takeoff, 90.0);
    }

    #[test]
    fn test_elite_similarity_clipped() {
        assert_eq!(BiomechanicsReport::neutral().with_elite_similarity(150.0).elite_similarity_score, 99.0);
        assert_eq!(BiomechanicsReport::neutral().with_elite_similarity(-3.0).elite_similarity_score, 0.0);
        assert_eq!(clip_similarity(f64::NAN), 0.0);
    }
}
