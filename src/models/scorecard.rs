use serde::{Deserialize, Serialize};

/// Overall-score weights in percent; they add up to 100
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    pub jump_height: u32,
    pub arm_swing: u32,
    pub knee_bend: u32,
    pub penultimate_step: u32,
    pub heel_plant: u32,
    pub hip_drive: u32,
    pub body_alignment: u32,
    pub landing: u32,
    pub elite_similarity: u32,
}

impl ScoreWeights {
    pub const REFERENCE: ScoreWeights = ScoreWeights {
        jump_height: 30,
        arm_swing: 10,
        knee_bend: 10,
        penultimate_step: 10,
        heel_plant: 5,
        hip_drive: 10,
        body_alignment: 5,
        landing: 5,
        elite_similarity: 15,
    };

    pub fn total(&self) -> u32 {
        self.jump_height
            + self.arm_swing
            + self.knee_bend
            + self.penultimate_step
            + self.heel_plant
            + self.hip_drive
            + self.body_alignment
            + self.landing
            + self.elite_similarity
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// 0-99 sub-scores and the weighted overall score for one jump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorecard {
    pub jump_height_score: u8,
    pub arm_swing_score: u8,
    pub knee_bend_score: u8,
    pub penultimate_step_score: u8,
    pub heel_plant_score: u8,
    pub hip_drive_score: u8,
    pub body_alignment_score: u8,
    pub landing_score: u8,
    pub elite_similarity_score: u8,
    pub overall_score: u8,
}

impl Scorecard {
    /// Sub-scores by name, in weight order
    pub fn sub_scores(&self) -> [(&'static str, u8); 9] {
        [
            ("jump_height_score", self.jump_height_score),
            ("arm_swing_score", self.arm_swing_score),
            ("knee_bend_score", self.knee_bend_score),
            ("penultimate_step_score", self.penultimate_step_score),
            ("heel_plant_score", self.heel_plant_score),
            ("hip_drive_score", self.hip_drive_score),
            ("body_alignment_score", self.body_alignment_score),
            ("landing_score", self.landing_score),
            ("elite_similarity_score", self.elite_similarity_score),
        ]
    }
}
