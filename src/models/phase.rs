use serde::{Deserialize, Serialize};

/// Jump phase, one per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JumpPhase {
    Standing,
    Approach,
    Takeoff,
    Flight,
    Landing,
}

impl JumpPhase {
    /// Whether the ankle state machine may move from `self` to `next`.
    ///
    /// Holding the current phase is always allowed.
    pub fn can_transition_to(self, next: JumpPhase) -> bool {
        use JumpPhase::*;

        self == next
            || matches!(
                (self, next),
                (Standing, Approach)
                    | (Approach, Standing)
                    | (Approach, Takeoff)
                    | (Takeoff, Flight)
                    | (Takeoff, Landing)
                    | (Flight, Landing)
                    | (Landing, Standing)
            )
    }

    pub fn is_airborne(self) -> bool {
        matches!(self, JumpPhase::Takeoff | JumpPhase::Flight)
    }
}

impl std::fmt::Display for JumpPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JumpPhase::Standing => write!(f, "standing"),
            JumpPhase::Approach => write!(f, "approach"),
            JumpPhase::Takeoff => write!(f, "takeoff"),
            JumpPhase::Flight => write!(f, "flight"),
            JumpPhase::Landing => write!(f, "landing"),
        }
    }
}

/// Which legs left the ground at liftoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakeoffStyle {
    TwoLeg,
    OneLeg,
    Unknown,
}

impl Default for TakeoffStyle {
    fn default() -> Self {
        TakeoffStyle::Unknown
    }
}

/// Classifier output for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePhase {
    pub frame_index: usize,
    /// Ankle/velocity state machine label, authoritative for event boundaries
    pub phase: JumpPhase,
    /// Joint-angle label, descriptive only
    pub posture: JumpPhase,
    /// Airborne test result, `None` when the ankles were not visible
    pub airborne: Option<bool>,
}
