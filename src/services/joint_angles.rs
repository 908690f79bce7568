//! Joint angle calculations
//!
//! Angles are measured at a vertex joint between the segments to a
//! proximal and a distal joint, in degrees (180° = fully extended).

use crate::models::keypoint::{JointName, Keypoint, KeypointFrame};

/// Guards zero-length segments from coincident detections
const SEGMENT_EPSILON: f64 = 1e-6;

/// Angle at `vertex` between `proximal` and `distal`, in degrees
pub fn vertex_angle(proximal: &Keypoint, vertex: &Keypoint, distal: &Keypoint) -> f64 {
    // Vectors from joint to adjacent points
    let ba = (proximal.x - vertex.x, proximal.y - vertex.y);
    let bc = (distal.x - vertex.x, distal.y - vertex.y);

    let dot_product = ba.0 * bc.0 + ba.1 * bc.1;
    let mag_ba = (ba.0 * ba.0 + ba.1 * ba.1).sqrt();
    let mag_bc = (bc.0 * bc.0 + bc.1 * bc.1).sqrt();

    let cos_angle = dot_product / (mag_ba * mag_bc + SEGMENT_EPSILON);
    cos_angle.clamp(-1.0, 1.0).acos().to_degrees()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Flexion joints used by the classifier and the feature extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointAngleKind {
    /// Shoulder - hip - knee
    Hip,
    /// Hip - knee - ankle
    Knee,
}

impl JointAngleKind {
    /// (proximal, vertex, distal) joints for one side
    pub fn joints(self, side: Side) -> (JointName, JointName, JointName) {
        use JointName::*;

        match (self, side) {
            (Self::Hip, Side::Left) => (LeftShoulder, LeftHip, LeftKnee),
            (Self::Hip, Side::Right) => (RightShoulder, RightHip, RightKnee),
            (Self::Knee, Side::Left) => (LeftHip, LeftKnee, LeftAnkle),
            (Self::Knee, Side::Right) => (RightHip, RightKnee, RightAnkle),
        }
    }
}

/// Angle for one side, if all three joints are visible
pub fn joint_angle(frame: &KeypointFrame, kind: JointAngleKind, side: Side) -> Option<f64> {
    let (a, b, c) = kind.joints(side);
    match (frame.joint(a), frame.joint(b), frame.joint(c)) {
        (Some(kp_a), Some(kp_b), Some(kp_c)) => Some(vertex_angle(&kp_a, &kp_b, &kp_c)),
        _ => None,
    }
}

/// Mean of the visible sides
pub fn mean_joint_angle(frame: &KeypointFrame, kind: JointAngleKind) -> Option<f64> {
    match (
        joint_angle(frame, kind, Side::Left),
        joint_angle(frame, kind, Side::Right),
    ) {
        (Some(left), Some(right)) => Some((left + right) / 2.0),
        (Some(angle), None) | (None, Some(angle)) => Some(angle),
        (None, None) => None,
    }
}
