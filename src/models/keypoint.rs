//! Keypoint frames supplied by the pose extraction stage
//!
//! A frame holds the 17 COCO joints in a fixed array indexed by
//! [`JointName`]. Joints the extractor did not detect are stored as `None`,
//! so a missing detection is never confused with a coordinate of zero.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::TryFrom;

use crate::errors::AnalysisError;

/// Number of joints in a frame
pub const JOINT_COUNT: usize = 17;

/// COCO joint names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl JointName {
    /// All joints in index order
    pub const ALL: [JointName; JOINT_COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// Get joint name as used by the extractor
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// Look a joint up by its extractor name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|joint| joint.name() == name)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Left/right joint pairs reduced to a single signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointPair {
    Shoulders,
    Elbows,
    Wrists,
    Hips,
    Knees,
    Ankles,
}

impl JointPair {
    pub fn left(self) -> JointName {
        match self {
            Self::Shoulders => JointName::LeftShoulder,
            Self::Elbows => JointName::LeftElbow,
            Self::Wrists => JointName::LeftWrist,
            Self::Hips => JointName::LeftHip,
            Self::Knees => JointName::LeftKnee,
            Self::Ankles => JointName::LeftAnkle,
        }
    }

    pub fn right(self) -> JointName {
        match self {
            Self::Shoulders => JointName::RightShoulder,
            Self::Elbows => JointName::RightElbow,
            Self::Wrists => JointName::RightWrist,
            Self::Hips => JointName::RightHip,
            Self::Knees => JointName::RightKnee,
            Self::Ankles => JointName::RightAnkle,
        }
    }
}

/// A single detected joint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// X coordinate (pixels or normalized 0-1)
    pub x: f64,
    /// Y coordinate, increasing downward
    pub y: f64,
    /// Detection confidence (0-1)
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    /// The extractor encodes "not detected" as (0, 0, 0)
    pub fn is_visible(&self) -> bool {
        self.confidence > 0.0 && self.x > 0.0 && self.y > 0.0
    }

    /// Calculate Euclidean distance to another keypoint
    pub fn distance_to(&self, other: &Keypoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Keypoint) -> (f64, f64) {
        ((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Scale pixel coordinates into the [0, 1] range
    pub fn normalized(&self, width: f64, height: f64) -> Self {
        Self {
            x: self.x / width,
            y: self.y / height,
            confidence: self.confidence,
        }
    }
}

/// One video frame of joint detections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawKeypointFrame", into = "RawKeypointFrame")]
pub struct KeypointFrame {
    /// Frame number in the source video
    pub frame_index: usize,
    /// Frame timestamp in milliseconds
    pub timestamp_ms: f64,
    joints: [Option<Keypoint>; JOINT_COUNT],
}

impl KeypointFrame {
    /// Create a frame with no detected joints
    pub fn new(frame_index: usize, timestamp_ms: f64) -> Self {
        Self {
            frame_index,
            timestamp_ms,
            joints: [None; JOINT_COUNT],
        }
    }

    /// Builder-style joint assignment
    pub fn with_joint(mut self, joint: JointName, x: f64, y: f64, confidence: f64) -> Self {
        self.set_joint(joint, Keypoint::new(x, y, confidence));
        self
    }

    /// Store a detection; invisible detections are stored as missing
    pub fn set_joint(&mut self, joint: JointName, keypoint: Keypoint) {
        self.joints[joint.index()] = keypoint.is_visible().then_some(keypoint);
    }

    pub fn clear_joint(&mut self, joint: JointName) {
        self.joints[joint.index()] = None;
    }

    /// Visible detection for a joint
    pub fn joint(&self, joint: JointName) -> Option<Keypoint> {
        self.joints[joint.index()]
    }

    pub fn visible_count(&self) -> usize {
        self.joints.iter().filter(|joint| joint.is_some()).count()
    }

    /// Vertical coordinate of a joint pair: the mean when both sides are
    /// visible, the visible side otherwise
    pub fn pair_y(&self, pair: JointPair) -> Option<f64> {
        self.pair_point(pair).map(|(_, y)| y)
    }

    /// Horizontal coordinate of a joint pair, reduced like [`Self::pair_y`]
    pub fn pair_x(&self, pair: JointPair) -> Option<f64> {
        self.pair_point(pair).map(|(x, _)| x)
    }

    pub fn pair_point(&self, pair: JointPair) -> Option<(f64, f64)> {
        match (self.joint(pair.left()), self.joint(pair.right())) {
            (Some(left), Some(right)) => Some(left.midpoint(&right)),
            (Some(single), None) | (None, Some(single)) => Some((single.x, single.y)),
            (None, None) => None,
        }
    }

    /// Copy of the frame with pixel coordinates scaled into [0, 1]
    pub fn normalized(&self, width: f64, height: f64) -> Self {
        let mut frame = Self::new(self.frame_index, self.timestamp_ms);
        for joint in JointName::ALL {
            if let Some(keypoint) = self.joint(joint) {
                frame.set_joint(joint, keypoint.normalized(width, height));
            }
        }
        frame
    }
}

/// Wire shape of a frame: `joints` maps extractor names to `[x, y, confidence]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawKeypointFrame {
    pub frame_index: usize,
    pub timestamp_ms: f64,
    pub joints: BTreeMap<String, [f64; 3]>,
}

impl TryFrom<RawKeypointFrame> for KeypointFrame {
    type Error = AnalysisError;

    fn try_from(raw: RawKeypointFrame) -> Result<Self, Self::Error> {
        if !raw.timestamp_ms.is_finite() {
            return Err(AnalysisError::MalformedInput(format!(
                "frame {} has a non-finite timestamp",
                raw.frame_index
            )));
        }

        let mut frame = KeypointFrame::new(raw.frame_index, raw.timestamp_ms);
        for (name, [x, y, confidence]) in raw.joints {
            let joint = JointName::from_name(&name).ok_or_else(|| {
                AnalysisError::MalformedInput(format!(
                    "frame {} has unknown joint {:?}",
                    raw.frame_index, name
                ))
            })?;
            if !(x.is_finite() && y.is_finite() && confidence.is_finite()) {
                return Err(AnalysisError::MalformedInput(format!(
                    "frame {} joint {} has non-finite values",
                    raw.frame_index, name
                )));
            }
            frame.set_joint(joint, Keypoint::new(x, y, confidence));
        }
        Ok(frame)
    }
}

impl From<KeypointFrame> for RawKeypointFrame {
    fn from(frame: KeypointFrame) -> Self {
        let joints = JointName::ALL
            .iter()
            .filter_map(|joint| {
                frame
                    .joint(*joint)
                    .map(|kp| (joint.name().to_string(), [kp.x, kp.y, kp.confidence]))
            })
            .collect();
        Self {
            frame_index: frame.frame_index,
            timestamp_ms: frame.timestamp_ms,
            joints,
        }
    }
}

/// Evenly spaced selection of at most `max_count` frames, for display
pub fn subsample(frames: &[KeypointFrame], max_count: usize) -> Vec<KeypointFrame> {
    if max_count == 0 {
        return Vec::new();
    }
    if frames.len() <= max_count {
        return frames.to_vec();
    }
    let step = (frames.len() + max_count - 1) / max_count;
    frames.iter().step_by(step).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_visibility() {
        assert!(Keypoint::new(100.0, 200.0, 0.9).is_visible());
        assert!(!Keypoint::new(0.0, 0.0, 0.0).is_visible());
        assert!(!Keypoint::new(100.0, 200.0, 0.0).is_visible());
        assert!(!Keypoint::new(0.0, 200.0, 0.9).is_visible());
    }

    #[test]
    fn test_keypoint_distance() {
        let a = Keypoint::new(1.0, 1.0, 1.0);
        let b = Keypoint::new(4.0, 5.0, 1.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_joint_names() {
        assert_eq!(JointName::Nose.name(), "nose");
        assert_eq!(JointName::from_name("right_ankle"), Some(JointName::RightAnkle));
        assert_eq!(JointName::from_name("left_heel"), None);
        for (idx, joint) in JointName::ALL.iter().enumerate() {
            assert_eq!(joint.index(), idx);
        }
    }

    #[test]
    fn test_undetected_joint_stored_as_missing() {
        let frame = KeypointFrame::new(0, 0.0)
            .with_joint(JointName::LeftAnkle, 0.0, 0.0, 0.0)
            .with_joint(JointName::RightAnkle, 310.0, 400.0, 0.8);
        assert!(frame.joint(JointName::LeftAnkle).is_none());
        assert_eq!(frame.visible_count(), 1);
    }

    #[test]
    fn test_pair_reduction() {
        let both = KeypointFrame::new(0, 0.0)
            .with_joint(JointName::LeftAnkle, 300.0, 400.0, 0.9)
            .with_joint(JointName::RightAnkle, 320.0, 410.0, 0.9);
        assert_eq!(both.pair_y(JointPair::Ankles), Some(405.0));
        assert_eq!(both.pair_x(JointPair::Ankles), Some(310.0));

        let one = KeypointFrame::new(1, 33.3).with_joint(JointName::RightAnkle, 320.0, 410.0, 0.9);
        assert_eq!(one.pair_y(JointPair::Ankles), Some(410.0));

        let none = KeypointFrame::new(2, 66.6);
        assert_eq!(none.pair_y(JointPair::Ankles), None);
    }

    #[test]
    fn test_frame_json_round_trip() {
        let json = r#"{"frame_index": 3, "timestamp_ms": 100.0,
            "joints": {"left_ankle": [300.0, 400.0, 0.9], "nose": [0.0, 0.0, 0.0]}}"#;
        let frame: KeypointFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.frame_index, 3);
        assert!(frame.joint(JointName::LeftAnkle).is_some());
        assert!(frame.joint(JointName::Nose).is_none());

        let encoded = serde_json::to_string(&frame).unwrap();
        let decoded: KeypointFrame = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_frame_without_joints_is_rejected() {
        let json = r#"{"frame_index": 3, "timestamp_ms": 100.0}"#;
        assert!(serde_json::from_str::<KeypointFrame>(json).is_err());
    }

    #[test]
    fn test_unknown_joint_is_rejected() {
        let json = r#"{"frame_index": 3, "timestamp_ms": 100.0,
            "joints": {"left_heel": [300.0, 400.0, 0.9]}}"#;
        assert!(serde_json::from_str::<KeypointFrame>(json).is_err());
    }

    #[test]
    fn test_subsample() {
        let frames: Vec<KeypointFrame> = (0..10)
            .map(|i| KeypointFrame::new(i, i as f64 * 33.3))
            .collect();
        assert_eq!(subsample(&frames, 20).len(), 10);
        let picked = subsample(&frames, 4);
        assert_eq!(picked.len(), 4);
        assert_eq!(picked[1].frame_index, 3);
        assert!(subsample(&frames, 0).is_empty());
    }

    #[test]
    fn test_frame_normalization() {
        let frame = KeypointFrame::new(0, 0.0).with_joint(JointName::Nose, 640.0, 480.0, 0.9);
        let normalized = frame.normalized(1280.0, 960.0);
        let nose = normalized.joint(JointName::Nose).unwrap();
        assert!((nose.x - 0.5).abs() < 1e-9);
        assert!((nose.y - 0.5).abs() < 1e-9);
    }
}
