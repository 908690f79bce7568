#![allow(dead_code)]

use jump_analysis::models::{FeatureTrack, JointName, KeypointFrame};
use std::f64::consts::PI;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test logging
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("jump_analysis=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Standing pose joints at pixel coordinates, ankles on y = 400
const STANDING_POSE: [(JointName, f64, f64); 17] = [
    (JointName::Nose, 300.0, 100.0),
    (JointName::LeftEye, 295.0, 95.0),
    (JointName::RightEye, 305.0, 95.0),
    (JointName::LeftEar, 288.0, 100.0),
    (JointName::RightEar, 312.0, 100.0),
    (JointName::LeftShoulder, 280.0, 160.0),
    (JointName::RightShoulder, 320.0, 160.0),
    (JointName::LeftElbow, 275.0, 200.0),
    (JointName::RightElbow, 325.0, 200.0),
    (JointName::LeftWrist, 272.0, 235.0),
    (JointName::RightWrist, 328.0, 235.0),
    (JointName::LeftHip, 290.0, 235.0),
    (JointName::RightHip, 310.0, 235.0),
    (JointName::LeftKnee, 290.0, 320.0),
    (JointName::RightKnee, 310.0, 320.0),
    (JointName::LeftAnkle, 290.0, 400.0),
    (JointName::RightAnkle, 310.0, 400.0),
];

/// Generates synthetic keypoint sequences
pub struct MockPoseGenerator;

impl MockPoseGenerator {
    /// Whole-body standing pose shifted vertically by `dy`
    pub fn standing(frame_index: usize, fps: f64, dy: f64) -> KeypointFrame {
        STANDING_POSE.iter().fold(
            KeypointFrame::new(frame_index, frame_index as f64 * 1000.0 / fps),
            |frame, &(joint, x, y)| frame.with_joint(joint, x, y + dy, 0.92),
        )
    }

    /// Vertical offset of a bell-shaped jump from `start` to `end`, peaking at `rise` pixels
    pub fn bell(frame: usize, start: usize, end: usize, rise: f64) -> f64 {
        if frame < start || frame > end {
            return 0.0;
        }
        let phase = (frame - start) as f64 / (end - start) as f64;
        -rise * (PI * phase).sin()
    }

    /// 30 still frames, a 60px jump over frames 30-50, then standing again
    pub fn single_jump(total: usize, fps: f64) -> Vec<KeypointFrame> {
        (0..total)
            .map(|i| Self::standing(i, fps, Self::bell(i, 30, 50, 60.0)))
            .collect()
    }

    /// Subject never moves
    pub fn still(total: usize, fps: f64) -> Vec<KeypointFrame> {
        (0..total).map(|i| Self::standing(i, fps, 0.0)).collect()
    }

    /// A rigid rise of `rise` pixels held for `frames` frames starting at `start`
    pub fn square_hop(total: usize, fps: f64, start: usize, frames: usize, rise: f64) -> Vec<KeypointFrame> {
        (0..total)
            .map(|i| {
                let dy = if (start..start + frames).contains(&i) { -rise } else { 0.0 };
                Self::standing(i, fps, dy)
            })
            .collect()
    }

    /// Background tracks for a camera moving every tracked point by `shift` pixels per frame
    pub fn camera_pan(total: usize, shift: f64, points: usize) -> Vec<Vec<FeatureTrack>> {
        (0..total)
            .map(|i| {
                if i == 0 {
                    return Vec::new();
                }
                (0..points)
                    .map(|p| {
                        let prev_y = 50.0 + p as f64 * 10.0 + (i - 1) as f64 * shift;
                        FeatureTrack {
                            prev_y,
                            curr_y: prev_y + shift,
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
