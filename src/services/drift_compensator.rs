use tracing::debug;

use crate::config::DriftConfig;
use crate::models::analysis::FeatureTrack;

/// Estimates vertical camera motion from static background tracks
#[derive(Debug, Clone, Default)]
pub struct DriftCompensator {
    config: DriftConfig,
}

impl DriftCompensator {
    pub fn new(config: DriftConfig) -> Self {
        Self { config }
    }

    /// Vertical background shift between a frame and the one before it.
    ///
    /// Too few tracks means tracking failed and the shift is taken as 0.
    pub fn frame_drift(&self, tracks: &[FeatureTrack]) -> f64 {
        if tracks.len() < self.config.min_tracked_points {
            return 0.0;
        }
        let shifts: Vec<f64> = tracks.iter().map(FeatureTrack::vertical_shift).collect();
        median(&shifts)
    }

    /// Running drift for `frame_count` frames; frames without tracks add nothing
    pub fn cumulative_drift(&self, motion: &[Vec<FeatureTrack>], frame_count: usize) -> Vec<f64> {
        let mut total = 0.0;
        let mut untracked = 0;
        let drift = (0..frame_count)
            .map(|i| {
                let tracks = motion.get(i).map(Vec::as_slice).unwrap_or(&[]);
                if tracks.len() < self.config.min_tracked_points {
                    untracked += 1;
                }
                total += self.frame_drift(tracks);
                total
            })
            .collect();

        debug!(
            "Camera drift over {} frames: {:.3} ({} frames without enough tracks)",
            frame_count, total, untracked
        );
        drift
    }
}

fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(shifts: &[f64]) -> Vec<FeatureTrack> {
        shifts
            .iter()
            .map(|shift| FeatureTrack {
                prev_y: 100.0,
                curr_y: 100.0 + shift,
            })
            .collect()
    }

    #[test]
    fn test_median_shift_ignores_outlier() {
        let compensator = DriftCompensator::default();
        let shifts = [1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 40.0];
        assert_eq!(compensator.frame_drift(&tracks(&shifts)), 1.0);
    }

    #[test]
    fn test_too_few_tracks_is_zero() {
        let compensator = DriftCompensator::default();
        assert_eq!(compensator.frame_drift(&tracks(&[5.0; 7])), 0.0);
        assert_eq!(compensator.frame_drift(&[]), 0.0);
    }

    #[test]
    fn test_cumulative_drift_pads_missing_frames() {
        let compensator = DriftCompensator::default();
        let motion = vec![Vec::new(), tracks(&[2.0; 8]), tracks(&[-0.5; 10])];
        assert_eq!(
            compensator.cumulative_drift(&motion, 5),
            vec![0.0, 2.0, 1.5, 1.5, 1.5]
        );
    }
}
