//! Signal Conditioner
//!
//! Turns per-frame joint detections into a conditioned vertical signal:
//! - Left/right visibility reduction (missing stays `None`, never zero)
//! - Causal trailing moving average for the frame-by-frame state machine
//! - Savitzky-Golay smoothing for retrospective height computation
//! - Ground-level estimation (calibration window or histogram mode)

use nalgebra::DMatrix;
use ndarray::Array2;
use statrs::statistics::Statistics;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::config::{GroundStrategy, SmoothingConfig};
use crate::errors::AnalysisError;
use crate::models::keypoint::{JointPair, KeypointFrame};

/// Frames needed before a ground level can be estimated
pub const MIN_GROUND_SAMPLES: usize = 2;

/// Vertical coordinate of a joint pair for every frame
pub fn vertical_series(frames: &[KeypointFrame], pair: JointPair) -> Vec<Option<f64>> {
    frames.iter().map(|frame| frame.pair_y(pair)).collect()
}

/// Frame timestamps, rebuilt from frame numbers when the supplied ones are
/// not strictly increasing
pub fn frame_timestamps(frames: &[KeypointFrame], fps: f64) -> Vec<f64> {
    let increasing = frames
        .windows(2)
        .all(|pair| pair[1].timestamp_ms > pair[0].timestamp_ms);
    if increasing {
        return frames.iter().map(|frame| frame.timestamp_ms).collect();
    }

    warn!(
        "Frame timestamps are not strictly increasing, deriving them from frame numbers at {} fps",
        fps
    );
    frames
        .iter()
        .map(|frame| frame.frame_index as f64 * 1000.0 / fps)
        .collect()
}

/// Trailing moving average over the last `window` observed values
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: usize,
    buffer: VecDeque<f64>,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            buffer: VecDeque::with_capacity(window),
        }
    }

    /// Add a sample and return the current average; a missing sample yields
    /// `None` and leaves the buffer untouched
    pub fn push(&mut self, value: Option<f64>) -> Option<f64> {
        let value = value?;
        self.buffer.push_back(value);
        while self.buffer.len() > self.window {
            self.buffer.pop_front();
        }
        Some(self.buffer.iter().sum::<f64>() / self.buffer.len() as f64)
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

/// Causal moving average of a whole series
pub fn moving_average(series: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut average = MovingAverage::new(window);
    series.iter().map(|value| average.push(*value)).collect()
}

/// Savitzky-Golay smoothing with polynomial fits at both edges.
///
/// Returns `None` when the window cannot be formed: even window, window not
/// larger than the order, or fewer samples than the window.
pub fn savitzky_golay(values: &[f64], window: usize, order: usize) -> Option<Vec<f64>> {
    if window % 2 == 0 || window <= order || values.len() < window {
        return None;
    }

    let half = window / 2;
    let design = Array2::from_shape_fn((window, order + 1), |(i, k)| {
        (i as f64 - half as f64).powi(k as i32)
    });
    let normal = design.t().dot(&design);
    let inverse = invert(&normal)?;
    // Row r of the hat matrix evaluates the local fit at window position r
    let hat = design.dot(&inverse).dot(&design.t());

    let n = values.len();
    let smoothed = (0..n)
        .map(|i| {
            let (start, row) = if i < half {
                (0, i)
            } else if i + half >= n {
                (n - window, i - (n - window))
            } else {
                (i - half, half)
            };
            (0..window).map(|j| hat[[row, j]] * values[start + j]).sum()
        })
        .collect();

    Some(smoothed)
}

/// Inverse of the normal matrix of the local polynomial fit
fn invert(matrix: &Array2<f64>) -> Option<Array2<f64>> {
    let (rows, cols) = matrix.dim();
    let inverse = DMatrix::from_fn(rows, cols, |r, c| matrix[[r, c]]).try_inverse()?;
    Some(Array2::from_shape_fn((rows, cols), |(r, c)| inverse[(r, c)]))
}

/// Linear interpolation over missing samples, holding the edges
fn fill_gaps(series: &[Option<f64>]) -> Option<Vec<f64>> {
    let known: Vec<(usize, f64)> = series
        .iter()
        .enumerate()
        .filter_map(|(i, value)| value.map(|v| (i, v)))
        .collect();
    if known.is_empty() {
        return None;
    }

    let mut next = 0;
    let filled = (0..series.len())
        .map(|i| {
            while next < known.len() && known[next].0 < i {
                next += 1;
            }
            match (next.checked_sub(1).map(|p| known[p]), known.get(next).copied()) {
                (_, Some((idx, value))) if idx == i => value,
                (Some((i0, v0)), Some((i1, v1))) => {
                    v0 + (v1 - v0) * (i - i0) as f64 / (i1 - i0) as f64
                }
                (Some((_, v0)), None) => v0,
                (None, Some((_, v1))) => v1,
                (None, None) => unreachable!("known is non-empty"),
            }
        })
        .collect();

    Some(filled)
}

/// Most populated bin center of a histogram over the sample range
pub fn histogram_mode(samples: &[f64], bins: usize) -> f64 {
    let bins = bins.max(1);
    let (mut low, mut high) = samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if low == high {
        low -= 0.5;
        high += 0.5;
    }

    let width = (high - low) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &sample in samples {
        let bin = (((sample - low) / width).floor() as usize).min(bins - 1);
        counts[bin] += 1;
    }

    let mut peak = 0;
    for (bin, &count) in counts.iter().enumerate() {
        if count > counts[peak] {
            peak = bin;
        }
    }

    low + width * (peak as f64 + 0.5)
}

/// Standing-ankle baseline, optionally shifted per frame by camera drift
#[derive(Debug, Clone, PartialEq)]
pub struct GroundLevel {
    pub value: f64,
    /// Samples the estimate was built from
    pub samples: usize,
    drift: Vec<f64>,
}

impl GroundLevel {
    pub fn new(value: f64, samples: usize) -> Self {
        Self {
            value,
            samples,
            drift: Vec::new(),
        }
    }

    /// Attach cumulative per-frame drift
    pub fn with_drift(mut self, cumulative_drift: Vec<f64>) -> Self {
        self.drift = cumulative_drift;
        self
    }

    /// Ground level at a sequence position
    pub fn at(&self, position: usize) -> f64 {
        let drift = self
            .drift
            .get(position)
            .or_else(|| self.drift.last())
            .copied()
            .unwrap_or(0.0);
        self.value + drift
    }
}

/// Output of conditioning one joint pair
#[derive(Debug, Clone)]
pub struct ConditionedSignal {
    pub raw: Vec<Option<f64>>,
    pub smoothed: Vec<Option<f64>>,
    pub ground: GroundLevel,
}

/// Signal conditioner service
#[derive(Debug, Clone, Default)]
pub struct SignalConditioner {
    smoothing: SmoothingConfig,
}

impl SignalConditioner {
    pub fn new(smoothing: SmoothingConfig) -> Self {
        Self { smoothing }
    }

    /// Retrospective smoothing: Savitzky-Golay when the window can be formed,
    /// the trailing moving average otherwise. Missing samples stay missing.
    pub fn smooth_offline(&self, series: &[Option<f64>]) -> Vec<Option<f64>> {
        let filled = match fill_gaps(series) {
            Some(filled) => filled,
            None => return vec![None; series.len()],
        };

        let n = filled.len();
        let longest_odd = if n % 2 == 0 { n.saturating_sub(1) } else { n };
        let window = self.smoothing.savgol_window.min(longest_odd);

        match savitzky_golay(&filled, window, self.smoothing.savgol_order) {
            Some(smoothed) => series
                .iter()
                .zip(smoothed)
                .map(|(original, value)| original.map(|_| value))
                .collect(),
            None => {
                debug!(
                    "Savitzky-Golay window {} unusable for {} samples, using moving average",
                    window, n
                );
                moving_average(series, self.smoothing.moving_average_window)
            }
        }
    }

    /// Estimate the ground level from a smoothed series
    pub fn estimate_ground(
        &self,
        smoothed: &[Option<f64>],
        strategy: GroundStrategy,
    ) -> Result<GroundLevel, AnalysisError> {
        let samples: Vec<f64> = match strategy {
            GroundStrategy::CalibrationWindow { frames } => {
                smoothed.iter().take(frames).flatten().copied().collect()
            }
            GroundStrategy::HistogramMode { .. } => smoothed.iter().flatten().copied().collect(),
        };

        if samples.len() < MIN_GROUND_SAMPLES {
            return Err(AnalysisError::InsufficientData {
                frames: samples.len(),
                required: MIN_GROUND_SAMPLES,
            });
        }

        let value = match strategy {
            GroundStrategy::CalibrationWindow { .. } => samples.iter().mean(),
            GroundStrategy::HistogramMode { max_bins } => {
                histogram_mode(&samples, max_bins.min(samples.len()))
            }
        };

        info!(
            "Ground level estimated at {:.3} from {} samples ({:?})",
            value,
            samples.len(),
            strategy
        );
        Ok(GroundLevel::new(value, samples.len()))
    }

    /// Reduce, smooth and baseline one joint pair
    pub fn condition(
        &self,
        frames: &[KeypointFrame],
        pair: JointPair,
        strategy: GroundStrategy,
    ) -> Result<ConditionedSignal, AnalysisError> {
        self.condition_with_drift(frames, pair, strategy, None)
    }

    /// Like [`Self::condition`], with cumulative camera drift per frame.
    ///
    /// The base ground level is estimated on the drift-free signal and the
    /// drift is then carried by the returned [`GroundLevel`].
    pub fn condition_with_drift(
        &self,
        frames: &[KeypointFrame],
        pair: JointPair,
        strategy: GroundStrategy,
        drift: Option<Vec<f64>>,
    ) -> Result<ConditionedSignal, AnalysisError> {
        let raw = vertical_series(frames, pair);
        let smoothed = self.smooth_offline(&raw);
        let ground = match drift {
            Some(drift) => {
                let steady: Vec<Option<f64>> = smoothed
                    .iter()
                    .enumerate()
                    .map(|(i, value)| value.map(|y| y - drift.get(i).copied().unwrap_or(0.0)))
                    .collect();
                self.estimate_ground(&steady, strategy)?.with_drift(drift)
            }
            None => self.estimate_ground(&smoothed, strategy)?,
        };

        Ok(ConditionedSignal {
            raw,
            smoothed,
            ground,
        })
    }
}
