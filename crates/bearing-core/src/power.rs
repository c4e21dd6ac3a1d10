//! Steered response power accumulation
//!
//! For one multichannel block, every microphone pair is cross-correlated
//! frame by frame with GCC-PHAT. Each grid cell then reads the correlation
//! at the lag its delay predicts and adds it to its accumulator:
//!
//! ```text
//!   P(cell) = Σ_frames Σ_pairs r_pair,frame[center + lag(cell, pair)]
//! ```
//!
//! Frames are `block_len` samples, taken back to back. A trailing partial
//! block is covered by one extra frame aligned to the end of the signal, and
//! a signal shorter than one block is correlated as a single frame.

use std::ops::Range;

use crate::error::{EstimationError, EstimationResult};
use crate::gcc_phat::gcc_phat;
use crate::geometry::{Grid, LagTable, MicrophoneArray};

/// Accumulated steered power, one value per grid cell, index `x·Y + y`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialPowerMap {
    x_count: usize,
    y_count: usize,
    power: Vec<f64>,
}

impl SpatialPowerMap {
    /// All-zero map shaped like `grid`.
    pub fn zeros(grid: &Grid) -> Self {
        Self {
            x_count: grid.x_count(),
            y_count: grid.y_count(),
            power: vec![0.0; grid.len()],
        }
    }

    /// Wrap precomputed values laid out in grid cell order.
    ///
    /// # Panics
    ///
    /// Panics if `power.len() != dims.0 * dims.1`.
    pub fn from_values(dims: (usize, usize), power: Vec<f64>) -> Self {
        assert_eq!(power.len(), dims.0 * dims.1, "power map shape mismatch");
        Self {
            x_count: dims.0,
            y_count: dims.1,
            power,
        }
    }

    /// `(X, Y)`
    pub fn dims(&self) -> (usize, usize) {
        (self.x_count, self.y_count)
    }

    pub fn get(&self, xi: usize, yi: usize) -> f64 {
        self.power[xi * self.y_count + yi]
    }

    /// Flat storage in grid cell order.
    pub fn as_slice(&self) -> &[f64] {
        &self.power
    }

    /// Flat index and value of the strongest cell.
    pub fn peak(&self) -> Option<(usize, f64)> {
        self.power
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Frame boundaries used for one block of `len` samples.
pub fn frame_ranges(len: usize, block_len: usize) -> Vec<Range<usize>> {
    if len == 0 || block_len == 0 {
        return Vec::new();
    }
    if len <= block_len {
        return vec![0..len];
    }
    let mut frames: Vec<Range<usize>> = (0..len / block_len)
        .map(|k| k * block_len..(k + 1) * block_len)
        .collect();
    if len % block_len != 0 {
        frames.push(len - block_len..len);
    }
    frames
}

/// Check channel count and lengths. Returns the common channel length.
pub fn validate_block<S: AsRef<[f64]>>(
    signals: &[S],
    expected_channels: usize,
) -> EstimationResult<usize> {
    if signals.len() != expected_channels {
        return Err(EstimationError::ChannelCountMismatch {
            expected: expected_channels,
            actual: signals.len(),
        });
    }
    let len = signals.first().map(|s| s.as_ref().len()).unwrap_or(0);
    for (channel, s) in signals.iter().enumerate().skip(1) {
        if s.as_ref().len() != len {
            return Err(EstimationError::UnequalChannelLengths {
                channel,
                expected: len,
                actual: s.as_ref().len(),
            });
        }
    }
    if len == 0 {
        return Err(EstimationError::EmptySignal);
    }
    Ok(len)
}

/// Build the spatial power map for one audio block.
///
/// `lags` must come from the delay tensor of the same `array` and `grid`.
/// A lag that falls outside a frame's correlation range fails the whole call.
pub fn accumulate<S: AsRef<[f64]>>(
    signals: &[S],
    array: &MicrophoneArray,
    grid: &Grid,
    lags: &LagTable,
    block_len: usize,
    beta: f64,
) -> EstimationResult<SpatialPowerMap> {
    let len = validate_block(signals, array.len())?;
    let frames = frame_ranges(len, block_len);
    let pairs = array.pairs();
    let pair_count = pairs.len();
    let lag_values = lags.as_slice();

    // Every frame has the same length, so one range check covers them all.
    let frame_len = frames.first().map(|f| f.len()).unwrap_or(0);
    let max_lag = frame_len as i64 - 1;
    if lags.max_abs() > max_lag {
        let (flat, lag) = lag_values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, l)| l.abs() > max_lag)
            .unwrap_or((0, lags.max_abs()));
        return Err(EstimationError::LagOutOfRange {
            pair: flat % pair_count.max(1),
            lag,
            max_lag,
        });
    }

    let mut map = SpatialPowerMap::zeros(grid);
    for frame in &frames {
        for (p, pair) in pairs.iter().enumerate() {
            let a = &signals[pair.first].as_ref()[frame.clone()];
            let b = &signals[pair.second].as_ref()[frame.clone()];
            let corr = gcc_phat(a, b, beta);
            let center = (corr.len() / 2) as i64;

            for (cell, acc) in map.power.iter_mut().enumerate() {
                let idx = center + lag_values[cell * pair_count + p];
                *acc += corr[idx as usize];
            }
        }
    }

    tracing::trace!(
        frames = frames.len(),
        pairs = pair_count,
        cells = map.power.len(),
        "accumulated steered response power"
    );
    Ok(map)
}
