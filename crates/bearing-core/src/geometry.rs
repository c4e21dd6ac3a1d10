//! Array geometry, search grid and the precomputed delay tensor
//!
//! The delay tensor holds, for every candidate source position on the grid
//! and every microphone pair, the time difference of arrival a point source
//! at that position would produce:
//!
//! ```text
//!   delay(p, i, j) = (‖p − mᵢ‖ − ‖p − mⱼ‖) / c          c = 340.42 m/s
//! ```
//!
//! Grid layout (x ascending, y descending, origin at the centre cell):
//!
//! ```text
//!          x →  -L/2 ........ 0 ........ +L/2
//!   y  +H/2     [0,0]                   [X-1,0]
//!   ↓    0                  (0,0)
//!      -H/2     [0,Y-1]                 [X-1,Y-1]
//! ```
//!
//! The tensor is stored flat with index `x·Y·P + y·P + pair`.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Speed of sound used for every delay computation, in m/s.
pub const SPEED_OF_SOUND: f64 = 340.42;

/// 2-D microphone position in metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Microphone {
    pub x: f64,
    pub y: f64,
}

impl Microphone {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `(x, y)`.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

/// Unordered pair of channel indices with `first < second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MicrophonePair {
    pub first: usize,
    pub second: usize,
}

/// Ordered set of microphones; channel `k` of every audio block belongs to
/// microphone `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct MicrophoneArray {
    mics: Vec<Microphone>,
    pairs: Vec<MicrophonePair>,
}

impl MicrophoneArray {
    /// Build an array from parallel coordinate slices.
    pub fn from_coordinates(mic_x: &[f64], mic_y: &[f64]) -> ConfigResult<Self> {
        if mic_x.len() != mic_y.len() {
            return Err(ConfigError::MismatchedCoordinates {
                x: mic_x.len(),
                y: mic_y.len(),
            });
        }
        let mics = mic_x
            .iter()
            .zip(mic_y.iter())
            .map(|(&x, &y)| Microphone::new(x, y))
            .collect();
        Self::new(mics)
    }

    /// Build an array from positions. Requires at least two finite positions.
    pub fn new(mics: Vec<Microphone>) -> ConfigResult<Self> {
        if mics.len() < 2 {
            return Err(ConfigError::TooFewMicrophones(mics.len()));
        }
        if let Some(index) = mics
            .iter()
            .position(|m| !m.x.is_finite() || !m.y.is_finite())
        {
            return Err(ConfigError::NonFiniteCoordinate { index });
        }

        let n = mics.len();
        let mut pairs = Vec::with_capacity(n * (n - 1) / 2);
        for first in 0..n {
            for second in (first + 1)..n {
                pairs.push(MicrophonePair { first, second });
            }
        }
        Ok(Self { mics, pairs })
    }

    pub fn len(&self) -> usize {
        self.mics.len()
    }

    /// Always false for a validated array; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.mics.is_empty()
    }

    pub fn microphones(&self) -> &[Microphone] {
        &self.mics
    }

    /// All C(n, 2) pairs, ascending by first then second index.
    pub fn pairs(&self) -> &[MicrophonePair] {
        &self.pairs
    }

    /// Largest distance between any two microphones.
    pub fn aperture(&self) -> f64 {
        self.pairs
            .iter()
            .map(|p| {
                let a = self.mics[p.first];
                a.distance_to(self.mics[p.second].x, self.mics[p.second].y)
            })
            .fold(0.0, f64::max)
    }
}

/// Rectangular search grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Width in metres (x axis).
    pub x_length: f64,
    /// Height in metres (y axis).
    pub y_length: f64,
    /// Sampling step in metres.
    pub step_size: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            x_length: 4.0,
            y_length: 4.0,
            step_size: 0.1,
        }
    }
}

/// Sampled search grid, immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    spec: GridSpec,
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Grid {
    pub fn new(spec: GridSpec) -> ConfigResult<Self> {
        let GridSpec {
            x_length,
            y_length,
            step_size,
        } = spec;
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(x_length) || !positive(y_length) || !positive(step_size) {
            return Err(ConfigError::NonPositiveGrid {
                x_length,
                y_length,
                step_size,
            });
        }

        let nx = axis_count(x_length, step_size);
        let ny = axis_count(y_length, step_size);
        let half_x = (nx - 1) as f64 / 2.0;
        let half_y = (ny - 1) as f64 / 2.0;
        let xs = (0..nx).map(|i| (i as f64 - half_x) * step_size).collect();
        let ys = (0..ny).map(|j| (half_y - j as f64) * step_size).collect();

        Ok(Self { spec, xs, ys })
    }

    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    /// Number of samples along x.
    pub fn x_count(&self) -> usize {
        self.xs.len()
    }

    /// Number of samples along y.
    pub fn y_count(&self) -> usize {
        self.ys.len()
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.xs.len() * self.ys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// X coordinates, ascending.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Y coordinates, descending.
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Flat cell index, `x·Y + y`.
    pub fn cell_index(&self, xi: usize, yi: usize) -> usize {
        xi * self.ys.len() + yi
    }

    /// Iterate `(cell_index, x, y)` in flat order.
    pub fn cells(&self) -> impl Iterator<Item = (usize, f64, f64)> + '_ {
        self.xs.iter().enumerate().flat_map(move |(xi, &x)| {
            self.ys
                .iter()
                .enumerate()
                .map(move |(yi, &y)| (self.cell_index(xi, yi), x, y))
        })
    }
}

/// `floor(length / step) + 1`, tolerating float error just below an integer.
fn axis_count(length: f64, step: f64) -> usize {
    let ratio = length / step;
    (ratio + ratio.abs() * 1e-9).floor() as usize + 1
}

/// Lag (in samples) for every tensor entry at one sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct LagTable {
    lags: Vec<i64>,
    max_abs: i64,
}

impl LagTable {
    /// Flat lag values in tensor order.
    pub fn as_slice(&self) -> &[i64] {
        &self.lags
    }

    /// Largest absolute lag anywhere in the table.
    pub fn max_abs(&self) -> i64 {
        self.max_abs
    }
}

/// Expected inter-microphone delays for every grid cell and pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayTensor {
    x_count: usize,
    y_count: usize,
    pair_count: usize,
    delays: Vec<f64>,
}

impl DelayTensor {
    /// Compute the tensor. Cost is O(X·Y·P).
    pub fn build(array: &MicrophoneArray, grid: &Grid) -> Self {
        let pairs = array.pairs();
        let mics = array.microphones();
        let mut delays = Vec::with_capacity(grid.len() * pairs.len());

        for &x in grid.xs() {
            for &y in grid.ys() {
                for pair in pairs {
                    let di = mics[pair.first].distance_to(x, y);
                    let dj = mics[pair.second].distance_to(x, y);
                    delays.push((di - dj) / SPEED_OF_SOUND);
                }
            }
        }

        Self {
            x_count: grid.x_count(),
            y_count: grid.y_count(),
            pair_count: pairs.len(),
            delays,
        }
    }

    /// `(X, Y, P)`
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.x_count, self.y_count, self.pair_count)
    }

    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// Delay in seconds.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn get(&self, xi: usize, yi: usize, pair: usize) -> f64 {
        assert!(xi < self.x_count && yi < self.y_count && pair < self.pair_count);
        self.delays[(xi * self.y_count + yi) * self.pair_count + pair]
    }

    /// Flat storage, index `x·Y·P + y·P + pair`.
    pub fn as_slice(&self) -> &[f64] {
        &self.delays
    }

    /// Round every delay to a whole-sample lag at `sample_rate`.
    pub fn lag_table(&self, sample_rate: f64) -> LagTable {
        let lags: Vec<i64> = self
            .delays
            .iter()
            .map(|d| (d * sample_rate).round() as i64)
            .collect();
        let max_abs = lags.iter().map(|l| l.abs()).max().unwrap_or(0);
        LagTable { lags, max_abs }
    }
}
