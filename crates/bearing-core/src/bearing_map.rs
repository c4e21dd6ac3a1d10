//! Folding the spatial power map into a compass distribution
//!
//! Each grid cell is assigned the integer bearing of its offset from the
//! array centre, and its power is added into that bearing's bin:
//!
//! ```text
//!   bearing(x, y) = round(atan2(y, x) · 180/π) mod 360        (0,0) → 0
//!
//!                90
//!                 │
//!        180 ─────┼───── 0
//!                 │
//!                270
//! ```
//!
//! Several cells share a bin, most visibly near the centre of the grid, and
//! their contributions are summed rather than averaged.

use crate::geometry::Grid;
use crate::power::SpatialPowerMap;

/// Number of angular bins, one per degree.
pub const BEARING_BINS: usize = 360;

/// Tolerance used when picking the first bin equal to the maximum.
pub const TIE_EPSILON: f64 = 1e-4;

/// Integer compass bearing of a grid offset.
pub fn grid_to_bearing(x: f64, y: f64) -> u16 {
    if x == 0.0 && y == 0.0 {
        return 0;
    }
    let degrees = y.atan2(x).to_degrees().round() as i64;
    degrees.rem_euclid(BEARING_BINS as i64) as u16
}

/// 360-bin bearing distribution normalized to its maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct AngularDistribution {
    bins: Vec<f64>,
    degenerate: bool,
}

impl AngularDistribution {
    /// Normalize raw per-degree sums. Negative bins are floored at zero; a
    /// zero maximum gives an all-zero, degenerate distribution.
    ///
    /// # Panics
    ///
    /// Panics if `raw` does not have [`BEARING_BINS`] entries.
    pub fn from_raw(mut raw: Vec<f64>) -> Self {
        assert_eq!(raw.len(), BEARING_BINS, "distribution needs 360 bins");
        raw.iter_mut().for_each(|v| *v = v.max(0.0));
        let max = raw.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            raw.iter_mut().for_each(|v| *v /= max);
            Self {
                bins: raw,
                degenerate: false,
            }
        } else {
            Self {
                bins: vec![0.0; BEARING_BINS],
                degenerate: true,
            }
        }
    }

    /// Sum each cell's power into the bin of its bearing, then normalize.
    pub fn from_power_map(map: &SpatialPowerMap, grid: &Grid) -> Self {
        let mut raw = vec![0.0; BEARING_BINS];
        for (cell, x, y) in grid.cells() {
            raw[grid_to_bearing(x, y) as usize] += map.as_slice()[cell];
        }
        Self::from_raw(raw)
    }

    /// Normalized bins, index = bearing in degrees.
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    pub fn into_bins(self) -> Vec<f64> {
        self.bins
    }

    /// Value at `bearing` (taken modulo 360).
    pub fn at(&self, bearing: u16) -> f64 {
        self.bins[bearing as usize % BEARING_BINS]
    }

    /// True when no bin carried positive power.
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Lowest bearing whose value is within [`TIE_EPSILON`] of the maximum.
    pub fn best_bearing(&self) -> Option<u16> {
        if self.degenerate {
            return None;
        }
        let max = self.bins.iter().copied().fold(0.0, f64::max);
        self.bins
            .iter()
            .position(|&v| (v - max).abs() < TIE_EPSILON)
            .map(|i| i as u16)
    }
}
