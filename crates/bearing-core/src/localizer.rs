//! Localizer façade
//!
//! Owns the configured geometry and the cached delay tensor, and exposes the
//! per-block estimation calls.
//!
//! ```text
//!                configure (ok)                    configure (ok)
//!   Unconfigured ─────────────────► Configured ◄──────────────┐
//!        ▲                              │  │                  │
//!        │      configure (error)       │  └──────────────────┘
//!        └──────────────────────────────┘     tensor rebuilt from scratch
//! ```
//!
//! Estimation borrows the localizer immutably, so one configured localizer
//! can serve many concurrent estimation calls. Reconfiguration needs `&mut`,
//! which rules out overlapping it with estimation.
//!
//! ## Example
//!
//! ```rust
//! use bearing_core::config::LocalizerConfig;
//! use bearing_core::localizer::{Localize, Localizer, Method};
//!
//! let mut localizer = Localizer::new(Method::SrpPhat);
//! let ready = localizer.configure(&LocalizerConfig::default()).unwrap();
//! assert_eq!(ready.pairs, 6);
//!
//! let silence = vec![vec![0.0; 1024]; 4];
//! let dist = localizer.estimate_distribution(&silence).unwrap();
//! assert!(dist.is_degenerate());
//! ```

use serde::{Deserialize, Serialize};

use crate::bearing_map::AngularDistribution;
use crate::config::LocalizerConfig;
use crate::error::{ConfigResult, EstimationError, EstimationResult};
use crate::geometry::{DelayTensor, Grid, LagTable, MicrophoneArray, MicrophonePair};
use crate::power::{accumulate, frame_ranges, SpatialPowerMap};

/// Localization algorithm selected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// Steered Response Power with Phase Transform
    #[default]
    SrpPhat,
}

/// Summary returned by a successful `configure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
    /// Grid samples along x.
    pub grid_x: usize,
    /// Grid samples along y.
    pub grid_y: usize,
    /// Number of microphone pairs.
    pub pairs: usize,
    /// Largest lag, in samples, the grid asks for.
    pub max_lag: i64,
}

/// Result of one estimation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    /// Most likely bearing, `None` if the distribution is degenerate.
    pub bearing: Option<u16>,
    pub distribution: AngularDistribution,
}

/// Capability shared by every localization method.
pub trait Localize {
    /// Validate `config` and rebuild all cached geometry. On error the
    /// localizer is left unconfigured.
    fn configure(&mut self, config: &LocalizerConfig) -> ConfigResult<Ready>;

    fn is_configured(&self) -> bool;

    /// Distribution and best bearing for one multichannel block.
    fn estimate<S: AsRef<[f64]>>(&self, signals: &[S]) -> EstimationResult<Estimate>;

    /// Normalized 360-bin distribution for one block. A silent block yields
    /// an all-zero distribution flagged as degenerate.
    fn estimate_distribution<S: AsRef<[f64]>>(
        &self,
        signals: &[S],
    ) -> EstimationResult<AngularDistribution> {
        self.estimate(signals).map(|e| e.distribution)
    }

    /// Most likely bearing for one block.
    fn estimate_bearing<S: AsRef<[f64]>>(&self, signals: &[S]) -> EstimationResult<u16> {
        self.estimate(signals)?
            .bearing
            .ok_or(EstimationError::Degenerate)
    }
}

/// Everything derived from one configuration event.
#[derive(Debug, Clone)]
struct Setup {
    array: MicrophoneArray,
    grid: Grid,
    tensor: DelayTensor,
    lags: LagTable,
    block_len: usize,
    beta: f64,
}

/// SRP-PHAT localizer.
#[derive(Debug, Clone, Default)]
pub struct SrpPhat {
    setup: Option<Box<Setup>>,
}

impl SrpPhat {
    pub fn new() -> Self {
        Self::default()
    }

    fn setup(&self) -> EstimationResult<&Setup> {
        self.setup.as_deref().ok_or(EstimationError::Unconfigured)
    }

    /// Microphone pairs in correlation order, once configured.
    pub fn microphone_pairs(&self) -> Option<&[MicrophonePair]> {
        self.setup.as_ref().map(|s| s.array.pairs())
    }

    /// Cached delay tensor, once configured.
    pub fn delay_tensor(&self) -> Option<&DelayTensor> {
        self.setup.as_ref().map(|s| &s.tensor)
    }

    /// Search grid, once configured.
    pub fn grid(&self) -> Option<&Grid> {
        self.setup.as_ref().map(|s| &s.grid)
    }

    /// Raw spatial power map for one block, before folding into bearings.
    pub fn power_map<S: AsRef<[f64]>>(&self, signals: &[S]) -> EstimationResult<SpatialPowerMap> {
        let setup = self.setup()?;
        accumulate(
            signals,
            &setup.array,
            &setup.grid,
            &setup.lags,
            setup.block_len,
            setup.beta,
        )
    }
}

impl Localize for SrpPhat {
    fn configure(&mut self, config: &LocalizerConfig) -> ConfigResult<Ready> {
        self.setup = None;
        config.validate()?;

        let array = config.array()?;
        let grid = config.grid()?;
        let tensor = DelayTensor::build(&array, &grid);
        let lags = tensor.lag_table(config.sample_rate);

        let ready = Ready {
            grid_x: grid.x_count(),
            grid_y: grid.y_count(),
            pairs: array.pairs().len(),
            max_lag: lags.max_abs(),
        };
        if ready.max_lag >= config.analysis_block_len as i64 {
            tracing::warn!(
                max_lag = ready.max_lag,
                block_len = config.analysis_block_len,
                aperture_m = array.aperture(),
                "grid lags exceed the analysis block; estimation will fail"
            );
        }
        tracing::info!(
            mics = array.len(),
            aperture_m = array.aperture(),
            pairs = ready.pairs,
            grid_x = ready.grid_x,
            grid_y = ready.grid_y,
            tensor_len = tensor.len(),
            "SRP-PHAT configured"
        );

        self.setup = Some(Box::new(Setup {
            array,
            grid,
            tensor,
            lags,
            block_len: config.analysis_block_len,
            beta: config.beta,
        }));
        Ok(ready)
    }

    fn is_configured(&self) -> bool {
        self.setup.is_some()
    }

    fn estimate<S: AsRef<[f64]>>(&self, signals: &[S]) -> EstimationResult<Estimate> {
        let setup = self.setup()?;
        let map = self.power_map(signals)?;
        let distribution = AngularDistribution::from_power_map(&map, &setup.grid);
        let bearing = distribution.best_bearing();

        let samples = signals.first().map(|s| s.as_ref().len()).unwrap_or(0);
        tracing::debug!(
            frames = frame_ranges(samples, setup.block_len).len(),
            bearing = ?bearing,
            "SRP-PHAT estimate"
        );
        Ok(Estimate {
            bearing,
            distribution,
        })
    }
}

/// Closed set of localization methods behind [`Localize`].
#[derive(Debug, Clone)]
pub enum Localizer {
    SrpPhat(SrpPhat),
}

impl Localizer {
    pub fn new(method: Method) -> Self {
        match method {
            Method::SrpPhat => Localizer::SrpPhat(SrpPhat::new()),
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Localizer::SrpPhat(_) => Method::SrpPhat,
        }
    }

    /// Microphone pairs in correlation order, once configured.
    pub fn microphone_pairs(&self) -> Option<&[MicrophonePair]> {
        match self {
            Localizer::SrpPhat(l) => l.microphone_pairs(),
        }
    }

    /// Cached delay tensor, once configured.
    pub fn delay_tensor(&self) -> Option<&DelayTensor> {
        match self {
            Localizer::SrpPhat(l) => l.delay_tensor(),
        }
    }
}

impl Localize for Localizer {
    fn configure(&mut self, config: &LocalizerConfig) -> ConfigResult<Ready> {
        match self {
            Localizer::SrpPhat(l) => l.configure(config),
        }
    }

    fn is_configured(&self) -> bool {
        match self {
            Localizer::SrpPhat(l) => l.is_configured(),
        }
    }

    fn estimate<S: AsRef<[f64]>>(&self, signals: &[S]) -> EstimationResult<Estimate> {
        match self {
            Localizer::SrpPhat(l) => l.estimate(signals),
        }
    }
}

/// Localizer with a last-estimate cache for callers that poll.
#[derive(Debug, Clone)]
pub struct BearingTracker {
    localizer: Localizer,
    last: Option<Estimate>,
}

impl BearingTracker {
    pub fn new(localizer: Localizer) -> Self {
        Self {
            localizer,
            last: None,
        }
    }

    /// Reconfigure the wrapped localizer and drop the cached estimate.
    pub fn configure(&mut self, config: &LocalizerConfig) -> ConfigResult<Ready> {
        self.last = None;
        self.localizer.configure(config)
    }

    /// Estimate one block and remember the result. A failed call keeps the
    /// previous estimate.
    pub fn track<S: AsRef<[f64]>>(&mut self, signals: &[S]) -> EstimationResult<&Estimate> {
        let estimate = self.localizer.estimate(signals)?;
        Ok(&*self.last.insert(estimate))
    }

    /// Most recent successful estimate since the last configuration.
    pub fn last_estimate(&self) -> Option<&Estimate> {
        self.last.as_ref()
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::geometry::GridSpec;

    fn small_config() -> LocalizerConfig {
        LocalizerConfig::default()
            .with_microphones(vec![-0.1, 0.1], vec![0.0, 0.0])
            .with_grid(GridSpec {
                x_length: 2.0,
                y_length: 2.0,
                step_size: 0.25,
            })
            .with_sample_rate(16_000.0)
            .with_block_len(256)
    }

    fn impulse_block(len: usize, at0: usize, at1: usize) -> Vec<Vec<f64>> {
        let mut a = vec![0.0; len];
        let mut b = vec![0.0; len];
        for k in 0..5 {
            a[at0 + k] = 1.0 - 0.15 * k as f64;
            b[at1 + k] = 1.0 - 0.15 * k as f64;
        }
        vec![a, b]
    }

    #[test]
    fn test_unconfigured_rejects_estimation() {
        let localizer = Localizer::new(Method::SrpPhat);
        assert!(!localizer.is_configured());
        assert_eq!(
            localizer.estimate_bearing(&[vec![0.0; 8], vec![0.0; 8]]),
            Err(EstimationError::Unconfigured)
        );
        assert!(localizer.microphone_pairs().is_none());
        assert!(localizer.delay_tensor().is_none());
    }

    #[test]
    fn test_configure_builds_tensor() {
        let mut localizer = Localizer::new(Method::SrpPhat);
        let ready = localizer.configure(&small_config()).unwrap();
        assert_eq!(ready.grid_x, 9);
        assert_eq!(ready.grid_y, 9);
        assert_eq!(ready.pairs, 1);
        assert!(localizer.is_configured());
        assert_eq!(localizer.delay_tensor().unwrap().dims(), (9, 9, 1));
        assert_eq!(localizer.method(), Method::SrpPhat);
    }

    #[test]
    fn test_failed_reconfigure_returns_to_unconfigured() {
        let mut localizer = Localizer::new(Method::SrpPhat);
        localizer.configure(&small_config()).unwrap();

        let bad = small_config().with_microphones(vec![0.0, 0.1, 0.2], vec![0.0, 0.0]);
        assert_eq!(
            localizer.configure(&bad),
            Err(ConfigError::MismatchedCoordinates { x: 3, y: 2 })
        );
        assert!(!localizer.is_configured());

        let none = small_config().with_microphones(vec![], vec![]);
        assert_eq!(
            localizer.configure(&none),
            Err(ConfigError::TooFewMicrophones(0))
        );
        assert!(!localizer.is_configured());
    }

    #[test]
    fn test_reconfigure_rebuilds() {
        let mut localizer = SrpPhat::new();
        localizer.configure(&small_config()).unwrap();
        let wide = small_config().with_microphones(
            vec![0.055, 0.0, -0.055, 0.0],
            vec![0.0, 0.055, 0.0, -0.055],
        );
        let ready = localizer.configure(&wide).unwrap();
        assert_eq!(ready.pairs, 6);
        assert_eq!(localizer.microphone_pairs().unwrap().len(), 6);
        assert_eq!(localizer.delay_tensor().unwrap().dims(), (9, 9, 6));
    }

    #[test]
    fn test_estimation_errors() {
        let mut localizer = SrpPhat::new();
        localizer.configure(&small_config()).unwrap();

        assert_eq!(
            localizer.estimate_bearing(&[vec![0.0; 512]]),
            Err(EstimationError::ChannelCountMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert!(matches!(
            localizer.estimate_distribution(&[vec![0.0; 512], vec![0.0; 500]]),
            Err(EstimationError::UnequalChannelLengths { channel: 1, .. })
        ));
        // 0.2 m baseline at 16 kHz needs +/-9 samples of lag
        assert!(matches!(
            localizer.estimate(&[vec![1.0; 4], vec![1.0; 4]]),
            Err(EstimationError::LagOutOfRange { max_lag: 3, .. })
        ));
    }

    #[test]
    fn test_silence_is_degenerate() {
        let mut localizer = SrpPhat::new();
        localizer.configure(&small_config()).unwrap();
        let silence = vec![vec![0.0; 512]; 2];

        let dist = localizer.estimate_distribution(&silence).unwrap();
        assert!(dist.is_degenerate());
        assert!(dist.bins().iter().all(|&v| v == 0.0));
        assert_eq!(
            localizer.estimate_bearing(&silence),
            Err(EstimationError::Degenerate)
        );
    }

    #[test]
    fn test_endfire_pair_points_at_late_side() {
        let mut localizer = SrpPhat::new();
        localizer.configure(&small_config()).unwrap();

        // Mic 0 (x = -0.1) hears the click 9 samples after mic 1: source on +x
        let block = impulse_block(512, 109, 100);
        let bearing = localizer.estimate_bearing(&block).unwrap();
        assert!(bearing <= 20 || bearing >= 340, "bearing={bearing}");

        let block = impulse_block(512, 100, 109);
        let bearing = localizer.estimate_bearing(&block).unwrap();
        assert!((160..=200).contains(&bearing), "bearing={bearing}");
    }

    #[test]
    fn test_tracker_caches_last_estimate() {
        let mut tracker = BearingTracker::new(Localizer::new(Method::SrpPhat));
        tracker.configure(&small_config()).unwrap();
        assert!(tracker.last_estimate().is_none());

        let block = impulse_block(512, 109, 100);
        let bearing = tracker.track(&block).unwrap().bearing;
        assert_eq!(tracker.last_estimate().unwrap().bearing, bearing);

        // A failed call leaves the cache alone
        assert!(tracker.track(&[vec![0.0; 4]]).is_err());
        assert_eq!(tracker.last_estimate().unwrap().bearing, bearing);

        tracker.configure(&small_config()).unwrap();
        assert!(tracker.last_estimate().is_none());
        assert!(tracker.localizer().is_configured());
    }

    #[test]
    fn test_localizer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SrpPhat>();
        assert_send_sync::<Localizer>();
    }
}
