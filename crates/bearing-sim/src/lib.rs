//! # Bearing Simulator
//!
//! Synthesizes multichannel microphone recordings of a single broadband
//! source so the localizer can be exercised without hardware.
//!
//! ## Propagation
//!
//! The source is Gaussian white noise. Each channel receives a copy delayed
//! by that microphone's arrival time:
//!
//! ```text
//!   far field:   τ_m = -(m · u) / c          u = (cos θ, sin θ)
//!   point:       τ_m = (‖p − m‖ − min_k ‖p − k‖) / c
//! ```
//!
//! Delays are fractional. They are applied as a phase rotation in the
//! frequency domain on a power-of-two buffer with a guard margin on both
//! sides, and the middle `len` samples are kept, so every channel sees the
//! same underlying waveform.
//!
//! ## Usage
//!
//! ```rust
//! use bearing_core::Microphone;
//! use bearing_sim::{SourceModel, Simulator};
//!
//! let mics = vec![
//!     Microphone::new(0.055, 0.0),
//!     Microphone::new(0.0, 0.055),
//!     Microphone::new(-0.055, 0.0),
//!     Microphone::new(0.0, -0.055),
//! ];
//!
//! let mut sim = Simulator::new(mics, 16_000.0)
//!     .unwrap()
//!     .with_seed(7)
//!     .with_snr_db(Some(20.0));
//!
//! let block = sim.render(&SourceModel::FarField { bearing_deg: 45.0 }, 2048).unwrap();
//! assert_eq!(block.len(), 4);
//! assert_eq!(block[0].len(), 2048);
//! ```

use std::f64::consts::PI;

use bearing_core::spectral::{fft, ifft, next_pow2_len, to_complex};
use bearing_core::{LocalizerConfig, Microphone, SPEED_OF_SOUND};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use thiserror::Error;

/// Simulator errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("at least 2 microphones are required, got {0}")]
    TooFewMicrophones(usize),

    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),

    #[error("requested signal length is zero")]
    EmptyLength,

    #[error("SNR must be finite, got {0} dB")]
    InvalidSnr(f64),
}

pub type SimResult<T> = Result<T, SimError>;

/// Where the simulated source sits relative to the array centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceModel {
    /// Plane wave arriving from `bearing_deg` (counter-clockwise from +x)
    FarField { bearing_deg: f64 },
    /// Spherical wave from a point at `(x, y)` metres
    Point { x: f64, y: f64 },
}

impl SourceModel {
    /// Bearing of the source as seen from the origin, in degrees `[0, 360)`.
    pub fn bearing_deg(&self) -> f64 {
        match *self {
            SourceModel::FarField { bearing_deg } => bearing_deg.rem_euclid(360.0),
            SourceModel::Point { x, y } => y.atan2(x).to_degrees().rem_euclid(360.0),
        }
    }
}

/// Multichannel source renderer.
#[derive(Debug)]
pub struct Simulator {
    mics: Vec<Microphone>,
    sample_rate: f64,
    snr_db: Option<f64>,
    rng: StdRng,
}

impl Simulator {
    pub fn new(mics: Vec<Microphone>, sample_rate: f64) -> SimResult<Self> {
        if mics.len() < 2 {
            return Err(SimError::TooFewMicrophones(mics.len()));
        }
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(SimError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            mics,
            sample_rate,
            snr_db: None,
            rng: StdRng::from_entropy(),
        })
    }

    /// Simulator matching a localizer configuration's geometry and rate.
    pub fn from_config(config: &LocalizerConfig) -> SimResult<Self> {
        let mics = config
            .mic_x
            .iter()
            .zip(config.mic_y.iter())
            .map(|(&x, &y)| Microphone::new(x, y))
            .collect();
        Self::new(mics, config.sample_rate)
    }

    /// Reseed for reproducible output.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Per-channel sensor noise at this SNR; `None` renders clean signals.
    pub fn with_snr_db(mut self, snr_db: Option<f64>) -> Self {
        self.snr_db = snr_db;
        self
    }

    pub fn microphones(&self) -> &[Microphone] {
        &self.mics
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Arrival delay of `source` at each microphone, in seconds.
    pub fn arrival_delays(&self, source: &SourceModel) -> Vec<f64> {
        match *source {
            SourceModel::FarField { bearing_deg } => {
                let (uy, ux) = bearing_deg.to_radians().sin_cos();
                self.mics
                    .iter()
                    .map(|m| -(m.x * ux + m.y * uy) / SPEED_OF_SOUND)
                    .collect()
            }
            SourceModel::Point { x, y } => {
                let dists: Vec<f64> = self.mics.iter().map(|m| m.distance_to(x, y)).collect();
                let nearest = dists.iter().copied().fold(f64::INFINITY, f64::min);
                dists
                    .iter()
                    .map(|d| (d - nearest) / SPEED_OF_SOUND)
                    .collect()
            }
        }
    }

    /// Render `len` samples per microphone, one channel per microphone.
    pub fn render(&mut self, source: &SourceModel, len: usize) -> SimResult<Vec<Vec<f64>>> {
        if len == 0 {
            return Err(SimError::EmptyLength);
        }
        if let Some(snr) = self.snr_db {
            if !snr.is_finite() {
                return Err(SimError::InvalidSnr(snr));
            }
        }

        let delays: Vec<f64> = self
            .arrival_delays(source)
            .into_iter()
            .map(|d| d * self.sample_rate)
            .collect();
        let max_shift = delays.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
        let margin = max_shift.ceil() as usize + 1;
        let n = next_pow2_len(len + 2 * margin);

        let white: Vec<f64> = (0..n).map(|_| StandardNormal.sample(&mut self.rng)).collect();
        let mut spectrum = to_complex(&white);
        fft(&mut spectrum);

        let mut channels: Vec<Vec<f64>> = delays
            .iter()
            .map(|&shift| {
                let mut delayed = fractional_delay(&spectrum, shift);
                ifft(&mut delayed);
                delayed[margin..margin + len].iter().map(|c| c.re).collect()
            })
            .collect();

        if let Some(snr) = self.snr_db {
            for channel in &mut channels {
                self.add_noise(channel, snr);
            }
        }

        tracing::debug!(
            channels = channels.len(),
            len,
            fft_len = n,
            max_shift,
            bearing = source.bearing_deg(),
            "rendered source"
        );
        Ok(channels)
    }

    fn add_noise(&mut self, samples: &mut [f64], snr_db: f64) {
        // noise_power = signal_power / 10^(SNR/10)
        let signal_power = samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64;
        let noise_std = (signal_power / 10.0_f64.powf(snr_db / 10.0)).sqrt();

        for s in samples.iter_mut() {
            let z: f64 = StandardNormal.sample(&mut self.rng);
            *s += noise_std * z;
        }
    }
}

/// Delay a full spectrum by `shift` samples (possibly fractional or
/// negative). The shift is circular over the buffer length.
fn fractional_delay(spectrum: &[Complex64], shift: f64) -> Vec<Complex64> {
    let n = spectrum.len();
    spectrum
        .iter()
        .enumerate()
        .map(|(k, &x)| {
            // Signed bin index so negative frequencies rotate the other way
            let f = if k <= n / 2 { k as f64 } else { k as f64 - n as f64 };
            let phase = -2.0 * PI * f * shift / n as f64;
            x * Complex64::from_polar(1.0, phase)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Microphone> {
        vec![
            Microphone::new(0.055, 0.0),
            Microphone::new(0.0, 0.055),
            Microphone::new(-0.055, 0.0),
            Microphone::new(0.0, -0.055),
        ]
    }

    #[test]
    fn test_rejects_bad_setup() {
        assert_eq!(
            Simulator::new(vec![Microphone::new(0.0, 0.0)], 16_000.0).unwrap_err(),
            SimError::TooFewMicrophones(1)
        );
        assert_eq!(
            Simulator::new(square(), 0.0).unwrap_err(),
            SimError::InvalidSampleRate(0.0)
        );

        let mut sim = Simulator::new(square(), 16_000.0).unwrap();
        assert_eq!(
            sim.render(&SourceModel::FarField { bearing_deg: 0.0 }, 0),
            Err(SimError::EmptyLength)
        );

        let mut sim = sim.with_snr_db(Some(f64::NAN));
        assert!(matches!(
            sim.render(&SourceModel::FarField { bearing_deg: 0.0 }, 16),
            Err(SimError::InvalidSnr(_))
        ));
    }

    #[test]
    fn test_far_field_delays() {
        let sim = Simulator::new(square(), 16_000.0).unwrap();
        let delays = sim.arrival_delays(&SourceModel::FarField { bearing_deg: 0.0 });

        // Source on +x: mic 0 hears it first, mic 2 last, mics 1 and 3 together
        assert!(delays[0] < delays[1]);
        assert!((delays[1] - delays[3]).abs() < 1e-15);
        assert!((delays[2] - delays[0] - 0.11 / SPEED_OF_SOUND).abs() < 1e-12);
    }

    #[test]
    fn test_point_delays_relative_to_nearest() {
        let sim = Simulator::new(square(), 16_000.0).unwrap();
        let delays = sim.arrival_delays(&SourceModel::Point { x: 0.0, y: 1.0 });

        assert_eq!(delays[1], 0.0);
        assert!(delays.iter().all(|&d| d >= 0.0));
        assert!(delays[3] > delays[0]);
    }

    #[test]
    fn test_source_bearing() {
        assert_eq!(SourceModel::FarField { bearing_deg: -90.0 }.bearing_deg(), 270.0);
        let b = SourceModel::Point { x: -1.0, y: 0.0 }.bearing_deg();
        assert!((b - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_integer_delay_is_exact_shift() {
        let mics = vec![Microphone::new(0.0, 0.0), Microphone::new(-1.0, 0.0)];
        // 1 m at 340.42 m/s is 340.42 samples at 1 kHz; use a rate that makes
        // the offset a whole number of samples.
        let mut sim = Simulator::new(mics, SPEED_OF_SOUND * 4.0)
            .unwrap()
            .with_seed(3);
        let out = sim
            .render(&SourceModel::FarField { bearing_deg: 0.0 }, 64)
            .unwrap();

        // Mic 1 sits 1 m behind mic 0 along the wave, so it is 4 samples late
        for n in 4..64 {
            assert!(
                (out[1][n] - out[0][n - 4]).abs() < 1e-9,
                "sample {n}: {} vs {}",
                out[1][n],
                out[0][n - 4]
            );
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let render = |seed| {
            Simulator::new(square(), 16_000.0)
                .unwrap()
                .with_seed(seed)
                .with_snr_db(Some(10.0))
                .render(&SourceModel::Point { x: 1.0, y: 1.0 }, 256)
                .unwrap()
        };
        assert_eq!(render(11), render(11));
        assert_ne!(render(11), render(12));
    }

    #[test]
    fn test_noise_lowers_channel_similarity() {
        let source = SourceModel::FarField { bearing_deg: 90.0 };
        let mut clean = Simulator::new(square(), 16_000.0).unwrap().with_seed(5);
        let mut noisy = Simulator::new(square(), 16_000.0)
            .unwrap()
            .with_seed(5)
            .with_snr_db(Some(0.0));

        let a = clean.render(&source, 1024).unwrap();
        let b = noisy.render(&source, 1024).unwrap();

        // Mics 0 and 2 are broadside to a source at 90 deg: identical when clean
        let diff = |ch: &[Vec<f64>]| -> f64 {
            ch[0].iter().zip(&ch[2]).map(|(x, y)| (x - y).powi(2)).sum()
        };
        assert!(diff(&a) < 1e-12);
        assert!(diff(&b) > 1.0);
    }

    #[test]
    fn test_from_config() {
        let sim = Simulator::from_config(&LocalizerConfig::default()).unwrap();
        assert_eq!(sim.microphones().len(), 4);
        assert_eq!(sim.sample_rate(), 16_000.0);
    }
}
