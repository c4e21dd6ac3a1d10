//! Error types for configuration and estimation

use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for estimation operations
pub type EstimationResult<T> = Result<T, EstimationError>;

/// Errors raised while validating or loading a localizer configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `mic_x` and `mic_y` have different lengths
    #[error("Microphone coordinate mismatch: {x} x-values, {y} y-values")]
    MismatchedCoordinates { x: usize, y: usize },

    /// Fewer than two microphones configured
    #[error("Need at least 2 microphones, got {0}")]
    TooFewMicrophones(usize),

    /// A microphone coordinate is NaN or infinite
    #[error("Microphone {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },

    /// Grid extent or step is not strictly positive
    #[error("Grid must be positive: x_length={x_length}, y_length={y_length}, step_size={step_size}")]
    NonPositiveGrid {
        x_length: f64,
        y_length: f64,
        step_size: f64,
    },

    /// Analysis block length of zero
    #[error("Invalid analysis block length: {0}")]
    InvalidBlockLength(usize),

    /// Sample rate is not a positive finite number
    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(f64),

    /// PHAT exponent is negative or not finite
    #[error("Invalid PHAT exponent: {0}. Must be finite and >= 0")]
    InvalidBeta(f64),

    /// Failed to read a configuration file
    #[error("Failed to read config: {0}")]
    ReadError(String),

    /// Failed to parse or serialize a configuration file
    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Errors raised by a single estimation call. No partial result accompanies
/// any of them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimationError {
    /// Estimation requested before a successful `configure`
    #[error("Localizer is not configured")]
    Unconfigured,

    /// Number of channels differs from the configured microphone count
    #[error("Channel count mismatch: expected {expected}, got {actual}")]
    ChannelCountMismatch { expected: usize, actual: usize },

    /// A channel's length differs from channel 0
    #[error("Channel {channel} has {actual} samples, channel 0 has {expected}")]
    UnequalChannelLengths {
        channel: usize,
        expected: usize,
        actual: usize,
    },

    /// All channels are empty
    #[error("Audio block contains no samples")]
    EmptySignal,

    /// The grid demands a lag the correlation of a frame cannot represent
    #[error("Lag {lag} for pair {pair} exceeds correlation range +/-{max_lag}; grid too large for array spacing and sample rate")]
    LagOutOfRange { pair: usize, lag: i64, max_lag: i64 },

    /// Every angular bin is zero, so no bearing exists
    #[error("Angular distribution is degenerate (zero maximum)")]
    Degenerate,
}

impl EstimationError {
    /// True when retrying with a different audio block may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EstimationError::ChannelCountMismatch { .. }
                | EstimationError::UnequalChannelLengths { .. }
                | EstimationError::EmptySignal
                | EstimationError::Degenerate
        )
    }
}
