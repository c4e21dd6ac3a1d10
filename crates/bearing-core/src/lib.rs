//! # Bearing Core
//!
//! Sound source bearing estimation for small microphone arrays using
//! SRP-PHAT (Steered Response Power with Phase Transform).
//!
//! ## Overview
//!
//! Given the microphone positions and a rectangular search grid, the
//! localizer precomputes the time difference of arrival every grid cell
//! would produce at every microphone pair. For each block of multichannel
//! audio it then:
//!
//! - **Correlates** every pair with GCC-PHAT, frame by frame
//! - **Steers** the correlations onto the grid using the precomputed delays
//! - **Folds** the resulting power map into a 360-bin compass distribution
//!
//! ## Signal Flow
//!
//! ```text
//! config → DelayTensor (once)
//! block  → GCC-PHAT per pair/frame → SpatialPowerMap → AngularDistribution → bearing
//! ```
//!
//! ## Example
//!
//! ```rust
//! use bearing_core::prelude::*;
//!
//! let mut localizer = Localizer::new(Method::SrpPhat);
//! localizer.configure(&LocalizerConfig::default()).unwrap();
//!
//! // Four channels of audio, one per microphone
//! let block = vec![vec![0.0; 2048]; 4];
//! match localizer.estimate_bearing(&block) {
//!     Ok(bearing) => println!("source at {bearing} deg"),
//!     Err(EstimationError::Degenerate) => println!("silence"),
//!     Err(e) => eprintln!("estimation failed: {e}"),
//! }
//! ```

pub mod bearing_map;
pub mod config;
pub mod error;
pub mod gcc_phat;
pub mod geometry;
pub mod localizer;
pub mod logging;
pub mod power;
pub mod spectral;

pub use bearing_map::{grid_to_bearing, AngularDistribution, BEARING_BINS};
pub use config::{BearingConfig, LocalizerConfig};
pub use error::{ConfigError, ConfigResult, EstimationError, EstimationResult};
pub use gcc_phat::gcc_phat;
pub use geometry::{
    DelayTensor, Grid, GridSpec, Microphone, MicrophoneArray, MicrophonePair, SPEED_OF_SOUND,
};
pub use localizer::{BearingTracker, Estimate, Localize, Localizer, Method, Ready, SrpPhat};
pub use power::SpatialPowerMap;

/// Commonly used items.
pub mod prelude {
    pub use crate::bearing_map::AngularDistribution;
    pub use crate::config::{BearingConfig, LocalizerConfig};
    pub use crate::error::{ConfigError, EstimationError};
    pub use crate::geometry::GridSpec;
    pub use crate::localizer::{BearingTracker, Estimate, Localize, Localizer, Method};
}
