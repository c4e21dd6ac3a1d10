//! # Configuration
//!
//! YAML configuration for the localizer and for logging.
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `BEARING_CONFIG` environment variable
//! 2. `./bearing.yaml` (current directory)
//! 3. `~/.config/bearing/config.yaml` (user config)
//! 4. `/etc/bearing/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! localizer:
//!   method: srp_phat
//!   mic_x: [0.055, 0.0, -0.055, 0.0]
//!   mic_y: [0.0, 0.055, 0.0, -0.055]
//!   grid:
//!     x_length: 4.0
//!     y_length: 4.0
//!     step_size: 0.1
//!   analysis_block_len: 1024
//!   sample_rate: 16000.0
//!   beta: 0.7
//!
//! logging:
//!   level: info
//!   format: compact
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};
use crate::gcc_phat::DEFAULT_BETA;
use crate::geometry::{Grid, GridSpec, MicrophoneArray};
use crate::localizer::Method;
use crate::logging::LogConfig;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "BEARING_CONFIG";

/// One configuration event for a localizer: geometry, grid and DSP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    /// Localization method
    pub method: Method,
    /// Microphone x coordinates in metres, one per channel
    pub mic_x: Vec<f64>,
    /// Microphone y coordinates in metres, one per channel
    pub mic_y: Vec<f64>,
    /// Search grid
    pub grid: GridSpec,
    /// Analysis sub-frame length in samples
    pub analysis_block_len: usize,
    /// Audio sample rate in Hz
    pub sample_rate: f64,
    /// PHAT exponent
    pub beta: f64,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            method: Method::SrpPhat,
            mic_x: vec![0.055, 0.0, -0.055, 0.0],
            mic_y: vec![0.0, 0.055, 0.0, -0.055],
            grid: GridSpec::default(),
            analysis_block_len: 1024,
            sample_rate: 16_000.0,
            beta: DEFAULT_BETA,
        }
    }
}

impl LocalizerConfig {
    pub fn with_microphones(mut self, mic_x: Vec<f64>, mic_y: Vec<f64>) -> Self {
        self.mic_x = mic_x;
        self.mic_y = mic_y;
        self
    }

    pub fn with_grid(mut self, grid: GridSpec) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_block_len(mut self, analysis_block_len: usize) -> Self {
        self.analysis_block_len = analysis_block_len;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    /// Microphone array described by `mic_x` / `mic_y`.
    pub fn array(&self) -> ConfigResult<MicrophoneArray> {
        MicrophoneArray::from_coordinates(&self.mic_x, &self.mic_y)
    }

    /// Sampled search grid.
    pub fn grid(&self) -> ConfigResult<Grid> {
        Grid::new(self.grid)
    }

    /// Check every field. Geometry errors are reported before DSP settings.
    pub fn validate(&self) -> ConfigResult<()> {
        self.array()?;
        self.grid()?;
        if self.analysis_block_len == 0 {
            return Err(ConfigError::InvalidBlockLength(self.analysis_block_len));
        }
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if !self.beta.is_finite() || self.beta < 0.0 {
            return Err(ConfigError::InvalidBeta(self.beta));
        }
        Ok(())
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BearingConfig {
    pub localizer: LocalizerConfig,
    pub logging: LogConfig,
}

impl BearingConfig {
    /// Load configuration from the standard search path.
    ///
    /// Returns the default configuration if no file is found.
    pub fn load() -> ConfigResult<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if Path::new(&path).exists() {
                return Self::load_from(Path::new(&path));
            }
            tracing::warn!(path = %path, "{CONFIG_ENV_VAR} points at a missing file");
        }

        for path in &Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(path);
            }
        }

        tracing::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(&content)?;
        tracing::info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Candidate configuration files, in search order (excluding the
    /// environment override).
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./bearing.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "bearing") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/bearing/config.yaml"));
        paths
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.localizer.validate()
    }

    /// Install the global subscriber described by the `logging` section.
    /// Returns `false` if a subscriber was already installed.
    pub fn init_logging(&self) -> bool {
        self.logging.install()
    }
}
