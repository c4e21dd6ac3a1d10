//! # Structured Logging
//!
//! The library only emits `tracing` events:
//!
//! | Target          | Level   | Event                                      |
//! |-----------------|---------|--------------------------------------------|
//! | `bearing_core`  | `info`  | localizer configured (grid, pairs, tensor) |
//! | `bearing_core`  | `warn`  | grid lags longer than an analysis block    |
//! | `bearing_core`  | `debug` | per-block estimate (frames, bearing)       |
//! | `bearing_core`  | `trace` | power accumulation detail                  |
//! | `bearing_sim`   | `debug` | rendered source                            |
//!
//! A host installs a subscriber once, usually straight from the loaded
//! configuration with [`BearingConfig::init_logging`](crate::config::BearingConfig::init_logging).
//! Without an explicit `filter`, `RUST_LOG` wins; otherwise the configured
//! level applies to the bearing crates and everything else stays at `warn`.
//!
//! ```rust,ignore
//! use bearing_core::config::BearingConfig;
//!
//! let config = BearingConfig::load()?;
//! config.init_logging();
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Crate targets the configured level applies to.
const LOG_TARGETS: [&str; 2] = ["bearing_core", "bearing_sim"];

/// Verbosity of the bearing crates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every accumulation pass
    Trace,
    /// Every estimate
    Debug,
    /// Configuration changes
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    #[default]
    Compact,
}

/// `logging:` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Attach file and line to every event
    pub source_location: bool,
    /// Raw `EnvFilter` directives; replaces both `level` and `RUST_LOG`
    pub filter: Option<String>,
}

impl LogConfig {
    /// Per-estimate events, pretty printed with source locations.
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            source_location: true,
            filter: None,
        }
    }

    /// Configuration events as JSON lines.
    pub fn production() -> Self {
        Self {
            format: LogFormat::Json,
            ..Self::default()
        }
    }

    /// Errors only.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Error,
            ..Self::default()
        }
    }

    /// Filter directives used when neither `filter` nor `RUST_LOG` is set,
    /// e.g. `warn,bearing_core=info,bearing_sim=info`.
    pub fn default_directives(&self) -> String {
        LOG_TARGETS
            .iter()
            .fold(String::from("warn"), |mut acc, target| {
                acc.push_str(&format!(",{target}={}", self.level));
                acc
            })
    }

    fn env_filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.default_directives());
        match &self.filter {
            Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| fallback()),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback()),
        }
    }

    /// Install the global subscriber. Returns `false` if one was already
    /// installed, in which case this call changes nothing.
    pub fn install(&self) -> bool {
        let located = self.source_location;
        let layer = match self.format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_file(located)
                .with_line_number(located)
                .boxed(),
            LogFormat::Pretty => fmt::layer()
                .pretty()
                .with_file(located)
                .with_line_number(located)
                .boxed(),
            LogFormat::Compact => fmt::layer()
                .compact()
                .with_file(located)
                .with_line_number(located)
                .boxed(),
        };

        tracing_subscriber::registry()
            .with(layer)
            .with(self.env_filter())
            .try_init()
            .is_ok()
    }
}
