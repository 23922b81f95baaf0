//! CLI settings.
//!
//! Layered with the `config` crate, lowest priority first:
//! 1. Defaults
//! 2. Optional TOML file (`forecast.toml` unless `--config` says otherwise)
//! 3. Environment variables prefixed `FORECAST_`
//!
//! Settings only fill gaps in a request; values present in the request win.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ::config::{Config, Environment, File};
use forecast_engine::SimulationConfig;
use serde::{Deserialize, Deserializer};

use crate::{CliError, Result};

/// Log levels accepted in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = CliError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(CliError::InvalidLogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Filter directive for `tracing_subscriber::EnvFilter`.
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

fn deserialize_log_level<'de, D>(deserializer: D) -> std::result::Result<LogLevel, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    LogLevel::from_str(&s).map_err(serde::de::Error::custom)
}

/// Settings shared by every command.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct CliSettings {
    /// Log level used when `RUST_LOG` is unset.
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    /// Seed applied to requests without one.
    pub default_seed: Option<u64>,
    /// Worker pool size applied to requests without one.
    pub worker_threads: Option<usize>,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl CliSettings {
    /// Loads settings from `path` (if it exists) and the process environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Loads settings with an explicit environment map instead of the
    /// process environment when `env` is `Some`.
    pub fn load_with_env(path: &Path, env: Option<HashMap<String, String>>) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("FORECAST")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;
        let settings: CliSettings = settings.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == Some(0) {
            return Err(CliError::InvalidArgument(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Fills the seed and worker pool size where the request left them unset.
    pub fn apply_to(&self, config: &mut SimulationConfig) {
        if config.seed.is_none() {
            config.seed = self.default_seed;
        }
        if config.worker_threads.is_none() {
            config.worker_threads = self.worker_threads;
        }
    }
}
