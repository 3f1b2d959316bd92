// Configuration for the loop profiler
//
// Every field has a default, so a TOML file only needs the values it changes.

use crate::error::{ProfilerError, Result};
use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Construction parameters for [`crate::LoopProfiler`]
///
/// # Example
/// ```
/// use loop_profiler::ProfilerConfig;
///
/// let config = ProfilerConfig::default();
/// assert_eq!(config.interval, 3.0);
/// assert_eq!(config.max_samples, 100);
/// assert!(!config.include_wrap_around);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Seconds between periodic reports
    pub interval: f64,

    /// Samples retained per checkpoint before old ones are trimmed
    pub max_samples: usize,

    /// Severity of report messages
    #[serde(
        serialize_with = "serialize_level",
        deserialize_with = "deserialize_level"
    )]
    pub log_level: Level,

    /// Count the last-checkpoint to first-checkpoint interval as part of the cycle
    ///
    /// When disabled the wrap-around pair is left out of both the total and
    /// the report.
    pub include_wrap_around: bool,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            interval: 3.0,
            max_samples: 100,
            log_level: Level::DEBUG,
            include_wrap_around: false,
        }
    }
}

impl ProfilerConfig {
    pub fn with_interval(mut self, seconds: f64) -> Self {
        self.interval = seconds;
        self
    }

    pub fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }

    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_wrap_around(mut self, include: bool) -> Self {
        self.include_wrap_around = include;
        self
    }

    /// Report interval as a `Duration`
    ///
    /// Saturates for intervals a `Duration` cannot hold.
    pub fn interval_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval).unwrap_or(Duration::MAX)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.interval <= 0.0 || Duration::try_from_secs_f64(self.interval).is_err() {
            return Err(ProfilerError::InvalidConfig(format!(
                "interval must be a positive number of seconds, got {}",
                self.interval
            )));
        }

        if self.max_samples == 0 {
            return Err(ProfilerError::InvalidConfig(
                "max_samples must be >= 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    ///
    /// # Example TOML
    /// ```toml
    /// interval = 10.0
    /// max_samples = 500
    /// log_level = "info"
    /// include_wrap_around = true
    /// ```
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self =
            toml::from_str(content).context("Failed to parse TOML profiler configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }
}

fn serialize_level<S: Serializer>(
    level: &Level,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&level.as_str().to_ascii_lowercase())
}

fn deserialize_level<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Level, D::Error> {
    let name = String::deserialize(deserializer)?;
    name.parse::<Level>()
        .map_err(|_| serde::de::Error::custom(format!("unknown log level '{}'", name)))
}
