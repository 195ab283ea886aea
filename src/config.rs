//! Configuration management
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. A configuration file (`wxzones.toml`, or the path passed on the command line)
//! 3. Environment variable overrides with the WXZ_ prefix (e.g. `WXZ__CACHE__TTL_SECS=60`)

use std::path::Path;
use std::time::Duration;

use chrono::Duration as TimeDelta;
use config::{ConfigError, Environment, File};
use serde::Deserialize;

use crate::timeline::AxisSpec;

pub const DEFAULT_CONFIG_FILE: &str = "wxzones";

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Weather archive configuration
    pub weather: WeatherSettings,

    /// Observation cache configuration
    pub cache: CacheSettings,

    /// Time axis configuration
    pub timeline: TimelineSettings,

    /// Log output configuration
    pub log: LogSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherSettings {
    /// Archive endpoint
    pub base_url: String,

    /// Timezone the archive reports wall-clock times in
    pub timezone: String,

    /// Upper bound on a single archive request, in seconds
    pub timeout_secs: u64,

    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    /// Age below which a cached observation is served, in seconds
    pub ttl_secs: u64,

    /// Age beyond which an entry is purged, in seconds
    pub retention_secs: u64,

    /// How often the purge runs, in seconds
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimelineSettings {
    pub days_before: i64,
    pub days_after: i64,
    pub step_minutes: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    /// File the log is written to; the terminal belongs to the UI
    pub file: String,

    /// Default filter when RUST_LOG is unset
    pub filter: String,
}

impl Settings {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .set_default("weather.base_url", crate::openmeteo::ARCHIVE_URL)?
            .set_default("weather.timezone", "Asia/Kolkata")?
            .set_default("weather.timeout_secs", 10)?
            .set_default("weather.user_agent", concat!("wxzones/", env!("CARGO_PKG_VERSION")))?
            .set_default("cache.ttl_secs", 300)?
            .set_default("cache.retention_secs", 1800)?
            .set_default("cache.sweep_interval_secs", 600)?
            .set_default("timeline.days_before", 15)?
            .set_default("timeline.days_after", 15)?
            .set_default("timeline.step_minutes", 60)?
            .set_default("log.file", "wxzones.log")?
            .set_default("log.filter", "wxzones=info")?
            .add_source(source)
            .add_source(
                Environment::with_prefix("WXZ")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

impl WeatherSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

impl TimelineSettings {
    pub fn axis_spec(&self) -> AxisSpec {
        AxisSpec {
            days_before: self.days_before,
            days_after: self.days_after,
            step: TimeDelta::try_minutes(self.step_minutes).unwrap_or_else(|| TimeDelta::hours(1)),
        }
    }
}
