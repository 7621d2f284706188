//! Runtime configuration loaded from environment variables.

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::analyzers::analyzer::AnalysisOptions;

pub const DEFAULT_SNAPSHOT_SOURCE: &str = "https://a.windbornesystems.com/treasure";
pub const DEFAULT_WIND_API_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL, or local directory, holding `00.json` .. `23.json`
    pub snapshot_source: String,

    /// Forecast endpoint queried for modeled wind
    pub wind_api_url: String,

    /// Number of hourly snapshots in the window
    pub snapshot_hours: u32,

    /// Largest hour offset at which a balloon still counts as active
    pub active_window_hours: u32,

    /// Concurrent requests per fan-out
    pub max_concurrency: usize,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Reuse wind samples for identical (lat, lon, level) within a pass
    pub wind_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snapshot_source: DEFAULT_SNAPSHOT_SOURCE.to_string(),
            wind_api_url: DEFAULT_WIND_API_URL.to_string(),
            snapshot_hours: 24,
            active_window_hours: 3,
            max_concurrency: 16,
            request_timeout: Duration::from_secs(20),
            wind_cache: false,
        }
    }
}

fn parsed<T>(name: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value '{raw}' for {name}")),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for unset names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            snapshot_source: lookup("SNAPSHOT_SOURCE").unwrap_or(defaults.snapshot_source),
            wind_api_url: lookup("WIND_API_URL").unwrap_or(defaults.wind_api_url),
            snapshot_hours: parsed("SNAPSHOT_HOURS", lookup("SNAPSHOT_HOURS"), defaults.snapshot_hours)?,
            active_window_hours: parsed(
                "ACTIVE_WINDOW_HOURS",
                lookup("ACTIVE_WINDOW_HOURS"),
                defaults.active_window_hours,
            )?,
            max_concurrency: parsed("MAX_CONCURRENCY", lookup("MAX_CONCURRENCY"), defaults.max_concurrency)?,
            request_timeout: Duration::from_secs(parsed(
                "REQUEST_TIMEOUT_SECS",
                lookup("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout.as_secs(),
            )?),
            wind_cache: parsed("WIND_CACHE", lookup("WIND_CACHE"), defaults.wind_cache)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.snapshot_hours > 0, "SNAPSHOT_HOURS must be at least 1");
        anyhow::ensure!(self.max_concurrency > 0, "MAX_CONCURRENCY must be at least 1");
        anyhow::ensure!(
            self.max_concurrency <= Semaphore::MAX_PERMITS,
            "MAX_CONCURRENCY must not exceed {}",
            Semaphore::MAX_PERMITS
        );
        anyhow::ensure!(
            !self.request_timeout.is_zero(),
            "REQUEST_TIMEOUT_SECS must be at least 1"
        );
        Ok(())
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            active_window_hours: self.active_window_hours,
            concurrency: self.max_concurrency,
        }
    }

    /// Whether the snapshot source is fetched over HTTP rather than read from disk.
    pub fn snapshot_source_is_remote(&self) -> bool {
        self.snapshot_source.starts_with("http://") || self.snapshot_source.starts_with("https://")
    }
}
