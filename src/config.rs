use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::Level;

use crate::distributor::DistributorConfig;
use crate::error::VitalsError;

/// Runtime settings. Every field has a default, so an empty (or absent)
/// TOML file yields the stock dashboard.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Cadence of the combined chart point (ms)
    #[serde(default = "default_aggregate_interval_ms")]
    pub aggregate_interval_ms: u64,

    /// Points kept for the time-series chart
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Per-subscription refresh: base + random jitter (ms)
    #[serde(default = "default_refresh_base_ms")]
    pub refresh_base_ms: u64,
    #[serde(default = "default_refresh_jitter_ms")]
    pub refresh_jitter_ms: u64,

    /// Delivered samples kept per method for percentile summaries
    #[serde(default = "default_window")]
    pub window: usize,

    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_listen() -> String {
    "0.0.0.0:3000".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_aggregate_interval_ms() -> u64 {
    3_000
}
fn default_buffer_capacity() -> usize {
    10
}
fn default_refresh_base_ms() -> u64 {
    5_000
}
fn default_refresh_jitter_ms() -> u64 {
    10_000
}
fn default_window() -> usize {
    crate::metrics::collector::DEFAULT_WINDOW
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
            aggregate_interval_ms: default_aggregate_interval_ms(),
            buffer_capacity: default_buffer_capacity(),
            refresh_base_ms: default_refresh_base_ms(),
            refresh_jitter_ms: default_refresh_jitter_ms(),
            window: default_window(),
            seed: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VitalsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VitalsError::Config(format!("unable to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, VitalsError> {
        let config: Config = toml::from_str(content)
            .map_err(|e| VitalsError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), VitalsError> {
        if self.aggregate_interval_ms == 0 {
            return Err(VitalsError::Config("aggregate_interval_ms must be > 0".into()));
        }
        if self.refresh_base_ms == 0 {
            return Err(VitalsError::Config("refresh_base_ms must be > 0".into()));
        }
        if self.buffer_capacity == 0 {
            return Err(VitalsError::Config("buffer_capacity must be >= 1".into()));
        }
        if self.window == 0 {
            return Err(VitalsError::Config("window must be >= 1".into()));
        }
        self.level()?;
        self.listen_addr()?;
        Ok(())
    }

    pub fn level(&self) -> Result<Level, VitalsError> {
        self.log_level
            .parse()
            .map_err(|_| VitalsError::Config(format!("unknown log level \"{}\"", self.log_level)))
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, VitalsError> {
        self.listen
            .parse()
            .map_err(|e| VitalsError::Config(format!("bad listen address \"{}\": {e}", self.listen)))
    }

    pub fn distributor(&self) -> DistributorConfig {
        DistributorConfig {
            aggregate_interval: Duration::from_millis(self.aggregate_interval_ms),
            buffer_capacity: self.buffer_capacity,
            refresh_base: Duration::from_millis(self.refresh_base_ms),
            refresh_jitter: Duration::from_millis(self.refresh_jitter_ms),
            window: self.window,
            seed: self.seed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.listen, "0.0.0.0:3000");
        assert_eq!(config.aggregate_interval_ms, 3_000);
        assert_eq!(config.buffer_capacity, 10);
        assert_eq!(config.level().unwrap(), Level::INFO);

        let d = config.distributor();
        assert_eq!(d.refresh_base, Duration::from_secs(5));
        assert_eq!(d.refresh_jitter, Duration::from_secs(10));
        assert!(d.seed.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::parse(
            r#"
            listen = "127.0.0.1:8080"
            log_level = "debug"
            buffer_capacity = 20
            seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.listen_addr().unwrap().port(), 8080);
        assert_eq!(config.level().unwrap(), Level::DEBUG);
        assert_eq!(config.distributor().buffer_capacity, 20);
        assert_eq!(config.seed, Some(42));
    }

    #[test]
    fn rejects_zero_intervals() {
        let err = Config::parse("aggregate_interval_ms = 0").unwrap_err();
        assert!(matches!(err, VitalsError::Config(_)));
        assert!(Config::parse("buffer_capacity = 0").is_err());
    }

    #[test]
    fn rejects_unknown_keys_and_levels() {
        assert!(Config::parse("colour = \"blue\"").is_err());
        assert!(Config::parse("log_level = \"loud\"").is_err());
    }

    #[test]
    fn default_matches_empty_file() {
        let a = Config::default();
        let b = Config::parse("").unwrap();
        assert_eq!(a.listen, b.listen);
        assert_eq!(a.window, b.window);
        assert_eq!(a.refresh_jitter_ms, b.refresh_jitter_ms);
    }
}
