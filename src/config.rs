use std::{path::{Path, PathBuf}, time::Duration};

use serde::Deserialize;

use crate::{Error, Result};

pub const DEFAULT_API_HOST: &str = "https://api.census.gov";
pub const DEFAULT_BOUNDARY_HOST: &str = "https://www2.census.gov/geo/tiger";

/// Environment variable overriding the shapefile cache root.
pub const CACHE_DIR_ENV: &str = "CENSUSGEO_CACHE_DIR";
/// Environment variable carrying the Census API key.
pub const API_KEY_ENV: &str = "CENSUS_API_KEY";

/// Bounded retry with exponential backoff for network fetches.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles per attempt.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// Per-attempt request timeout.
    pub timeout_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
            timeout_secs: 60,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately, for tests and local mirrors.
    pub fn immediate(max_attempts: u32) -> Self {
        Self { max_attempts, base_delay_ms: 0, max_delay_ms: 0, ..Self::default() }
    }

    /// Backoff before retry number `attempt` (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }

    #[inline]
    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

/// Runtime configuration shared by the client, the cache and the joiner.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_host: String,
    pub boundary_host: String,
    pub cache_root: Option<PathBuf>,
    pub api_key: Option<String>,
    pub retry: RetryPolicy,
    pub max_fields_per_request: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            boundary_host: DEFAULT_BOUNDARY_HOST.to_string(),
            cache_root: None,
            api_key: None,
            retry: RetryPolicy::default(),
            max_fields_per_request: 50,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file; absent keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CENSUSGEO_CACHE_DIR` and `CENSUS_API_KEY` if set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
            if !dir.is_empty() { self.cache_root = Some(PathBuf::from(dir)) }
        }
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.is_empty() { self.api_key = Some(key) }
        }
        self
    }

    /// Reject settings that would make requests impossible.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.max_fields_per_request == 0 {
            return Err(Error::Config("max_fields_per_request must be at least 1".into()));
        }
        if self.api_host.is_empty() || self.boundary_host.is_empty() {
            return Err(Error::Config("hosts must not be empty".into()));
        }
        Ok(())
    }

    /// Cache root, falling back to the per-user cache directory.
    pub fn cache_root(&self) -> PathBuf {
        self.cache_root.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|d| d.join("censusgeo"))
                .unwrap_or_else(|| PathBuf::from(".censusgeo-cache"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy { base_delay_ms: 100, max_delay_ms: 500, ..RetryPolicy::default() };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(500));
        assert_eq!(policy.delay(70), Duration::from_millis(500));
    }

    #[test]
    fn partial_json_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "cache_root": "/tmp/shapes", "retry": { "max_attempts": 2 } }"#).unwrap();

        let config = Config::from_json_file(&path).unwrap();
        assert_eq!(config.cache_root(), PathBuf::from("/tmp/shapes"));
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.base_delay_ms, 500);
        assert_eq!(config.api_host, DEFAULT_API_HOST);
        assert_eq!(config.max_fields_per_request, 50);
    }

    #[test]
    fn zero_attempts_rejected() {
        let config = Config { retry: RetryPolicy::immediate(0), ..Config::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
