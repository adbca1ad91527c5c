//! Configuration management for the window limiter.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{LimiterError, Result};

/// Prefix for environment variable overrides, e.g. `WINDOW_LIMITER_MAX_REQUESTS`.
pub const ENV_PREFIX: &str = "WINDOW_LIMITER";

/// Quota configuration for a [`SlidingWindowLimiter`](crate::ratelimit::SlidingWindowLimiter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Maximum admitted requests per key inside one window
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,

    /// Length of the rolling window in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,

    /// Interval for the idle-key reaper; `None` leaves expiry purely lazy
    #[serde(default)]
    pub reaper_interval_secs: Option<u64>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_seconds: default_window_seconds(),
            reaper_interval_secs: None,
        }
    }
}

fn default_max_requests() -> u64 {
    5
}

fn default_window_seconds() -> f64 {
    60.0
}

impl LimiterConfig {
    /// Create a configuration with the given quota and no reaper.
    pub fn new(max_requests: u64, window_seconds: f64) -> Self {
        Self {
            max_requests,
            window_seconds,
            reaper_interval_secs: None,
        }
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| LimiterError::Config(format!("Failed to parse limiter config: {}", e)))
    }

    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration by layering defaults, an optional YAML file and
    /// `WINDOW_LIMITER_*` environment variables, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(
            path,
            ::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        )
    }

    fn load_with_env(path: Option<&Path>, env: ::config::Environment) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            info!(path = %path.display(), "Loading limiter configuration");
            builder = builder.add_source(
                ::config::File::from(path)
                    .format(::config::FileFormat::Yaml)
                    .required(true),
            );
        }

        let config: LimiterConfig = builder
            .add_source(env)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check the quota invariants: both values strictly positive.
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(LimiterError::InvalidConfiguration(
                "max_requests must be positive".to_string(),
            ));
        }

        if !self.window_seconds.is_finite() || self.window_seconds <= 0.0 {
            return Err(LimiterError::InvalidConfiguration(
                "window_seconds must be positive".to_string(),
            ));
        }

        if self.reaper_interval_secs == Some(0) {
            return Err(LimiterError::InvalidConfiguration(
                "reaper_interval_secs must be positive when set".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_default_config() {
        let config = LimiterConfig::default();
        assert_eq!(config.max_requests, 5);
        assert_eq!(config.window_seconds, 60.0);
        assert_eq!(config.reaper_interval_secs, None);
        assert_ok!(config.validate());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
max_requests: 100
window_seconds: 1.5
reaper_interval_secs: 30
"#;
        let config = LimiterConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.max_requests, 100);
        assert_eq!(config.window_seconds, 1.5);
        assert_eq!(config.reaper_interval_secs, Some(30));
    }

    #[test]
    fn test_parse_yaml_fills_defaults() {
        let config = LimiterConfig::from_yaml("max_requests: 3\n").unwrap();
        assert_eq!(config.max_requests, 3);
        assert_eq!(config.window_seconds, 60.0);
    }

    #[test]
    fn test_parse_yaml_rejects_garbage() {
        let result = LimiterConfig::from_yaml("max_requests: [not, a, number]");
        assert!(matches!(result, Err(LimiterError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_non_positive_values() {
        assert_err!(LimiterConfig::new(0, 60.0).validate());
        assert_err!(LimiterConfig::new(5, 0.0).validate());
        assert_err!(LimiterConfig::new(5, -1.0).validate());
        assert_err!(LimiterConfig::new(5, f64::NAN).validate());

        let mut config = LimiterConfig::new(5, 60.0);
        config.reaper_interval_secs = Some(0);
        assert_err!(config.validate());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "window-limiter-config-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, "max_requests: 7\nwindow_seconds: 10\n").unwrap();

        let config = LimiterConfig::load(Some(&path));
        std::fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert_eq!(config.max_requests, 7);
        assert_eq!(config.window_seconds, 10.0);
    }

    fn env_source(vars: &[(&str, &str)]) -> ::config::Environment {
        let map: ::config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ::config::Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(Some(map))
    }

    #[test]
    fn test_env_overrides_defaults() {
        let env = env_source(&[
            ("WINDOW_LIMITER_MAX_REQUESTS", "9"),
            ("WINDOW_LIMITER_WINDOW_SECONDS", "1.5"),
        ]);

        let config = LimiterConfig::load_with_env(None, env).unwrap();
        assert_eq!(config.max_requests, 9);
        assert_eq!(config.window_seconds, 1.5);
        assert_eq!(config.reaper_interval_secs, None);
    }

    #[test]
    fn test_env_overrides_file() {
        let path = std::env::temp_dir().join(format!(
            "window-limiter-env-config-{}.yaml",
            std::process::id()
        ));
        std::fs::write(&path, "max_requests: 7\nwindow_seconds: 10\n").unwrap();

        let env = env_source(&[("WINDOW_LIMITER_WINDOW_SECONDS", "2.5")]);
        let config = LimiterConfig::load_with_env(Some(&path), env);
        std::fs::remove_file(&path).unwrap();

        let config = config.unwrap();
        assert_eq!(config.max_requests, 7);
        assert_eq!(config.window_seconds, 2.5);
    }

    #[test]
    fn test_env_invalid_value_rejected() {
        let env = env_source(&[("WINDOW_LIMITER_MAX_REQUESTS", "0")]);

        assert!(matches!(
            LimiterConfig::load_with_env(None, env),
            Err(LimiterError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let path = std::env::temp_dir().join("window-limiter-does-not-exist.yaml");
        assert!(matches!(
            LimiterConfig::load(Some(&path)),
            Err(LimiterError::Config(_))
        ));
    }

    #[test]
    fn test_from_file_missing_is_io_error() {
        let path = std::env::temp_dir().join("window-limiter-does-not-exist.yaml");
        assert!(matches!(
            LimiterConfig::from_file(&path),
            Err(LimiterError::Io(_))
        ));
    }
}
