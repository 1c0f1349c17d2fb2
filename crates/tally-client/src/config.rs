//! Client configuration
//!
//! Loaded from a TOML file or built programmatically. Every knob has a
//! default so a config file only needs to name the values it overrides.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings for one [`crate::ApiClient`] instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL every request path is joined to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout, applied to each dispatch attempt separately.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Upper bound on dispatch attempts for one request, initial try
    /// included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Tokens expiring within this window are refreshed before dispatch.
    #[serde(default = "default_refresh_ahead_secs")]
    pub refresh_ahead_secs: u64,

    /// First retry delay; doubles on each subsequent retry.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Cap on the computed retry delay.
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,
}

fn default_base_url() -> String {
    "https://api.tally.app".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_refresh_ahead_secs() -> u64 {
    300
}

fn default_retry_base_ms() -> u64 {
    200
}

fn default_retry_max_ms() -> u64 {
    5000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            refresh_ahead_secs: default_refresh_ahead_secs(),
            retry_base_ms: default_retry_base_ms(),
            retry_max_ms: default_retry_max_ms(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants a usable config must hold.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry_base_ms == 0 {
            return Err(ConfigError::Invalid(
                "retry_base_ms must be greater than 0".to_string(),
            ));
        }
        if self.retry_max_ms < self.retry_base_ms {
            return Err(ConfigError::Invalid(
                "retry_max_ms must be at least retry_base_ms".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_ahead(&self) -> Duration {
        Duration::from_secs(self.refresh_ahead_secs)
    }

    pub fn retry_base(&self) -> Duration {
        Duration::from_millis(self.retry_base_ms)
    }

    pub fn retry_max(&self) -> Duration {
        Duration::from_millis(self.retry_max_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "https://api.tally.app");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.refresh_ahead_secs, 300);
        assert_eq!(config.retry_base_ms, 200);
        assert_eq!(config.retry_max_ms, 5000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "base_url = \"https://staging.tally.app\"\n").unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "https://staging.tally.app");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_base_ms, 200);
    }

    #[test]
    fn full_file_overrides_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            r#"
base_url = "http://localhost:4000"
request_timeout_secs = 5
max_attempts = 2
refresh_ahead_secs = 60
retry_base_ms = 50
retry_max_ms = 400
"#,
        )
        .unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "http://localhost:4000");
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.refresh_ahead_secs, 60);
        assert_eq!(config.retry_base_ms, 50);
        assert_eq!(config.retry_max_ms, 400);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientConfig::load(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "base_url = [not toml").unwrap();
        assert!(matches!(
            ClientConfig::load(&path),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let config = ClientConfig {
            base_url: "api.tally.app".to_string(),
            ..ClientConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = ClientConfig {
            request_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_attempts() {
        let config = ClientConfig {
            max_attempts: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_base_delay() {
        let config = ClientConfig {
            retry_base_ms: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_cap_below_base_delay() {
        let config = ClientConfig {
            retry_base_ms: 500,
            retry_max_ms: 100,
            ..ClientConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry_max_ms"));
    }

    #[test]
    fn duration_accessors_convert_units() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.refresh_ahead(), Duration::from_secs(300));
        assert_eq!(config.retry_base(), Duration::from_millis(200));
        assert_eq!(config.retry_max(), Duration::from_millis(5000));
    }
}
