//! Typed agent configuration

use crate::error::{ConfigError, ConfigResult};
use crate::loader::YamlLoader;
use opencrol_client::{
    ClientSettings, RetryPolicy, INITIAL_RETRY_DELAY, MAX_RETRIES, MAX_RETRY_DELAY,
};
use opencrol_core::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default file name looked up next to `secrets.yaml`
pub const DEFAULT_CONFIG_FILE: &str = "opencrol.yaml";

/// Default polling cadence in seconds
pub const DEFAULT_SCAN_INTERVAL: u64 = 10;

/// One agent connection as written in `opencrol.yaml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenCtrolConfig {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Takes precedence over `host`/`port`
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    /// Seconds between refreshes
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Retry settings in seconds, as they appear in YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay")]
    pub initial_delay: f64,

    #[serde(default = "default_max_delay")]
    pub max_delay: f64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_scan_interval() -> u64 {
    DEFAULT_SCAN_INTERVAL
}

fn default_max_retries() -> u32 {
    MAX_RETRIES
}

fn default_initial_delay() -> f64 {
    INITIAL_RETRY_DELAY.as_secs_f64()
}

fn default_max_delay() -> f64 {
    MAX_RETRY_DELAY.as_secs_f64()
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> ConfigResult<RetryPolicy> {
        Ok(RetryPolicy::new(
            self.max_retries,
            seconds("retry.initial_delay", self.initial_delay)?,
            seconds("retry.max_delay", self.max_delay)?,
        ))
    }
}

/// Non-negative seconds that fit in a `Duration`
fn seconds(key: &str, value: f64) -> ConfigResult<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| invalid(key, "must be a non-negative number of seconds within range"))
}

impl OpenCtrolConfig {
    /// Config for a host with every other field defaulted
    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            port: DEFAULT_PORT,
            base_url: None,
            password: None,
            client_id: None,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            retry: RetryConfig::default(),
        }
    }

    /// Load from a YAML file, resolving tags against the file's directory
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let config_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let loader = YamlLoader::new(config_dir)?;
        let value = match path.file_name() {
            Some(name) => loader.load_file(name)?,
            None => loader.load_file(path)?,
        };
        let config = Self::from_value(value).map_err(|e| match e {
            ConfigError::ParseYaml { source, .. } => ConfigError::ParseYaml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        info!(
            "Loaded configuration for {} from {:?}",
            config.base_url().unwrap_or_default(),
            path
        );
        Ok(config)
    }

    /// Deserialize and validate an already tag-processed YAML value
    pub fn from_value(value: serde_yaml::Value) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml::from_value(value).map_err(|e| ConfigError::ParseYaml {
                path: Path::new(DEFAULT_CONFIG_FILE).to_path_buf(),
                source: e,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_url.is_none() && self.host.as_deref().map_or(true, str::is_empty) {
            return Err(invalid("host", "either host or base_url is required"));
        }
        if self.port == 0 {
            return Err(invalid("port", "must be between 1 and 65535"));
        }
        if self.scan_interval == 0 {
            return Err(invalid("scan_interval", "must be greater than zero"));
        }

        let retry = self.retry.policy()?;
        if retry.max_delay < retry.initial_delay {
            return Err(invalid(
                "retry.max_delay",
                "must not be smaller than retry.initial_delay",
            ));
        }
        Ok(())
    }

    /// Explicit `base_url`, else `http://{host}:{port}`
    pub fn base_url(&self) -> ConfigResult<String> {
        if let Some(url) = &self.base_url {
            return Ok(url.trim_end_matches('/').to_string());
        }
        match self.host.as_deref() {
            Some(host) if !host.is_empty() => Ok(format!("http://{}:{}", host, self.port)),
            _ => Err(invalid("host", "either host or base_url is required")),
        }
    }

    /// Configured client id, falling back to the host
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref().or(self.host.as_deref())
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }

    pub fn client_settings(&self) -> ConfigResult<ClientSettings> {
        Ok(ClientSettings::new(self.base_url()?)
            .with_password(self.password.clone())
            .with_retry(self.retry.policy()?))
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn parse(yaml: &str) -> ConfigResult<OpenCtrolConfig> {
        OpenCtrolConfig::from_value(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_defaults() {
        let config = parse("host: 192.168.1.20\n").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.scan_interval, 10);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.base_url().unwrap(), "http://192.168.1.20:8080");
        assert_eq!(config.update_interval(), Duration::from_secs(10));
        assert_eq!(config.client_id(), Some("192.168.1.20"));
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let config = parse("host: ignored\nbase_url: http://agent.lan:9000/\n").unwrap();
        assert_eq!(config.base_url().unwrap(), "http://agent.lan:9000");
    }

    #[test]
    fn test_validation() {
        assert!(parse("port: 8080\n").is_err());
        assert!(parse("host: a\nport: 0\n").is_err());
        assert!(parse("host: a\nscan_interval: 0\n").is_err());
        assert!(parse("host: a\nretry: { initial_delay: -1.0 }\n").is_err());
        assert!(parse("host: a\nretry: { initial_delay: 5.0, max_delay: 2.0 }\n").is_err());
        assert!(parse("host: a\nretry: { max_delay: .inf }\n").is_err());
        assert!(matches!(
            parse("host: a\nretry: { initial_delay: 1.0, max_delay: 1.0e300 }\n"),
            Err(ConfigError::InvalidValue { key, .. }) if key == "retry.max_delay"
        ));
        assert!(parse("host: a\nretry: { max_retries: 0, initial_delay: 0.0, max_delay: 0.0 }\n").is_ok());
    }

    #[test]
    fn test_client_settings() {
        let config = parse(
            "host: pc\npassword: hunter2\nretry: { max_retries: 5, initial_delay: 0.5, max_delay: 4.0 }\n",
        )
        .unwrap();
        let settings = config.client_settings().unwrap();
        assert_eq!(settings.base_url, "http://pc:8080");
        assert_eq!(settings.password.as_deref(), Some("hunter2"));
        assert_eq!(settings.retry.max_retries, 5);
        assert_eq!(settings.retry.initial_delay, Duration::from_millis(500));
        assert_eq!(settings.retry.max_delay, Duration::from_secs(4));
    }

    #[test]
    fn test_empty_password_means_none() {
        let config = parse("host: pc\npassword: \"\"\n").unwrap();
        assert_eq!(config.client_settings().unwrap().password, None);
    }

    #[test]
    fn test_load_with_secret() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("secrets.yaml"), "opencrol_password: s3cret\n").unwrap();
        fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            "host: 10.0.0.5\nport: 8181\npassword: !secret opencrol_password\nclient_id: office-pc\n",
        )
        .unwrap();

        let config = OpenCtrolConfig::load(dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(config.password.as_deref(), Some("s3cret"));
        assert_eq!(config.client_id(), Some("office-pc"));
        assert_eq!(config.base_url().unwrap(), "http://10.0.0.5:8181");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = OpenCtrolConfig::load(dir.path().join("nope.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }
}
