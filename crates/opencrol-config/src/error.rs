//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Syntax error, or a document that does not match the expected shape
    #[error("invalid YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `!secret` referenced a key missing from secrets.yaml
    #[error("secret '{key}' not found in secrets.yaml")]
    SecretNotFound { key: String },

    /// `!env_var` referenced an unset variable
    #[error("environment variable '{var}' is not set")]
    EnvVarNotFound { var: String },

    /// Parsed fine but failed validation
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}
