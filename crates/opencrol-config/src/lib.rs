//! Configuration for OpenCtrol agent connections
//!
//! Loads `opencrol.yaml`, resolving `!secret` against `secrets.yaml` in the
//! same directory and `!env_var` against the process environment, then
//! validates it into an [`OpenCtrolConfig`].

mod config;
mod error;
mod loader;
mod secrets;

pub use config::{OpenCtrolConfig, RetryConfig, DEFAULT_CONFIG_FILE, DEFAULT_SCAN_INTERVAL};
pub use error::{ConfigError, ConfigResult};
pub use loader::YamlLoader;
pub use secrets::{Secrets, SECRETS_FILE};
