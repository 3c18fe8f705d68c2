//! `secrets.yaml` lookup for `!secret` tags

use crate::error::{ConfigError, ConfigResult};
use serde_yaml::Value;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the config directory
pub const SECRETS_FILE: &str = "secrets.yaml";

/// Values from `secrets.yaml`, coerced to strings
///
/// `Debug` lists key names only, never values.
#[derive(Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
    source: Option<PathBuf>,
}

impl Secrets {
    /// Load `<config_dir>/secrets.yaml`; a missing file is an empty store
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        let path = config_dir.join(SECRETS_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No {} in {:?}", SECRETS_FILE, config_dir);
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::ReadFile { path, source: e }),
        };

        let values = parse(&content).map_err(|e| ConfigError::ParseYaml {
            path: path.clone(),
            source: e,
        })?;
        debug!("Loaded {} secrets from {:?}", values.len(), path);

        Ok(Self {
            values,
            source: Some(path),
        })
    }

    /// Build a store from in-memory pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            source: None,
        }
    }

    pub fn get(&self, key: &str) -> ConfigResult<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::SecretNotFound {
                key: key.to_string(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Key names in sorted order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// The file these secrets came from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("keys", &self.keys())
            .field("source", &self.source)
            .finish()
    }
}

fn parse(content: &str) -> Result<HashMap<String, String>, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(HashMap::new());
    }

    let mapping: serde_yaml::Mapping = serde_yaml::from_str(content)?;
    Ok(mapping
        .into_iter()
        .map(|(k, v)| (scalar_string(k), scalar_string(v)))
        .collect())
}

/// Scalars keep their textual form; anything else is re-serialized
fn scalar_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
