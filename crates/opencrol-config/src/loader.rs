//! YAML loading with credential tags
//!
//! - `!secret key` is replaced by `key` from `secrets.yaml`
//! - `!env_var VAR` is replaced by the environment variable `VAR`
//!
//! Other tags are left in place; their contents are still resolved.

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;
use serde_yaml::value::TaggedValue;
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Tags this loader substitutes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Secret,
    EnvVar,
}

impl Tag {
    fn parse(tagged: &TaggedValue) -> Option<Self> {
        if tagged.tag == "secret" {
            Some(Tag::Secret)
        } else if tagged.tag == "env_var" {
            Some(Tag::EnvVar)
        } else {
            None
        }
    }

    fn name(self) -> &'static str {
        match self {
            Tag::Secret => "!secret",
            Tag::EnvVar => "!env_var",
        }
    }
}

/// Reads YAML documents relative to a config directory
pub struct YamlLoader {
    config_dir: PathBuf,
    secrets: Secrets,
}

impl YamlLoader {
    /// Loader for `config_dir`, with its `secrets.yaml` if present
    pub fn new(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.into();
        let secrets = Secrets::load(&config_dir)?;
        Ok(Self::with_secrets(config_dir, secrets))
    }

    pub fn with_secrets(config_dir: impl Into<PathBuf>, secrets: Secrets) -> Self {
        Self {
            config_dir: config_dir.into(),
            secrets,
        }
    }

    /// Read a file; relative paths are taken from the config directory
    pub fn load_file(&self, path: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        };
        debug!("Loading YAML file: {:?}", path);

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        self.load_string(&content, &path)
    }

    /// Parse a document and resolve its tags; `origin` is used in errors
    pub fn load_string(&self, content: &str, origin: &Path) -> ConfigResult<Value> {
        let mut value: Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
                path: origin.to_path_buf(),
                source: e,
            })?;
        self.resolve(&mut value)?;
        Ok(value)
    }

    fn resolve(&self, value: &mut Value) -> ConfigResult<()> {
        match value {
            Value::Tagged(tagged) => match Tag::parse(tagged) {
                Some(tag) => {
                    *value = Value::String(self.substitute(tag, &tagged.value)?);
                    Ok(())
                }
                None => self.resolve(&mut tagged.value),
            },
            Value::Mapping(map) => map.values_mut().try_for_each(|v| self.resolve(v)),
            Value::Sequence(seq) => seq.iter_mut().try_for_each(|v| self.resolve(v)),
            _ => Ok(()),
        }
    }

    fn substitute(&self, tag: Tag, argument: &Value) -> ConfigResult<String> {
        let Value::String(name) = argument else {
            return Err(ConfigError::InvalidValue {
                key: tag.name().to_string(),
                reason: "argument must be a string".to_string(),
            });
        };
        trace!("Resolving {} {}", tag.name(), name);

        match tag {
            Tag::Secret => self.secrets.get(name).map(str::to_string),
            Tag::EnvVar => std::env::var(name).map_err(|_| ConfigError::EnvVarNotFound {
                var: name.clone(),
            }),
        }
    }

    pub fn secrets(&self) -> &Secrets {
        &self.secrets
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_secret() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "secrets.yaml", "agent_password: secret123\n");
        write_file(dir.path(), "opencrol.yaml", "password: !secret agent_password\n");

        let loader = YamlLoader::new(dir.path()).unwrap();
        let value = loader.load_file("opencrol.yaml").unwrap();
        assert_eq!(
            value.get("password"),
            Some(&Value::String("secret123".to_string()))
        );
    }

    #[test]
    fn test_env_var() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("TEST_OPENCROL_LOADER_HOST", "10.0.0.7");
        write_file(
            dir.path(),
            "opencrol.yaml",
            "host: !env_var TEST_OPENCROL_LOADER_HOST\n",
        );

        let loader = YamlLoader::new(dir.path()).unwrap();
        let value = loader.load_file("opencrol.yaml").unwrap();
        assert_eq!(
            value.get("host"),
            Some(&Value::String("10.0.0.7".to_string()))
        );
        std::env::remove_var("TEST_OPENCROL_LOADER_HOST");
    }

    #[test]
    fn test_missing_env_var() {
        let dir = TempDir::new().unwrap();
        let loader = YamlLoader::new(dir.path()).unwrap();
        let result = loader.load_string(
            "password: !env_var TEST_OPENCROL_DEFINITELY_UNSET\n",
            Path::new("inline.yaml"),
        );
        assert!(matches!(result, Err(ConfigError::EnvVarNotFound { .. })));
    }

    #[test]
    fn test_missing_secret() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "secrets.yaml", "existing: value\n");

        let loader = YamlLoader::new(dir.path()).unwrap();
        let result = loader.load_string("password: !secret nonexistent\n", Path::new("x.yaml"));
        assert!(matches!(result, Err(ConfigError::SecretNotFound { .. })));
    }

    #[test]
    fn test_secret_key_must_be_string() {
        let loader = YamlLoader::with_secrets(".", Secrets::default());
        let result = loader.load_string("password: !secret [a, b]\n", Path::new("x.yaml"));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_unknown_tag_preserved() {
        let loader = YamlLoader::with_secrets(".", Secrets::default());
        let value = loader
            .load_string("extra: !custom value\n", Path::new("x.yaml"))
            .unwrap();
        assert!(matches!(value.get("extra"), Some(Value::Tagged(_))));
    }
}
