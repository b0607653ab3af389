use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mtree_collector::FilterOptions;
use mtree_log::LogConfig;
use mtree_tree::DefinitionOptions;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The name of the configuration file within a config directory.
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Characters that cannot separate namespace elements.
const RESERVED_SEPARATORS: &[char] = &['[', ']', '{', '}', '*', '=', '-', '_', '.'];

/// Defines the source of a config error.
#[derive(Debug)]
enum ConfigErrorSource {
    /// An error occurring independently.
    None,
    /// An error originating from a configuration file.
    File(PathBuf),
    /// An error originating from the value of a field.
    Field(&'static str),
}

/// Indicates config related errors.
#[derive(Debug)]
pub struct ConfigError {
    source: ConfigErrorSource,
    kind: ConfigErrorKind,
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConfigError {
    #[inline]
    fn new(kind: ConfigErrorKind) -> Self {
        Self {
            source: ConfigErrorSource::None,
            kind,
            cause: None,
        }
    }

    #[inline]
    fn wrap<E>(cause: E, kind: ConfigErrorKind) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            cause: Some(Box::new(cause)),
            ..Self::new(kind)
        }
    }

    #[inline]
    fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.source = ConfigErrorSource::File(path.as_ref().to_path_buf());
        self
    }

    #[inline]
    fn field(mut self, name: &'static str) -> Self {
        self.source = ConfigErrorSource::Field(name);
        self
    }

    /// Returns the error kind of the error.
    pub fn kind(&self) -> ConfigErrorKind {
        self.kind
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            ConfigErrorSource::None => self.kind.fmt(f),
            ConfigErrorSource::File(file_name) => {
                write!(f, "{} (file {})", self.kind, file_name.display())
            }
            ConfigErrorSource::Field(name) => write!(f, "{} (field {name})", self.kind),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Indicates config related errors.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, thiserror::Error)]
pub enum ConfigErrorKind {
    /// Failed to open the file.
    #[error("could not open config file")]
    CouldNotOpenFile,
    /// Parsing YAML failed.
    #[error("could not parse yaml config file")]
    BadYaml,
    /// Parsing JSON failed.
    #[error("could not parse json config")]
    BadJson,
    /// Invalid config value.
    #[error("invalid config value")]
    InvalidValue,
}

/// The complete configuration of a plugin.
///
/// Every field has a default, so a configuration file only needs to contain the values it changes:
///
/// ```yaml
/// logging:
///   level: debug
/// definition:
///   separator: ":"
///   allow_dynamic_last_element: true
/// filters:
///   strict: true
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Controls the logging system.
    pub logging: LogConfig,
    /// Options of the metric definitions.
    pub definition: DefinitionOptions,
    /// Controls how the filter rules of tasks are loaded.
    pub filters: FilterOptions,
}

impl Config {
    /// Loads the config from `config.yml` in the given directory.
    ///
    /// A missing file is an error, while missing fields take their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().join(CONFIG_FILE_NAME);

        let file = fs::File::open(&path)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile).file(&path))?;

        let config = load_yaml::<Self>(io::BufReader::new(file)).map_err(|e| e.file(&path))?;

        config.validate().map_err(|e| e.file(&path))?;
        Ok(config)
    }

    /// Creates a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadJson))?;

        config.validate()?;
        Ok(config)
    }

    /// Creates a config from a JSON value.
    ///
    /// This is mostly useful for tests.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadJson))?;

        config.validate()?;
        Ok(config)
    }

    /// Serializes the config to YAML.
    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::InvalidValue))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let separator = self.definition.separator;
        if separator.is_alphanumeric()
            || separator.is_whitespace()
            || RESERVED_SEPARATORS.contains(&separator)
        {
            return Err(
                ConfigError::new(ConfigErrorKind::InvalidValue).field("definition.separator")
            );
        }

        Ok(())
    }
}

fn load_yaml<T: DeserializeOwned>(mut reader: impl io::Read) -> Result<T, ConfigError> {
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|e| ConfigError::wrap(e, ConfigErrorKind::CouldNotOpenFile))?;

    // An empty file stands for all defaults.
    if contents.trim().is_empty() {
        contents.push_str("{}");
    }

    serde_yaml::from_str(&contents).map_err(|e| ConfigError::wrap(e, ConfigErrorKind::BadYaml))
}
