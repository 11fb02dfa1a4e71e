//! Application configuration.
//!
//! # Responsibility
//! - Load the TOML file naming the store and the log destination.
//! - Open the configured store.
//!
//! ```toml
//! [store]
//! path = "/var/lib/crnotes/notes.sqlite3"   # or ":memory:"
//!
//! [logging]
//! level = "info"
//! dir = "/var/log/crnotes"
//! ```

use crate::kv::{KvResult, SharedStore, SqliteStore};
use crate::logging::{init_logging, LogLevel};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Store path that selects an ephemeral in-memory database.
pub const MEMORY_STORE_PATH: &str = ":memory:";

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "malformed config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<LogLevel>,
    /// Logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Config for a store file with logging disabled.
    pub fn for_store_path(path: impl Into<String>) -> Result<Self, ConfigError> {
        let config = Self {
            store: StoreConfig { path: path.into() },
            logging: LoggingConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::Invalid("store.path cannot be empty".to_string()));
        }
        if let Some(dir) = self.logging.dir.as_deref() {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn is_memory(&self) -> bool {
        self.path == MEMORY_STORE_PATH
    }

    pub fn open(&self) -> KvResult<SharedStore> {
        let store = if self.is_memory() {
            SqliteStore::open_in_memory()?
        } else {
            SqliteStore::open(&self.path)?
        };
        Ok(Arc::new(store))
    }
}

impl LoggingConfig {
    pub fn effective_level(&self) -> LogLevel {
        self.level.unwrap_or_else(LogLevel::build_default)
    }

    /// Starts file logging when a directory is configured. Returns whether
    /// logging is active.
    pub fn init(&self) -> Result<bool, String> {
        match self.dir.as_deref() {
            Some(dir) => init_logging(self.effective_level(), dir).map(|()| true),
            None => Ok(false),
        }
    }
}
