//! Store configuration
//!
//! [`FlatConfig`] is the resolved configuration. Files and environment
//! variables are read as [`ConfigOverlay`]s, where every field is optional,
//! and applied on top of the defaults by [`crate::config_loader::ConfigLoader`].

use crate::error::{FlatError, Result};
use flat_common::STORAGE_KEY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

/// Where the persisted blob lives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = FlatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(FlatError::configuration(format!(
                "Unknown storage backend '{other}' (expected memory or sqlite)"
            ))),
        }
    }
}

/// Resolved store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatConfig {
    pub backend: StorageBackend,
    /// SQLite file, required for the sqlite backend
    pub storage_path: Option<PathBuf>,
    pub storage_key: String,
    /// Write the database back after every mutation
    pub persist: bool,
    pub seed_when_empty: bool,
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for FlatConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            storage_path: None,
            storage_key: STORAGE_KEY.to_string(),
            persist: true,
            seed_when_empty: true,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl FlatConfig {
    /// Configuration backed by an SQLite file
    #[must_use]
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            storage_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Layer `overlay` over this configuration; unset fields are kept
    pub fn apply(&mut self, overlay: ConfigOverlay) {
        if let Some(backend) = overlay.backend {
            self.backend = backend;
        }
        if let Some(path) = overlay.storage_path {
            self.storage_path = Some(path);
        }
        if let Some(key) = overlay.storage_key {
            self.storage_key = key;
        }
        if let Some(persist) = overlay.persist {
            self.persist = persist;
        }
        if let Some(seed) = overlay.seed_when_empty {
            self.seed_when_empty = seed;
        }
        if let Some(level) = overlay.log_level {
            self.log_level = level;
        }
        if let Some(json_logs) = overlay.json_logs {
            self.json_logs = json_logs;
        }
    }

    /// The SQLite file of the sqlite backend
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no path is set
    pub fn sqlite_path(&self) -> Result<&Path> {
        self.storage_path
            .as_deref()
            .ok_or_else(|| FlatError::configuration("sqlite backend needs a storage path"))
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown log level, an empty
    /// storage key, or the sqlite backend without a path
    pub fn validate(&self) -> Result<()> {
        self.log_level.parse::<Level>().map_err(|_| {
            FlatError::configuration(format!("Invalid log level '{}'", self.log_level))
        })?;
        if self.storage_key.trim().is_empty() {
            return Err(FlatError::configuration("storage key must not be empty"));
        }
        if self.backend == StorageBackend::Sqlite {
            self.sqlite_path()?;
        }
        Ok(())
    }

    /// Load a complete configuration from a YAML or JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::default();
        config.apply(ConfigOverlay::from_file(path)?);
        Ok(config)
    }

    /// Write the configuration as YAML (`.yaml`/`.yml`) or JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be encoded or written
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).map_err(|e| {
                FlatError::configuration(format!("Failed to encode YAML config: {e}"))
            })?
        } else {
            serde_json::to_string_pretty(self)?
        };
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    )
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(FlatError::configuration(format!(
            "Invalid {name} value '{value}'"
        ))),
    }
}

/// Partial configuration from one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverlay {
    pub backend: Option<StorageBackend>,
    pub storage_path: Option<PathBuf>,
    pub storage_key: Option<String>,
    pub persist: Option<bool>,
    pub seed_when_empty: Option<bool>,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

impl ConfigOverlay {
    /// Read an overlay from YAML (`.yaml`/`.yml`) or JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlatError::Io(std::io::Error::other(format!(
                "Failed to read config file {}: {e}",
                path.display()
            )))
        })?;
        if is_yaml(path) {
            serde_yaml::from_str(&content).map_err(|e| {
                FlatError::configuration(format!("Failed to parse YAML config: {e}"))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                FlatError::configuration(format!("Failed to parse JSON config: {e}"))
            })
        }
    }

    /// Read the `FLAT_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a variable that does not parse
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build an overlay from any variable source
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a variable that does not parse
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut overlay = Self::default();
        if let Some(backend) = lookup("FLAT_STORAGE_BACKEND") {
            overlay.backend = Some(backend.parse()?);
        }
        overlay.storage_path = lookup("FLAT_STORAGE_PATH").map(PathBuf::from);
        overlay.storage_key = lookup("FLAT_STORAGE_KEY");
        if let Some(persist) = lookup("FLAT_PERSIST") {
            overlay.persist = Some(parse_bool("FLAT_PERSIST", &persist)?);
        }
        if let Some(seed) = lookup("FLAT_SEED_WHEN_EMPTY") {
            overlay.seed_when_empty = Some(parse_bool("FLAT_SEED_WHEN_EMPTY", &seed)?);
        }
        overlay.log_level = lookup("FLAT_LOG_LEVEL");
        if let Some(json_logs) = lookup("FLAT_JSON_LOGS") {
            overlay.json_logs = Some(parse_bool("FLAT_JSON_LOGS", &json_logs)?);
        }
        Ok(overlay)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
