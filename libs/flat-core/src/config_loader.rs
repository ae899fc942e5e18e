//! Layered configuration loading
//!
//! Precedence, lowest first: defaults, each config file in order, then the
//! `FLAT_*` environment variables.

use crate::config::{ConfigOverlay, FlatConfig};
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Builds a [`FlatConfig`] from every configured source
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_config: FlatConfig,
    config_paths: Vec<PathBuf>,
    /// Paths that must exist
    required_paths: Vec<PathBuf>,
    load_from_env: bool,
    validate: bool,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            base_config: FlatConfig::default(),
            config_paths: Self::default_config_paths(),
            required_paths: Vec::new(),
            load_from_env: true,
            validate: true,
        }
    }

    #[must_use]
    pub fn with_base_config(mut self, config: FlatConfig) -> Self {
        self.base_config = config;
        self
    }

    /// Add a file that must exist; it is applied after the others
    #[must_use]
    pub fn add_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.required_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Replace the optional file list
    #[must_use]
    pub fn with_config_paths<P: AsRef<Path>>(mut self, paths: Vec<P>) -> Self {
        self.config_paths = paths
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        self
    }

    #[must_use]
    pub const fn with_env_loading(mut self, enabled: bool) -> Self {
        self.load_from_env = enabled;
        self
    }

    #[must_use]
    pub const fn with_validation(mut self, enabled: bool) -> Self {
        self.validate = enabled;
        self
    }

    /// Resolve the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a required file is missing, any present file or
    /// environment variable does not parse, or the result is invalid
    pub fn load(&self) -> Result<FlatConfig> {
        let mut config = self.base_config.clone();

        for path in &self.config_paths {
            if path.exists() {
                config.apply(ConfigOverlay::from_file(path)?);
                info!(path = %path.display(), "Loaded configuration file");
            } else {
                debug!(path = %path.display(), "Configuration file not found");
            }
        }
        for path in &self.required_paths {
            config.apply(ConfigOverlay::from_file(path)?);
            info!(path = %path.display(), "Loaded configuration file");
        }

        if self.load_from_env {
            let overlay = ConfigOverlay::from_env()?;
            if !overlay.is_empty() {
                debug!("Applying FLAT_* environment variables");
                config.apply(overlay);
            }
        }

        if self.validate {
            config.validate()?;
        }
        Ok(config)
    }

    /// `flat.{yaml,yml,json}` in the working directory, then in the user
    /// config directory
    #[must_use]
    pub fn default_config_paths() -> Vec<PathBuf> {
        let names = ["flat.yaml", "flat.yml", "flat.json"];
        let user_dir = Self::user_config_dir();
        names
            .iter()
            .map(PathBuf::from)
            .chain(
                user_dir
                    .into_iter()
                    .flat_map(|dir| names.iter().map(move |name| dir.join(name))),
            )
            .collect()
    }

    /// `$HOME/.config/flat`, or the roaming app data directory on Windows
    #[must_use]
    pub fn user_config_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(PathBuf::from(home).join(".config").join("flat"))
        } else if let Ok(profile) = std::env::var("USERPROFILE") {
            Some(
                PathBuf::from(profile)
                    .join("AppData")
                    .join("Roaming")
                    .join("flat"),
            )
        } else {
            None
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Defaults, the standard file locations and the environment
///
/// # Errors
///
/// Returns an error if a source does not parse or the result is invalid
pub fn load_config() -> Result<FlatConfig> {
    ConfigLoader::new().load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use serial_test::serial;
    use tempfile::TempDir;

    fn isolated() -> ConfigLoader {
        ConfigLoader::new().with_config_paths::<PathBuf>(vec![])
    }

    #[test]
    #[serial]
    fn test_base_config_survives_without_sources() {
        let mut base = FlatConfig::default();
        base.storage_key = "custom".to_string();
        let config = isolated()
            .with_base_config(base)
            .with_env_loading(false)
            .load()
            .unwrap();
        assert_eq!(config.storage_key, "custom");
    }

    #[test]
    #[serial]
    fn test_later_files_win() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.yaml");
        let second = dir.path().join("b.json");
        std::fs::write(&first, "log_level: debug\npersist: false\n").unwrap();
        std::fs::write(&second, r#"{"log_level": "warn"}"#).unwrap();

        let config = ConfigLoader::new()
            .with_config_paths(vec![&first, &second])
            .with_env_loading(false)
            .load()
            .unwrap();
        assert_eq!(config.log_level, "warn");
        assert!(!config.persist);
    }

    #[test]
    #[serial]
    fn test_missing_required_file_fails() {
        let dir = TempDir::new().unwrap();
        let result = isolated()
            .add_config_path(dir.path().join("absent.yaml"))
            .with_env_loading(false)
            .load();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_environment_has_highest_precedence() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("flat.yaml");
        std::fs::write(&file, "backend: memory\nstorage_key: fromFile\n").unwrap();

        std::env::set_var("FLAT_STORAGE_KEY", "fromEnv");
        std::env::set_var("FLAT_STORAGE_BACKEND", "sqlite");
        std::env::set_var("FLAT_STORAGE_PATH", dir.path().join("flat.db"));
        let config = isolated().add_config_path(&file).load();
        std::env::remove_var("FLAT_STORAGE_KEY");
        std::env::remove_var("FLAT_STORAGE_BACKEND");
        std::env::remove_var("FLAT_STORAGE_PATH");

        let config = config.unwrap();
        assert_eq!(config.storage_key, "fromEnv");
        assert_eq!(config.backend, StorageBackend::Sqlite);
    }

    #[test]
    #[serial]
    fn test_invalid_result_is_rejected() {
        std::env::set_var("FLAT_LOG_LEVEL", "chatty");
        let result = isolated().load();
        std::env::remove_var("FLAT_LOG_LEVEL");
        assert!(result.is_err());
    }

    #[test]
    fn test_default_paths() {
        let paths = ConfigLoader::default_config_paths();
        assert!(paths.iter().any(|p| p == Path::new("flat.yaml")));
        assert!(paths.iter().any(|p| p == Path::new("flat.json")));
    }
}
