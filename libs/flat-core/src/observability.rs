//! Tracing subscriber setup
//!
//! Libraries only emit `tracing` events; binaries call [`init_tracing`] once
//! at startup.

use crate::config::FlatConfig;
use crate::error::{FlatError, Result};
use tracing::{info, Level};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging options of a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Default filter level; `RUST_LOG` overrides it
    pub level: String,
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl From<&FlatConfig> for LogSettings {
    fn from(config: &FlatConfig) -> Self {
        Self {
            level: config.log_level.clone(),
            json: config.json_logs,
        }
    }
}

/// Install the global subscriber
///
/// Returns `Ok(false)` when a subscriber was already installed, so calling
/// this more than once is harmless.
///
/// # Errors
///
/// Returns a configuration error for an unknown level
pub fn init_tracing(settings: &LogSettings) -> Result<bool> {
    settings
        .level
        .parse::<Level>()
        .map_err(|e| FlatError::configuration(format!("Invalid log level: {e}")))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if settings.json {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr);
        registry.with(json_layer).try_init().is_ok()
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr);
        registry.with(fmt_layer).try_init().is_ok()
    };

    if installed {
        info!(level = %settings.level, json = settings.json, "Tracing initialized");
    }
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let mut config = FlatConfig::default();
        config.log_level = "debug".to_string();
        config.json_logs = true;
        let settings = LogSettings::from(&config);
        assert_eq!(settings.level, "debug");
        assert!(settings.json);
    }

    #[test]
    fn test_invalid_level_rejected() {
        let settings = LogSettings {
            level: "shout".to_string(),
            json: false,
        };
        assert!(init_tracing(&settings).is_err());
    }

    #[test]
    fn test_second_init_is_harmless() {
        let settings = LogSettings::default();
        let _ = init_tracing(&settings).unwrap();
        assert!(!init_tracing(&settings).unwrap());
    }
}
