//! Configuration for the platform layer.
//!
//! Settings come from an optional `<plugin name>.toml` next to the plugin in the
//! extender's `Plugins` directory. A missing file means defaults; a malformed one
//! is reported and also falls back to defaults, since a bad config must not keep
//! the plugin from loading.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_true() -> bool {
    true
}

fn default_level() -> String {
    "info".to_string()
}

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreSettings {
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub subsystems: SubsystemSettings,
}

/// Diagnostic log configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Whether the plugin log file is written at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Filter for framework messages redirected into the log (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
    /// Mirror lines into the host's own log when the host ABI matches exactly
    #[serde(default = "default_true")]
    pub mirror_to_host: bool,
    /// Redirect `tracing` output of the platform layer into the log file
    #[serde(default = "default_true")]
    pub redirect_framework: bool,
    /// Overrides the per-game log directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_level(),
            mirror_to_host: true,
            redirect_framework: true,
            directory: None,
        }
    }
}

/// Subsystem bring-up configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemSettings {
    /// Preload the fixed set of native system libraries
    #[serde(default = "default_true")]
    pub preload_native_libraries: bool,
    /// Install the panic hook that writes panics into the plugin log
    #[serde(default = "default_true")]
    pub panic_hook: bool,
}

impl Default for SubsystemSettings {
    fn default() -> Self {
        Self {
            preload_native_libraries: true,
            panic_hook: true,
        }
    }
}

impl CoreSettings {
    /// Loads settings from `path`. A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let settings: CoreSettings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            )));
        }

        if let Some(directory) = &self.logging.directory {
            if directory.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("Log directory cannot be empty".to_string()));
            }
        }

        Ok(())
    }
}
