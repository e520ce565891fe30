//! TOML configuration.
//!
//! ```toml
//! [gesture]
//! min_tap_duration_ms = 50
//! tap_slop = 12.0
//!
//! [controller]
//! reticle_visible = true
//! light_receiving_bitmask = 1
//!
//! [dispatch]
//! channel_capacity = 1000
//! ```
//!
//! Every key is optional. Missing keys fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::controller::ControllerSettings;
use crate::dispatch::DispatchSettings;
use crate::gesture::GestureSettings;

const CONFIG_DIR: &str = "openinput";
const CONFIG_FILE: &str = "config.toml";

// Config errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file {path} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub gesture: GestureSettings,
    pub controller: ControllerSettings,
    pub dispatch: DispatchSettings,
}

impl InputConfig {
    /// `<config_dir>/openinput/config.toml`, or the working directory when the
    /// platform has no config dir.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = toml::from_str(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads the default config file. A missing or broken file never stops
    /// startup; defaults are used instead.
    pub async fn load_or_default() -> Self {
        let path = Self::default_path();
        match tokio::fs::try_exists(&path).await {
            Ok(true) => {}
            Ok(false) => {
                info!("No config at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                warn!("Could not check config at {}: {}", path.display(), e);
                return Self::default();
            }
        }

        match Self::load(&path).await {
            Ok(config) => {
                info!("Using config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }
        let content = toml::to_string_pretty(self)?;
        tokio::fs::write(path, content).await.map_err(io_error)?;
        info!("Config saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::DEFAULT_MIN_TAP_DURATION_MS;

    #[test]
    fn test_defaults() {
        let config = InputConfig::default();
        assert_eq!(config.gesture.min_tap_duration_ms, DEFAULT_MIN_TAP_DURATION_MS);
        assert!(config.controller.reticle_visible);
        assert_eq!(config.controller.light_receiving_bitmask, 0x1);
        assert_eq!(config.dispatch.channel_capacity, 1000);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: InputConfig = toml::from_str(
            r#"
            [gesture]
            min_tap_duration_ms = 80

            [controller]
            reticle_visible = false
            "#,
        )
        .unwrap();

        assert_eq!(config.gesture.min_tap_duration_ms, 80);
        assert_eq!(config.gesture.tap_slop, 12.0);
        assert!(!config.controller.reticle_visible);
        assert!(config.controller.controller_visible);
        assert_eq!(config.dispatch, DispatchSettings::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = InputConfig::default();
        config.controller.light_receiving_bitmask = 0b101;
        config.dispatch.stats_interval_secs = 5;
        config.save(&path).await.unwrap();

        assert_eq!(InputConfig::load(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = InputConfig::load(dir.path().join("absent.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        tokio::fs::write(&path, "[gesture\nmin_tap_duration_ms = ").await.unwrap();

        assert!(matches!(InputConfig::load(&path).await, Err(ConfigError::Parse(_))));
    }
}
