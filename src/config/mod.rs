pub mod connection_config;
pub mod timing_config;

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::connection_config::ConnectionConfig;
use crate::config::timing_config::TimingConfig;
use crate::utils::ensure_directory_exists;

const CONFIG_DIR_NAME: &str = "guitar-cabinet";
const CONFIG_FILE_NAME: &str = "panel_config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub connection: ConnectionConfig,
    pub timing: TimingConfig,
}

/// `<config dir>/guitar-cabinet/panel_config.json`
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("No configuration directory on this platform"))?;
    Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

impl PanelConfig {
    /// Loads the config, falling back to defaults when the file does not exist.
    pub async fn load_config(file_path: &Path) -> Result<Self> {
        let file_path_str = file_path.to_string_lossy().into_owned();

        if !fs::try_exists(file_path).await.unwrap_or(false) {
            warn!("Config file not found at {:?}, using default.", file_path_str);
            return Ok(Self::default());
        }

        let config_json = fs::read_to_string(file_path).await?;
        let config: Self = serde_json::from_str(&config_json)?;

        info!("Config loaded from {:?}", file_path_str);
        Ok(config)
    }

    /// Saves the config, creating the parent directory if needed.
    pub async fn save_config(&self, file_path: &Path) -> Result<()> {
        if let Some(config_dir) = file_path.parent() {
            ensure_directory_exists(config_dir).await?;
        }
        let file_path_str = file_path.to_string_lossy().into_owned();

        let config_json = match serde_json::to_string_pretty(&self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize panel config to JSON: {}", e);
                return Err(e.into());
            }
        };

        fs::write(file_path, config_json).await?;

        info!("Panel config saved to {:?}.", file_path_str);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(test: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("guitar-cabinet-{}-{}", test, std::process::id()))
            .join(CONFIG_FILE_NAME)
    }

    #[tokio::test]
    async fn test_missing_file_gives_defaults() {
        let path = temp_config_path("missing");
        let config = PanelConfig::load_config(&path).await.unwrap();
        assert_eq!(config, PanelConfig::default());
        assert_eq!(config.connection.name_prefix, "GuitarCabinet");
        assert_eq!(config.timing.poll_interval_ms, 3000);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let path = temp_config_path("save");
        let mut config = PanelConfig::default();
        config.connection.min_rssi = Some(-75);
        config.timing.default_hold_time_ms = 1500;

        config.save_config(&path).await.unwrap();
        let loaded = PanelConfig::load_config(&path).await.unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: PanelConfig = serde_json::from_str(r#"{"timing":{"poll_interval_ms":5000}}"#).unwrap();
        assert_eq!(config.timing.poll_interval_ms, 5000);
        assert_eq!(config.timing.k10_refresh_delay_ms, 500);
        assert_eq!(config.connection, ConnectionConfig::default());
    }

    #[test]
    fn test_derived_values() {
        let mut config = PanelConfig::default();
        config.timing.poll_interval_ms = 0;
        assert_eq!(config.timing.poll_interval().as_millis(), 1);
        assert_eq!(config.timing.command_timing().default_hold_time.as_millis(), 1000);
        let options = config.connection.scan_options(true);
        assert_eq!(options.timeout.as_secs(), 10);
        assert!(options.stop_at_first);
    }
}
