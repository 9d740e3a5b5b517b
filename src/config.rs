use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::lineup::geometry::RowGeometry;

const QUALIFIER: &str = "com";
const ORGANIZATION: &str = "lineup";
const APPLICATION: &str = "iptv-lineup";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the channel-management command backend
    pub backend_url: String,
    pub request_timeout_secs: u64,
    /// Grace period before a disable is sent to the backend
    pub undo_window_secs: u64,
    /// Quiet period before a drag "moved" message is announced
    pub announce_debounce_ms: u64,
    /// Rows materialized above and below the viewport
    pub overscan: usize,
    pub geometry: RowGeometry,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:7700".to_string(),
            request_timeout_secs: 10,
            undo_window_secs: 5,
            announce_debounce_ms: 300,
            overscan: 3,
            geometry: RowGeometry::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|p| p.config_dir().join("config.json"))
    }

    /// Directory for rolling log files
    pub fn log_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|p| p.data_local_dir().join("logs"))
    }

    /// Load the config file, writing defaults when none exists yet
    pub fn load() -> Result<Self, anyhow::Error> {
        let Some(config_path) = Self::config_path() else {
            return Ok(AppConfig::default());
        };

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            let config: AppConfig = serde_json::from_str(&content)?;
            return Ok(config.sanitized());
        }

        let config = AppConfig::default();
        let _ = config.save();
        Ok(config)
    }

    pub fn save(&self) -> Result<(), anyhow::Error> {
        if let Some(config_path) = Self::config_path() {
            if let Some(dir) = config_path.parent() {
                fs::create_dir_all(dir)?;
            }
            let content = serde_json::to_string_pretty(self)?;
            fs::write(config_path, content)?;
        }
        Ok(())
    }

    /// Clamp values that would make the list unusable
    pub fn sanitized(mut self) -> Self {
        self.request_timeout_secs = self.request_timeout_secs.max(1);
        self.geometry.collapsed_height = self.geometry.collapsed_height.max(1);
        self
    }

    pub fn undo_window(&self) -> Duration {
        Duration::from_secs(self.undo_window_secs)
    }

    pub fn announce_debounce(&self) -> Duration {
        Duration::from_millis(self.announce_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
