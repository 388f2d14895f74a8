//! Application Configuration
//!
//! Configuration can be loaded from:
//! - Default values
//! - Config file (~/.config/arbor-studio/config.toml)
//! - Environment variables (the AI key only)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::editor::viewport::{DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};
use crate::editor::geometry::NODE_RADIUS;

/// Default environment variable holding the AI key
pub const DEFAULT_API_KEY_ENV: &str = "ARBOR_AI_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub autosave: AutosaveConfig,

    pub canvas: CanvasConfig,

    pub ai: AiConfig,

    pub theme: ThemeConfig,

    /// Override for the auto-save directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub enabled: bool,

    pub interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub min_zoom: f32,

    pub max_zoom: f32,

    /// Node circle radius in world units
    pub node_radius: f32,

    pub show_grid: bool,

    pub grid_size: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Messages-style endpoint receiving suggestion requests
    pub endpoint: String,

    pub model: String,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    pub timeout_secs: u64,

    /// Upper bound on suggested children per request
    pub max_suggestions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    /// "dark" or "light"
    pub name: String,

    /// Hex accent override, e.g. "#ff8800"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            autosave: AutosaveConfig::default(),
            canvas: CanvasConfig::default(),
            ai: AiConfig::default(),
            theme: ThemeConfig::default(),
            data_dir: None,
        }
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 30,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            node_radius: NODE_RADIUS,
            show_grid: true,
            grid_size: 40.0,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: 60,
            max_suggestions: 6,
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: "dark".to_string(),
            accent: None,
        }
    }
}

impl AppConfig {
    /// Path of the config file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("arbor-studio/config.toml"))
            .unwrap_or_else(|| PathBuf::from("arbor-studio.toml"))
    }

    /// Load configuration from file, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Invalid config {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Could not read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> std::io::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        std::fs::write(path, content)
    }

    /// Directory holding auto-save data
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(crate::storage::Storage::default_dir)
    }

    /// Get auto-save interval
    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave.interval_secs.max(1))
    }

    /// Get AI request timeout
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai.timeout_secs.max(1))
    }

}

impl AiConfig {
    /// Read the AI key from the configured environment variable; blank counts as unset
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}
