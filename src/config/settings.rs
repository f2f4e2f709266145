//! Application settings management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that overrides `server.base_url`
pub const API_URL_ENV: &str = "FLUENCY_API_URL";

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// General settings
    #[serde(default)]
    pub general: GeneralSettings,

    /// Lesson backend settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Practice room settings (speech, seeking, indicators)
    #[serde(default)]
    pub practice: PracticeSettings,

    /// TUI settings
    #[serde(default)]
    pub tui: TuiSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Base address of the lesson backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Interval between polls of the lesson list and lesson details
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request timeout in seconds (0 = wait forever)
    #[serde(default)]
    pub request_timeout_secs: u64,

    /// Category that imported lessons are filed under
    #[serde(default = "default_category")]
    pub default_category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeSettings {
    /// Speech rate relative to normal speed
    #[serde(default = "default_speech_rate")]
    pub speech_rate: f32,

    /// Language tag for spoken segments
    #[serde(default = "default_speech_language")]
    pub speech_language: String,

    /// Text-to-speech program (espeak-ng compatible flags)
    #[serde(default = "default_speech_command")]
    pub speech_command: String,

    /// How far the rewind key jumps back, in seconds
    #[serde(default = "default_skip_back_secs")]
    pub skip_back_secs: f64,

    /// How long a lesson keeps its "starting" indicator after the start
    /// request settles
    #[serde(default = "default_starting_indicator_ms")]
    pub starting_indicator_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuiSettings {
    /// Show translations under each transcript line
    #[serde(default)]
    pub show_translation: bool,

    /// Show shadowing guides under each transcript line
    #[serde(default = "default_true")]
    pub show_guide: bool,

    /// Show timestamps in the transcript view
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

// Default value functions

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    3000
}

fn default_category() -> String {
    "custom".to_string()
}

fn default_speech_rate() -> f32 {
    0.9
}

fn default_speech_language() -> String {
    "en-US".to_string()
}

fn default_speech_command() -> String {
    "espeak-ng".to_string()
}

fn default_skip_back_secs() -> f64 {
    5.0
}

fn default_starting_indicator_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: 0,
            default_category: default_category(),
        }
    }
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            speech_rate: default_speech_rate(),
            speech_language: default_speech_language(),
            speech_command: default_speech_command(),
            skip_back_secs: default_skip_back_secs(),
            starting_indicator_ms: default_starting_indicator_ms(),
        }
    }
}

impl Default for TuiSettings {
    fn default() -> Self {
        Self {
            show_translation: false,
            show_guide: true,
            show_timestamps: true,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            server: ServerSettings::default(),
            practice: PracticeSettings::default(),
            tui: TuiSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the configuration file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::debug!("No config file found, using defaults");
            let mut settings = Self::default();
            settings.apply_env_overrides();
            return Ok(settings);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut settings = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        settings.apply_env_overrides();

        Ok(settings)
    }

    /// Parse settings from TOML text, filling in defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.server.base_url = url.trim().to_string();
            }
        }
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", crate::APP_NAME, crate::APP_NAME)
            .context("Could not determine config directory")?;

        let config_dir = dirs.config_dir();
        Ok(config_dir.join("config.toml"))
    }

    /// Write default configuration to a file
    pub fn write_default(path: &PathBuf) -> Result<()> {
        let settings = Self::default();
        let content = toml::to_string_pretty(&settings)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Backend base address without a trailing slash
    pub fn api_base(&self) -> &str {
        self.server.base_url.trim().trim_end_matches('/')
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.server.poll_interval_ms.max(1))
    }

    /// Request timeout, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.server.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn starting_indicator(&self) -> Duration {
        Duration::from_millis(self.practice.starting_indicator_ms)
    }
}
