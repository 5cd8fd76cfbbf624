use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base URL used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Environment variable overriding the configured base URL
pub const API_URL_ENV: &str = "SOCRATIC_API_URL";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat service
    pub api_url: String,

    /// Per-request timeout for the HTTP transport
    pub request_timeout_secs: u64,

    /// UI preferences
    pub ui: UiConfig,

    /// Socratic home directory
    #[serde(skip)]
    pub socratic_home: PathBuf,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_timestamps: bool,
    pub welcome: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_timestamps: true,
            welcome: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 60,
            ui: UiConfig::default(),
            socratic_home: home.join(".socratic"),
        }
    }
}

impl Config {
    /// Load configuration from `~/.socratic/config.toml`, writing defaults on first run
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let socratic_home = home.join(".socratic");

        fs::create_dir_all(&socratic_home)
            .context("Failed to create .socratic directory")?;

        let config_path = socratic_home.join("config.toml");
        let first_run = !config_path.exists();

        let mut config = Self::load_from(&config_path)?;
        config.socratic_home = socratic_home;

        if first_run {
            config.save()?;
        }

        config.apply_overrides(std::env::var(API_URL_ENV).ok(), None);
        Ok(config)
    }

    /// Load configuration from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .context("Failed to read config file")?;
            toml::from_str::<Config>(&content)
                .context("Failed to parse config file")?
        } else {
            Config::default()
        };

        if let Some(parent) = path.parent() {
            config.socratic_home = parent.to_path_buf();
        }
        config.api_url = normalize_base_url(&config.api_url);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Apply environment and command-line overrides; the flag wins over the environment
    pub fn apply_overrides(&mut self, env_url: Option<String>, flag_url: Option<String>) {
        let chosen = flag_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| env_url.filter(|url| !url.trim().is_empty()));

        if let Some(url) = chosen {
            self.api_url = normalize_base_url(&url);
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.socratic_home.join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.socratic_home.join("socratic.log")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Strip whitespace and trailing slashes so `{base}/chat` never doubles up
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_API_URL.to_string()
    } else {
        trimmed.to_string()
    }
}
