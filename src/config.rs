//! Configuration system for gridwm
//!
//! Loads configuration from TOML file at `~/.config/gridwm/config.toml`
//! Auto-generates default config file on first run if missing.
//! The loaded value is immutable for the lifetime of the process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub appearance: AppearanceConfig,
    pub layout: LayoutConfig,
    pub status: StatusConfig,
}

impl Config {
    /// Load configuration from `path`, or the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config = Self::parse(&content)?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("gridwm");

        Ok(config_dir.join("config.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string)
            .context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// Border colors and width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceConfig {
    /// Border pixel of the active window
    pub foreground: u32,
    /// Border pixel of every other window
    pub background: u32,
    pub border_size: u32,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            foreground: 0xffffff,
            background: 0x000000,
            border_size: 0,
        }
    }
}

/// Grid spacing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Space between tiles and around the screen edge
    pub gap_size: u32,
    /// Reserved strip at the top of the screen (bars)
    pub top_padding: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// FIFO receiving status lines; overridden by `--status`
    pub path: Option<PathBuf>,
}
