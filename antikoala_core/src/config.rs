//! Configuration file support for antikoala.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/antikoala/config.toml`.
//! Every key is optional.

use crate::engine::EstimationMode;
use crate::{Error, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub user: UserConfig,

    #[serde(default)]
    pub estimation: EstimationConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Which user's records to read and write
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_id")]
    pub id: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: default_user_id(),
        }
    }
}

/// Estimation engine variant
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct EstimationConfig {
    #[serde(default)]
    pub mode: EstimationMode,
}

/// Display timezone and refresh cadence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Offset of the display timezone from UTC, in hours (KST = 9)
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// Refresh interval for the live BAC display
    #[serde(default = "default_live_tick_seconds")]
    pub live_tick_seconds: u64,

    /// Refresh interval for passive "time remaining" displays
    #[serde(default = "default_passive_tick_seconds")]
    pub passive_tick_seconds: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            live_tick_seconds: default_live_tick_seconds(),
            passive_tick_seconds: default_passive_tick_seconds(),
        }
    }
}

impl DisplayConfig {
    /// The display timezone as a chrono offset
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            Error::Config(format!(
                "utc_offset_hours {} is out of range",
                self.utc_offset_hours
            ))
        })
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("antikoala")
}

fn default_user_id() -> String {
    "local".into()
}

fn default_utc_offset_hours() -> i32 {
    9
}

fn default_live_tick_seconds() -> u64 {
    1
}

fn default_passive_tick_seconds() -> u64 {
    60
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Reject values the rest of the system cannot work with
    pub fn validate(&self) -> Result<()> {
        let user = self.user.id.trim();
        if user.is_empty() || user.contains(['/', '\\']) || user == "." || user == ".." {
            return Err(Error::Config(format!(
                "user.id {:?} is not a valid directory name",
                self.user.id
            )));
        }
        if self.display.live_tick_seconds == 0 || self.display.passive_tick_seconds == 0 {
            return Err(Error::Config("tick intervals must be at least 1 second".into()));
        }
        self.display.offset()?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("antikoala").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
