//! Configuration surface shared by the daemon and the client
//!
//! Stored as `dsul.json` in the user's configuration directory. The file is
//! created with defaults the first time it is loaded.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::protocol::DEFAULT_BAUD_RATE;
use crate::telemetry::HardwareBounds;

/// Application directory name under the platform config dir
const APPLICATION_NAME: &str = "dsul";

/// Configuration file name
const CONFIG_FILE_NAME: &str = "dsul.json";

/// Default IPC network port
pub const DEFAULT_NETWORK_PORT: u16 = 9292;

/// Errors raised while loading or saving the configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine configuration directory")]
    NoConfigDir,

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A named color and its `r:g:b` value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorEntry {
    /// Color name used on the command line (e.g. "red")
    pub name: String,
    /// Color value as `r:g:b`
    pub value: String,
}

/// A named display mode and its ordinal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeEntry {
    /// Mode name used on the command line (e.g. "blink")
    pub name: String,
    /// Ordinal sent to the device, 1..N
    pub value: u16,
}

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Serial port name (e.g. "/dev/ttyUSB0" or "COM3")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// IPC network settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Daemon listens on TCP instead of the local socket
    pub listen: bool,
    /// Server the client connects to; empty means the local socket
    pub server: String,
    /// TCP port used in network mode
    pub port: u16,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            listen: false,
            server: String::new(),
            port: DEFAULT_NETWORK_PORT,
        }
    }
}

/// DSUL configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Named colors
    pub colors: Vec<ColorEntry>,
    /// Named display modes
    pub modes: Vec<ModeEntry>,
    /// Lowest brightness accepted
    pub brightness_min: u16,
    /// Highest brightness accepted
    pub brightness_max: u16,
    /// Serial link settings
    pub serial: SerialSettings,
    /// Shared secret; empty disables authentication
    pub password: String,
    /// IPC network settings
    pub network: NetworkSettings,
}

impl Default for Config {
    fn default() -> Self {
        let colors = [
            ("black", "0:0:0"),
            ("white", "255:255:200"),
            ("warmwhite", "255:230:200"),
            ("red", "255:0:0"),
            ("green", "0:255:0"),
            ("blue", "0:0:255"),
            ("cyan", "0:255:255"),
            ("purple", "255:0:200"),
            ("magenta", "255:0:50"),
            ("yellow", "255:90:0"),
            ("orange", "255:20:0"),
        ]
        .into_iter()
        .map(|(name, value)| ColorEntry {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect();

        let modes = [("solid", 1), ("blink", 2), ("flash", 3), ("pulse", 4)]
            .into_iter()
            .map(|(name, value)| ModeEntry {
                name: name.to_string(),
                value,
            })
            .collect();

        Self {
            colors,
            modes,
            brightness_min: 0,
            brightness_max: 150,
            serial: SerialSettings::default(),
            password: String::new(),
            network: NetworkSettings::default(),
        }
    }
}

impl Config {
    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let base = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or(ConfigError::NoConfigDir)?;
        Ok(base.join(APPLICATION_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the configuration from the default path, creating it if missing
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        Self::load_or_create(&path)
    }

    /// Load the configuration at `path`, writing defaults there first if the file does not exist
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!(path = %path.display(), "created default configuration");
            return Ok(config);
        }
        Self::load_from(path)
    }

    /// Load the configuration from a file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // An empty file behaves like a fresh install
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save the configuration to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    /// Look up the `r:g:b` value of a named color
    pub fn color_value(&self, name: &str) -> Option<&str> {
        self.colors
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }

    /// Look up the ordinal of a named mode
    pub fn mode_value(&self, name: &str) -> Option<u16> {
        self.modes.iter().find(|m| m.name == name).map(|m| m.value)
    }

    /// Number of configured modes (the highest valid mode ordinal)
    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }

    /// Brightness bounds from the configuration, before any hardware refresh
    pub fn bounds(&self) -> HardwareBounds {
        HardwareBounds::new(self.brightness_min, self.brightness_max)
    }

    /// Shared secret, if authentication is enabled
    pub fn secret(&self) -> Option<&str> {
        if self.password.is_empty() {
            None
        } else {
            Some(&self.password)
        }
    }
}
