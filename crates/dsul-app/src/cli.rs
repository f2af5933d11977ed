//! Command line arguments for `dsuld` and `dsulc`

use clap::Parser;
use thiserror::Error;

use dsul_core::config::Config;
use dsul_core::ipc::{Command, Key};

/// Argument values that only make sense against the loaded configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CliError {
    #[error("Color '{0}' is not supported")]
    UnknownColor(String),

    #[error("Mode '{0}' is not supported")]
    UnknownMode(String),

    #[error("Brightness must be between {min} and {max}")]
    BrightnessOutOfRange { value: u16, min: u16, max: u16 },

    #[error("No action given")]
    NoAction,
}

fn non_empty(value: &str) -> Result<String, String> {
    if value.is_empty() {
        Err("password can't be empty".to_string())
    } else {
        Ok(value.to_string())
    }
}

/// Disturb State USB Light - Daemon
#[derive(Parser, Debug, Default)]
#[command(name = "dsuld")]
pub struct DaemonArgs {
    /// Set COM port (path)
    #[arg(short = 'c', long = "comport")]
    pub comport: Option<String>,

    /// Set COM port baudrate
    #[arg(short = 'b', long = "baudrate", value_parser = clap::value_parser!(u32).range(9600..=115200))]
    pub baudrate: Option<u32>,

    /// Enable network mode
    #[arg(short = 'n', long)]
    pub network: bool,

    /// Set password
    #[arg(short = 'p', long, value_parser = non_empty)]
    pub password: Option<String>,

    /// Show version
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Show verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Show debug output
    #[arg(long)]
    pub debug: bool,
}

impl DaemonArgs {
    /// Override configuration values given on the command line
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = &self.comport {
            tracing::info!(port = %port, "using serial port from command line");
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baudrate {
            tracing::info!(baud, "using baud rate from command line");
            config.serial.baud_rate = baud;
        }
        if self.network {
            tracing::info!(port = config.network.port, "network mode enabled");
            config.network.listen = true;
        }
        if let Some(password) = &self.password {
            tracing::info!("password authentication enabled");
            config.password = password.clone();
        }
    }
}

/// Disturb State USB Light - CLI
#[derive(Parser, Debug, Default)]
#[command(name = "dsulc")]
pub struct ClientArgs {
    /// Set given color
    #[arg(short = 'c', long)]
    pub color: Option<String>,

    /// Set given brightness
    #[arg(short = 'b', long)]
    pub brightness: Option<u16>,

    /// Set given mode
    #[arg(short = 'm', long)]
    pub mode: Option<String>,

    /// Dim colors
    #[arg(short = 'd', long, conflicts_with = "undim")]
    pub dim: bool,

    /// Un-dim colors
    #[arg(short = 'u', long)]
    pub undim: bool,

    /// List settings and values
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Network server to connect to
    #[arg(short = 'n', long, value_name = "SERVER")]
    pub network: Option<String>,

    /// Set password
    #[arg(short = 'p', long, value_parser = non_empty)]
    pub password: Option<String>,

    /// Show version
    #[arg(short = 'v', long)]
    pub version: bool,

    /// Show verbose output
    #[arg(long)]
    pub verbose: bool,
}

impl ClientArgs {
    /// Override configuration values given on the command line
    pub fn apply(&self, config: &mut Config) {
        if let Some(server) = &self.network {
            tracing::info!(server = %server, port = config.network.port, "using network mode");
            config.network.server = server.clone();
        }
        if let Some(password) = &self.password {
            tracing::info!("using password authentication");
            config.password = password.clone();
        }
    }

    /// Build the commands to send, validated against the configuration
    ///
    /// Order: information, mode, brightness, dim, undim, color.
    pub fn commands(&self, config: &Config) -> Result<Vec<Command>, CliError> {
        let mut commands = Vec::new();

        if self.list {
            commands.push(Command::information());
        }
        if let Some(mode) = &self.mode {
            if config.mode_value(mode).is_none() {
                return Err(CliError::UnknownMode(mode.clone()));
            }
            commands.push(Command::set(Key::Mode, mode.as_str()));
        }
        // Zero means "not given", as in the configuration defaults
        if let Some(brightness) = self.brightness.filter(|b| *b > 0) {
            let (min, max) = (config.brightness_min, config.brightness_max);
            if !(min..=max).contains(&brightness) {
                return Err(CliError::BrightnessOutOfRange {
                    value: brightness,
                    min,
                    max,
                });
            }
            commands.push(Command::set(Key::Brightness, brightness.to_string()));
        }
        if self.dim {
            commands.push(Command::set(Key::Dim, "true"));
        }
        if self.undim {
            commands.push(Command::set(Key::Dim, "false"));
        }
        if let Some(color) = &self.color {
            if config.color_value(color).is_none() {
                return Err(CliError::UnknownColor(color.clone()));
            }
            commands.push(Command::set(Key::Color, color.as_str()));
        }

        if commands.is_empty() {
            return Err(CliError::NoAction);
        }
        Ok(commands)
    }
}
