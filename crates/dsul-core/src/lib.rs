//! # DSUL Core Library
//!
//! Core functionality for DSUL (Disturb State USB Light).

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The ASCII serial protocol spoken by the light's firmware
//! - Telemetry parsing for the device's status string
//! - A liveness watchdog for the serial link
//! - The IPC command model, wire codec and socket transport
//! - The daemon dispatcher and the client gate/responder
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsul_core::{config::Config, daemon::Daemon, protocol::serial::open_port};
//!
//! let config = Config::load_or_default()?;
//! let port = open_port(&config.serial.port, config.serial.baud_rate)?;
//! Daemon::new(config).run(port).await?;
//! ```

pub mod client;
pub mod config;
pub mod daemon;
pub mod ipc;
pub mod protocol;
pub mod telemetry;
pub mod watchdog;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::client::{ClientGate, Responder, Response, RESPONSE_LINGER};
    pub use crate::config::{Config, NetworkSettings, SerialSettings};
    pub use crate::daemon::{Daemon, DaemonError, Dispatcher, Session};
    pub use crate::ipc::{Action, Command, Endpoint, Envelope, Key, MessageKind};
    pub use crate::protocol::{HardwareClient, ProtocolError};
    pub use crate::telemetry::{HardwareBounds, HardwareTelemetry};
    pub use crate::watchdog::Watchdog;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
