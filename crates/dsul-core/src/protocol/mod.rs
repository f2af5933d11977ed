//! Serial Protocol Communication
//!
//! Implements the fixed-format ASCII protocol spoken by the DSUL firmware.
//!
//! Every frame starts with `+` (set/acknowledge) or `-` (query) and ends with
//! the terminator `#`. The device answers each command with `+!#` on success.

pub mod commands;
mod connection;
mod error;
pub mod serial;

pub use commands::{
    get_brightness_string, get_color_string, get_dim_string, get_mode_string, DeviceCommand,
};
pub use connection::HardwareClient;
pub use error::ProtocolError;
pub use serial::open_port;

/// Default baud rate for the light's serial link
pub const DEFAULT_BAUD_RATE: u32 = 38400;

/// Timeout for a single read attempt in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Delay after opening the port before the device accepts commands, in milliseconds
pub const SETTLE_DELAY_MS: u64 = 2000;

/// Byte that terminates every frame (`#`)
pub const FRAME_TERMINATOR: u8 = b'#';

/// Size of the read buffer used while collecting a response
pub const READ_BUFFER_SIZE: usize = 64;

/// Response the device sends for an accepted command
pub const OK_RESPONSE: &str = "+!#";
