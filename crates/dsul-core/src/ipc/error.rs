//! IPC errors

use std::io;
use thiserror::Error;

use super::CodecError;

/// Errors raised by the IPC transport
#[derive(Error, Debug)]
pub enum IpcError {
    #[error("Failed to bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("Socket {0} is already in use by a running daemon")]
    InUse(String),

    #[error("Could not connect to {endpoint} within {timeout_secs}s: {reason}")]
    ConnectTimeout {
        endpoint: String,
        timeout_secs: u64,
        reason: String,
    },

    #[error("Local sockets are not supported on this platform")]
    UnsupportedLocal,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
