//! Protocol errors

use thiserror::Error;

/// Errors that can occur while talking to the device
///
/// A missing or negative acknowledgement is not an error: it is reported as a
/// failed exchange. These variants are the unrecoverable link failures.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Serial port error: {0}")]
    SerialError(String),

    #[error("Port not found: {0}")]
    PortNotFound(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serialport::Error> for ProtocolError {
    fn from(err: serialport::Error) -> Self {
        match err.kind {
            serialport::ErrorKind::NoDevice => ProtocolError::PortNotFound(err.description),
            _ => ProtocolError::SerialError(err.to_string()),
        }
    }
}
