//! Inter-process communication between `dsulc` and `dsuld`
//!
//! Commands travel as JSON payloads inside length-delimited envelopes. Each
//! envelope is tagged with a [`MessageKind`]: authentication or data.

use std::time::Duration;

pub mod codec;
pub mod command;
mod error;
pub mod transport;

pub use codec::{decode, encode, CodecError, Envelope, EnvelopeCodec, MessageKind};
pub use command::{Action, Command, Key};
pub use error::IpcError;
pub use transport::{ClientTransport, Endpoint, Listener, TransportEvent};

/// Name used for the local socket
pub const IPC_NAME: &str = "dsul";

/// Largest envelope accepted on the wire
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Delay between consecutive outbound messages (1/30 s)
pub const SEND_PACING: Duration = Duration::from_nanos(1_000_000_000 / 30);
