//! DSUL client
//!
//! [`ClientGate`] owns the connection to the daemon and [`Responder`]
//! interprets what comes back.

mod gate;
mod responder;

pub use gate::ClientGate;
pub use responder::{Responder, Response, RESPONSE_LINGER};
