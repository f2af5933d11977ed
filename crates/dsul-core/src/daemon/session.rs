//! Per-connection authentication state

use tracing::{debug, warn};

use crate::ipc::{decode, Command, Envelope, MessageKind};

/// Authentication state of one client connection
///
/// Without a configured secret the session is always unlocked. Otherwise it
/// starts locked and every secret comparison sets the state to its result, so
/// a wrong secret locks a previously unlocked session again.
#[derive(Debug, Clone)]
pub struct Session {
    secret: Option<String>,
    unlocked: bool,
}

impl Session {
    /// Create a session for the configured secret
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret.map(str::to_string),
            unlocked: secret.is_none(),
        }
    }

    /// Check if data commands are currently accepted
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Compare a candidate secret and update the state
    pub fn authenticate(&mut self, candidate: &str) -> bool {
        if let Some(secret) = &self.secret {
            self.unlocked = candidate == secret;
            if self.unlocked {
                debug!("session authenticated");
            } else {
                warn!("authentication failed");
            }
        }
        self.unlocked
    }

    /// Process an inbound envelope, returning the command to execute if any
    pub fn admit(&mut self, envelope: &Envelope) -> Option<Command> {
        match envelope.kind {
            MessageKind::Authentication => {
                let candidate = String::from_utf8_lossy(&envelope.payload);
                self.authenticate(&candidate);
                None
            }
            MessageKind::Data => {
                let command = match decode(&envelope.payload) {
                    Ok(command) => command,
                    Err(e) => {
                        warn!(error = %e, "discarding malformed message");
                        return None;
                    }
                };

                if let Some(candidate) = command.secret() {
                    self.authenticate(candidate);
                }

                if !self.unlocked {
                    warn!(key = %command.key(), "not authenticated, dropping message");
                    return None;
                }
                Some(command)
            }
            MessageKind::Other(kind) => {
                warn!(kind, "discarding message of unknown kind");
                None
            }
        }
    }
}
