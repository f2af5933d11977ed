//! Response handling on the client side

use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::ClientGate;
use crate::ipc::command::{RESPONSE_NOK, RESPONSE_OK};
use crate::ipc::{Command, Key};
use crate::protocol::DEFAULT_TIMEOUT_MS;
use crate::telemetry::{HardwareBounds, HardwareTelemetry};

/// How long to wait for each response once connected
///
/// A request can queue behind a watchdog ping, and both may run into the
/// device read timeout before the daemon answers `nok`.
pub const RESPONSE_LINGER: Duration = Duration::from_millis(2 * DEFAULT_TIMEOUT_MS + 1000);

/// How a single response was interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The daemon applied the command
    Ok,
    /// The daemon rejected the command or the device did not acknowledge it
    Failed,
    /// Status string from an information request
    Telemetry(HardwareTelemetry),
    /// Anything else; logged and otherwise ignored
    Unknown(String),
}

/// Consumes responses, tracking hardware bounds and the latest telemetry
#[derive(Debug, Clone)]
pub struct Responder {
    bounds: HardwareBounds,
    telemetry: Option<HardwareTelemetry>,
    raw_telemetry: Option<String>,
    succeeded: usize,
    failed: usize,
}

impl Responder {
    /// Create a responder starting from configured bounds
    pub fn new(bounds: HardwareBounds) -> Self {
        Self {
            bounds,
            telemetry: None,
            raw_telemetry: None,
            succeeded: 0,
            failed: 0,
        }
    }

    /// Brightness bounds, updated by any telemetry received
    pub fn bounds(&self) -> HardwareBounds {
        self.bounds
    }

    /// Most recent telemetry snapshot
    pub fn telemetry(&self) -> Option<&HardwareTelemetry> {
        self.telemetry.as_ref()
    }

    /// Most recent raw status string
    pub fn raw_telemetry(&self) -> Option<&str> {
        self.raw_telemetry.as_deref()
    }

    /// Number of (ok, nok) responses seen
    pub fn counts(&self) -> (usize, usize) {
        (self.succeeded, self.failed)
    }

    /// Interpret one response
    pub fn handle(&mut self, response: &Command) -> Response {
        if response.key() != Key::Response {
            warn!(key = %response.key(), "unexpected message from daemon");
            return Response::Unknown(response.value().to_string());
        }

        let value = response.value();
        debug!(value, "response");

        if HardwareTelemetry::looks_like_telemetry(value) {
            let telemetry = HardwareTelemetry::parse(value);
            self.bounds.apply(&telemetry);
            self.telemetry = Some(telemetry.clone());
            self.raw_telemetry = Some(value.to_string());
            return Response::Telemetry(telemetry);
        }

        match value {
            RESPONSE_OK => {
                self.succeeded += 1;
                Response::Ok
            }
            RESPONSE_NOK => {
                self.failed += 1;
                warn!("daemon reported failure");
                Response::Failed
            }
            other => {
                info!(value = other, "unrecognised response");
                Response::Unknown(other.to_string())
            }
        }
    }

    /// Handle up to `expected` responses from the gate
    ///
    /// Stops early if nothing arrives within `linger` or the connection closes.
    /// Returns the interpreted responses in arrival order.
    pub async fn collect(
        &mut self,
        gate: &mut ClientGate,
        expected: usize,
        linger: Duration,
    ) -> Vec<Response> {
        let mut handled = Vec::with_capacity(expected);
        while handled.len() < expected {
            match timeout(linger, gate.recv()).await {
                Ok(Some(response)) => handled.push(self.handle(&response)),
                Ok(None) => {
                    debug!("connection closed while waiting for responses");
                    break;
                }
                Err(_) => {
                    warn!(
                        received = handled.len(),
                        expected, "timed out waiting for responses"
                    );
                    break;
                }
            }
        }
        handled
    }
}
