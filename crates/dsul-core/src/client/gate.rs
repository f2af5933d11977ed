//! Client gate
//!
//! Holds outbound commands until the transport reports it is connected, then
//! writes them in order with a fixed pacing delay. Inbound data envelopes are
//! decoded and handed to the caller.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::ipc::transport::{DEFAULT_CONNECT_TIMEOUT, STATUS_CONNECTED};
use crate::ipc::{
    decode, ClientTransport, Command, Endpoint, Envelope, IpcError, MessageKind, TransportEvent,
    SEND_PACING,
};

/// Commands that can be queued before the gate opens
const OUTBOUND_QUEUE_SIZE: usize = 32;

/// Handle to a running client gate
#[derive(Debug)]
pub struct ClientGate {
    outbound: Option<mpsc::Sender<Command>>,
    responses: mpsc::Receiver<Command>,
    connected: watch::Receiver<bool>,
    receiver: JoinHandle<Result<(), IpcError>>,
    sender: Option<JoinHandle<Result<(), IpcError>>>,
}

impl ClientGate {
    /// Connect to a daemon and start the gate
    pub fn connect(endpoint: Endpoint, secret: Option<String>) -> Self {
        Self::connect_with_timeout(endpoint, secret, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Connect with a custom connect timeout
    pub fn connect_with_timeout(
        endpoint: Endpoint,
        secret: Option<String>,
        timeout: Duration,
    ) -> Self {
        info!(endpoint = %endpoint, "connecting to daemon");
        Self::start(ClientTransport::spawn(endpoint, timeout), secret)
    }

    /// Start the gate on top of a client transport
    ///
    /// With a secret, an authentication message goes out first and every
    /// command carries the secret as well.
    pub fn start(transport: ClientTransport, secret: Option<String>) -> Self {
        let ClientTransport { events, outbound } = transport;
        let (command_tx, command_rx) = mpsc::channel(OUTBOUND_QUEUE_SIZE);
        let (response_tx, responses) = mpsc::channel(OUTBOUND_QUEUE_SIZE);
        let (ready_tx, connected) = watch::channel(false);

        let receiver = tokio::spawn(receive_loop(events, response_tx, ready_tx));
        let sender = tokio::spawn(send_loop(outbound, command_rx, connected.clone(), secret));

        Self {
            outbound: Some(command_tx),
            responses,
            connected,
            receiver,
            sender: Some(sender),
        }
    }

    /// Queue a command
    pub async fn send(&self, command: Command) -> Result<(), IpcError> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| IpcError::Transport("outbound queue is closed".to_string()))?;
        outbound
            .send(command)
            .await
            .map_err(|_| IpcError::Transport("client gate has stopped".to_string()))
    }

    /// Close the outbound queue; queued commands are still delivered
    pub fn close(&mut self) {
        self.outbound = None;
    }

    /// Wait for the transport to connect
    ///
    /// Returns `false` if the connection was never established.
    pub async fn connected(&mut self) -> bool {
        self.connected.wait_for(|up| *up).await.is_ok()
    }

    /// Next response from the daemon, `None` once the connection is gone
    pub async fn recv(&mut self) -> Option<Command> {
        self.responses.recv().await
    }

    /// Wait until every queued command is written
    ///
    /// Completes once [`close`](Self::close) has been called and the queue is drained.
    /// Later calls return `Ok` without waiting.
    pub async fn flushed(&mut self) -> Result<(), IpcError> {
        let Some(sender) = self.sender.take() else {
            return Ok(());
        };
        sender
            .await
            .map_err(|e| IpcError::Transport(format!("send task failed: {}", e)))?
    }

    /// Stop the gate and report how the receive side ended
    pub async fn shutdown(self) -> Result<(), IpcError> {
        if let Some(sender) = &self.sender {
            sender.abort();
        }
        if self.receiver.is_finished() {
            return self
                .receiver
                .await
                .map_err(|e| IpcError::Transport(format!("receive task failed: {}", e)))?;
        }
        self.receiver.abort();
        Ok(())
    }
}

async fn receive_loop(
    mut events: mpsc::Receiver<TransportEvent>,
    responses: mpsc::Sender<Command>,
    ready: watch::Sender<bool>,
) -> Result<(), IpcError> {

    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Status(status) => {
                debug!(status = %status, "transport status");
                if status == STATUS_CONNECTED {
                    ready.send_replace(true);
                }
            }
            TransportEvent::Message(envelope) => {
                if envelope.kind != MessageKind::Data {
                    warn!(kind = envelope.kind.as_byte(), "ignoring non-data message");
                    continue;
                }
                match decode(&envelope.payload) {
                    Ok(response) => {
                        debug!(?response, "received");
                        if responses.send(response).await.is_err() {
                            debug!("response handler is gone");
                        }
                    }
                    Err(e) => warn!(error = %e, "discarding malformed message"),
                }
            }
            TransportEvent::Error(e) => {
                error!(error = %e, "transport failed");
                return Err(IpcError::Transport(e));
            }
        }
    }

    debug!("transport closed");
    Ok(())
}

async fn send_loop(
    outbound: mpsc::Sender<Envelope>,
    mut commands: mpsc::Receiver<Command>,
    mut ready: watch::Receiver<bool>,
    secret: Option<String>,
) -> Result<(), IpcError> {
    ready
        .wait_for(|up| *up)
        .await
        .map(drop)
        .map_err(|_| IpcError::Transport("connection was never established".to_string()))?;

    let closed = |_| IpcError::Transport("transport closed".to_string());

    if let Some(secret) = &secret {
        outbound
            .send(Envelope::authentication(secret))
            .await
            .map_err(closed)?;
        sleep(SEND_PACING).await;
    }

    while let Some(command) = commands.recv().await {
        let command = match &secret {
            Some(secret) => command.with_secret(Some(secret)),
            None => command,
        };
        debug!(?command, "sending");
        outbound.send(Envelope::data(&command)).await.map_err(closed)?;
        sleep(SEND_PACING).await;
    }

    debug!("outbound queue drained");
    Ok(())
}
