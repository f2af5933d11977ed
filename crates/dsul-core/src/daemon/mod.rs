//! DSUL daemon
//!
//! Task layout:
//! - an accept loop that spawns [`serve_connection`] per client
//! - per connection, a receive task and a send task
//! - one [`Dispatcher`] task owning the serial port, the watchdog and the
//!   brightness bounds
//!
//! Connections hand requests to the dispatcher through a single-slot channel,
//! so a slow device exchange holds back inbound processing instead of
//! queueing work.

mod dispatcher;
mod server;
mod session;

pub use dispatcher::{DeviceAction, DeviceRequest, Dispatcher};
pub use server::serve_connection;
pub use session::Session;

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::ipc::{Endpoint, IpcError, Listener};
use crate::protocol::{HardwareClient, ProtocolError, SETTLE_DELAY_MS};
use crate::watchdog::{Watchdog, DEFAULT_WATCHDOG_INTERVAL};

/// Errors that stop the daemon
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("Device error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IPC error: {0}")]
    Ipc(#[from] IpcError),

    #[error("Command handler panicked: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Command handler stopped unexpectedly")]
    DispatcherStopped,
}

/// The daemon: one device, many clients
#[derive(Debug, Clone)]
pub struct Daemon {
    config: Config,
    endpoint: Endpoint,
    settle_delay: Duration,
    watchdog_interval: Duration,
}

impl Daemon {
    /// Create a daemon listening on the endpoint selected by the configuration
    pub fn new(config: Config) -> Self {
        let endpoint = Endpoint::for_daemon(&config.network);
        Self {
            config,
            endpoint,
            settle_delay: Duration::from_millis(SETTLE_DELAY_MS),
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
        }
    }

    /// Listen on a different endpoint
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Change the delay between opening the port and the first command
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Change the idle interval after which the device is pinged
    pub fn with_watchdog_interval(mut self, interval: Duration) -> Self {
        self.watchdog_interval = interval;
        self
    }

    /// Endpoint the daemon listens on
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Bind the endpoint and serve clients on an opened port
    ///
    /// Only returns on a fatal error.
    pub async fn run<P>(self, port: P) -> Result<(), DaemonError>
    where
        P: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let listener = Listener::bind(&self.endpoint).await?;
        self.serve(listener, port).await
    }

    /// Serve clients from an already bound listener
    pub async fn serve<P>(self, listener: Listener, port: P) -> Result<(), DaemonError>
    where
        P: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        debug!(delay_ms = self.settle_delay.as_millis() as u64, "waiting for device");
        tokio::time::sleep(self.settle_delay).await;

        let secret = self.config.secret().map(str::to_string);
        let mut dispatcher = Dispatcher::new(
            HardwareClient::new(port),
            self.config,
            Watchdog::new(self.watchdog_interval),
        );
        dispatcher.startup().await?;

        let (requests, inbox) = mpsc::channel(1);
        let mut handler = tokio::spawn(dispatcher.run(inbox));
        info!(endpoint = %listener.endpoint(), "daemon ready");

        loop {
            tokio::select! {
                result = &mut handler => {
                    return match result? {
                        Ok(()) => Err(DaemonError::DispatcherStopped),
                        Err(e) => {
                            error!(error = %e, "device link failed");
                            Err(e.into())
                        }
                    };
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!(peer = %peer, "client connected");
                        let secret = secret.clone();
                        let requests = requests.clone();
                        tokio::spawn(async move {
                            match serve_connection(stream, secret, requests).await {
                                Ok(()) => info!(peer = %peer, "client disconnected"),
                                Err(e) => warn!(peer = %peer, error = %e, "connection ended"),
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                },
            }
        }
    }
}
