//! Socket transport for envelopes
//!
//! The daemon listens on a local Unix socket, or on TCP in network mode. The
//! client side runs a background task that connects (with retries), reports
//! status changes as [`TransportEvent`]s and relays envelopes in both
//! directions.

use futures::{SinkExt, StreamExt};
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

use super::{Envelope, EnvelopeCodec, IpcError, IPC_NAME};
use crate::config::NetworkSettings;

/// Status reported once a connection attempt starts
pub const STATUS_CONNECTING: &str = "Connecting";

/// Status reported once the socket is established
pub const STATUS_CONNECTED: &str = "Connected";

/// How long the client keeps retrying before giving up
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Where the daemon listens and the client connects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Local Unix socket
    Local(PathBuf),
    /// TCP socket
    Network {
        /// Host name or address
        host: String,
        /// TCP port
        port: u16,
    },
}

impl Endpoint {
    /// Default local socket path: `<runtime dir>/dsul.sock`, falling back to the temp dir
    pub fn local_default() -> Self {
        let base = dirs::runtime_dir().unwrap_or_else(std::env::temp_dir);
        Endpoint::Local(base.join(format!("{}.sock", IPC_NAME)))
    }

    /// Endpoint the daemon listens on
    pub fn for_daemon(network: &NetworkSettings) -> Self {
        if network.listen {
            Endpoint::Network {
                host: "0.0.0.0".to_string(),
                port: network.port,
            }
        } else {
            Self::local_default()
        }
    }

    /// Endpoint the client connects to
    pub fn for_client(network: &NetworkSettings) -> Self {
        if network.server.is_empty() {
            Self::local_default()
        } else {
            Endpoint::Network {
                host: network.server.clone(),
                port: network.port,
            }
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Local(path) => write!(f, "unix://{}", path.display()),
            Endpoint::Network { host, port } => write!(f, "tcp://{}:{}", host, port),
        }
    }
}

/// Byte stream usable by the transport
pub trait IpcStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T> IpcStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

/// Type-erased transport stream
pub type BoxedStream = Box<dyn IpcStream>;

/// Events delivered to the client's receive side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Connection status change (e.g. [`STATUS_CONNECTED`])
    Status(String),
    /// Envelope received from the peer
    Message(Envelope),
    /// Unrecoverable transport error; no further events follow
    Error(String),
}

/// Listening socket of the daemon
#[derive(Debug)]
pub struct Listener {
    endpoint: Endpoint,
    kind: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl Listener {
    /// Bind the endpoint
    ///
    /// A stale Unix socket file left by a previous daemon is removed; a socket
    /// that still accepts connections is reported as [`IpcError::InUse`].
    pub async fn bind(endpoint: &Endpoint) -> Result<Self, IpcError> {
        let bind_err = |source| IpcError::Bind {
            endpoint: endpoint.to_string(),
            source,
        };

        let kind = match endpoint {
            Endpoint::Network { host, port } => {
                ListenerKind::Tcp(TcpListener::bind((host.as_str(), *port)).await.map_err(bind_err)?)
            }
            #[cfg(unix)]
            Endpoint::Local(path) => {
                if path.exists() {
                    if UnixStream::connect(path).await.is_ok() {
                        return Err(IpcError::InUse(endpoint.to_string()));
                    }
                    debug!(path = %path.display(), "removing stale socket");
                    std::fs::remove_file(path).map_err(bind_err)?;
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(bind_err)?;
                }
                ListenerKind::Unix(UnixListener::bind(path).map_err(bind_err)?)
            }
            #[cfg(not(unix))]
            Endpoint::Local(_) => return Err(IpcError::UnsupportedLocal),
        };

        info!(endpoint = %endpoint, "ipc listener active");
        Ok(Self {
            endpoint: endpoint.clone(),
            kind,
        })
    }

    /// Endpoint this listener was bound to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Bound TCP address (useful when binding port 0)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.kind {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            #[cfg(unix)]
            ListenerKind::Unix(_) => None,
        }
    }

    /// Accept the next connection, returning the stream and a peer description
    pub async fn accept(&self) -> io::Result<(BoxedStream, String)> {
        match &self.kind {
            ListenerKind::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                stream.set_nodelay(true)?;
                Ok((Box::new(stream), addr.to_string()))
            }
            #[cfg(unix)]
            ListenerKind::Unix(listener) => {
                let (stream, _) = listener.accept().await?;
                Ok((Box::new(stream), "local".to_string()))
            }
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let (ListenerKind::Unix(_), Endpoint::Local(path)) = (&self.kind, &self.endpoint) {
            if let Err(e) = std::fs::remove_file(path) {
                debug!(path = %path.display(), error = %e, "socket cleanup failed");
            }
        }
    }
}

/// Open a single connection to the endpoint
pub async fn connect(endpoint: &Endpoint) -> io::Result<BoxedStream> {
    match endpoint {
        Endpoint::Network { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port)).await?;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream))
        }
        #[cfg(unix)]
        Endpoint::Local(path) => Ok(Box::new(UnixStream::connect(path).await?)),
        #[cfg(not(unix))]
        Endpoint::Local(_) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "local sockets are not supported on this platform",
        )),
    }
}

/// Keep trying to connect until `timeout` has passed
pub async fn connect_with_retry(
    endpoint: &Endpoint,
    timeout: Duration,
) -> Result<BoxedStream, IpcError> {
    let deadline = Instant::now() + timeout;
    loop {
        match connect(endpoint).await {
            Ok(stream) => return Ok(stream),
            Err(e) if Instant::now() + CONNECT_RETRY_DELAY < deadline => {
                debug!(endpoint = %endpoint, error = %e, "connect failed, retrying");
                sleep(CONNECT_RETRY_DELAY).await;
            }
            Err(e) => {
                return Err(IpcError::ConnectTimeout {
                    endpoint: endpoint.to_string(),
                    timeout_secs: timeout.as_secs(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Client half of the transport: events in, envelopes out
#[derive(Debug)]
pub struct ClientTransport {
    /// Status changes, received envelopes and errors
    pub events: mpsc::Receiver<TransportEvent>,
    /// Envelopes to write once connected
    pub outbound: mpsc::Sender<Envelope>,
}

impl ClientTransport {
    /// Start a background task that connects to `endpoint` and relays envelopes
    pub fn spawn(endpoint: Endpoint, connect_timeout: Duration) -> Self {
        let (events_tx, events) = mpsc::channel(16);
        let (outbound, out_rx) = mpsc::channel(16);

        tokio::spawn(async move {
            if events_tx
                .send(TransportEvent::Status(STATUS_CONNECTING.to_string()))
                .await
                .is_err()
            {
                return;
            }
            match connect_with_retry(&endpoint, connect_timeout).await {
                Ok(stream) => relay(stream, events_tx, out_rx).await,
                Err(e) => {
                    let _ = events_tx.send(TransportEvent::Error(e.to_string())).await;
                }
            }
        });

        Self { events, outbound }
    }

    /// Start relaying over an already connected stream
    pub fn spawn_with_stream<S: IpcStream>(stream: S) -> Self {
        let (events_tx, events) = mpsc::channel(16);
        let (outbound, out_rx) = mpsc::channel(16);

        tokio::spawn(async move {
            if events_tx
                .send(TransportEvent::Status(STATUS_CONNECTING.to_string()))
                .await
                .is_ok()
            {
                relay(Box::new(stream), events_tx, out_rx).await;
            }
        });

        Self { events, outbound }
    }
}

/// Pump envelopes between the socket and the channels until either side goes away
async fn relay(
    stream: BoxedStream,
    events: mpsc::Sender<TransportEvent>,
    mut outbound: mpsc::Receiver<Envelope>,
) {
    if events
        .send(TransportEvent::Status(STATUS_CONNECTED.to_string()))
        .await
        .is_err()
    {
        return;
    }

    let (mut sink, mut source) = Framed::new(stream, EnvelopeCodec::new()).split();
    let mut outbound_open = true;

    loop {
        tokio::select! {
            frame = source.next() => {
                let event = match frame {
                    Some(Ok(envelope)) => TransportEvent::Message(envelope),
                    Some(Err(e)) => TransportEvent::Error(e.to_string()),
                    None => {
                        debug!("ipc connection closed by peer");
                        return;
                    }
                };
                let fatal = matches!(event, TransportEvent::Error(_));
                if events.send(event).await.is_err() || fatal {
                    return;
                }
            }
            envelope = outbound.recv(), if outbound_open => match envelope {
                Some(envelope) => {
                    if let Err(e) = sink.send(envelope).await {
                        warn!(error = %e, "ipc write failed");
                        let _ = events.send(TransportEvent::Error(e.to_string())).await;
                        return;
                    }
                }
                None => outbound_open = false,
            },
        }
    }
}
