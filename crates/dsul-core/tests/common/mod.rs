//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use dsul_core::config::Config;
use dsul_core::daemon::{Daemon, DaemonError};
use dsul_core::ipc::{Endpoint, Listener};

/// Status string the mock firmware reports
pub const MOCK_TELEMETRY: &str = "v001.002.003ll016lb010:120cc255000000cb100cm002cd0#";

/// Firmware emulator on the far end of a duplex stream
///
/// Records every `#`-terminated frame it receives. Information requests are
/// answered with the configured status string, everything else with `+!#`.
/// A silent device records frames but never answers.
pub struct MockDevice {
    frames: Arc<Mutex<Vec<String>>>,
    _task: JoinHandle<()>,
}

impl MockDevice {
    /// Start the emulator; returns the port to hand to the daemon
    pub fn spawn(telemetry: &str) -> (DuplexStream, Self) {
        Self::start(Some(telemetry.to_string()))
    }

    /// Start an emulator that never answers
    pub fn spawn_silent() -> (DuplexStream, Self) {
        Self::start(None)
    }

    fn start(telemetry: Option<String>) -> (DuplexStream, Self) {
        let (port, mut device) = duplex(1024);
        let frames = Arc::new(Mutex::new(Vec::new()));
        let recorded = frames.clone();

        let task = tokio::spawn(async move {
            let mut pending = Vec::new();
            let mut buf = [0u8; 64];
            loop {
                let n = match device.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                for &byte in &buf[..n] {
                    pending.push(byte);
                    if byte != b'#' {
                        continue;
                    }
                    let frame = String::from_utf8_lossy(&pending).into_owned();
                    pending.clear();

                    if frame == "+!#" {
                        continue;
                    }
                    let reply = match &telemetry {
                        None => None,
                        Some(telemetry) if frame == "-!#" => Some(telemetry.clone()),
                        Some(_) => Some("+!#".to_string()),
                    };
                    recorded.lock().unwrap().push(frame);
                    let Some(reply) = reply else {
                        continue;
                    };
                    if device.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
            }
        });

        (
            port,
            Self {
                frames,
                _task: task,
            },
        )
    }

    /// Frames received so far
    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().unwrap().clone()
    }

    /// Frames received after the startup handshake
    pub fn commands(&self) -> Vec<String> {
        self.frames().into_iter().skip(2).collect()
    }
}

/// Install a test log writer once
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Start a daemon on an ephemeral TCP port with a mock device
pub async fn start_daemon(
    config: Config,
) -> (Endpoint, MockDevice, JoinHandle<Result<(), DaemonError>>) {
    init_logging();
    let (port, device) = MockDevice::spawn(MOCK_TELEMETRY);

    let bind_to = Endpoint::Network {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let listener = Listener::bind(&bind_to).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let daemon = Daemon::new(config).with_settle_delay(Duration::ZERO);
    let handle = tokio::spawn(daemon.serve(listener, port));

    let endpoint = Endpoint::Network {
        host: "127.0.0.1".to_string(),
        port: addr.port(),
    };
    (endpoint, device, handle)
}
