//! Command-handling task
//!
//! The [`Dispatcher`] is the only owner of the serial link. Requests from all
//! connections funnel into it through one channel, so device exchanges never
//! interleave. Between requests it keeps the link alive with watchdog pings.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::ipc::{Action, Command, Key};
use crate::protocol::{HardwareClient, ProtocolError};
use crate::telemetry::{HardwareBounds, HardwareTelemetry};
use crate::watchdog::Watchdog;

/// Device operation derived from a client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceAction {
    /// Set the color from `r:g:b` or a color name
    Color(String),
    /// Set the brightness
    Brightness(String),
    /// Set the display mode by name
    Mode(String),
    /// Turn dimming on or off
    Dim(bool),
    /// Fetch the device's status string
    Information,
}

impl DeviceAction {
    /// Map a command onto a device operation
    ///
    /// Only `set` on the four settable keys and `get information all` are
    /// accepted; every other combination is logged and yields `None`.
    pub fn from_command(command: &Command) -> Option<Self> {
        let value = command.value();
        let action = match (command.action(), command.key()) {
            (Action::Set, Key::Color) => DeviceAction::Color(value.to_string()),
            (Action::Set, Key::Brightness) => DeviceAction::Brightness(value.to_string()),
            (Action::Set, Key::Mode) => DeviceAction::Mode(value.to_string()),
            (Action::Set, Key::Dim) => DeviceAction::Dim(value == "true"),
            (Action::Get, Key::Information) if command.is_information_request() => {
                DeviceAction::Information
            }
            (action, key) => {
                warn!(?action, %key, value, "ignoring unsupported command");
                return None;
            }
        };
        Some(action)
    }
}

/// A device operation plus where to send its reply
#[derive(Debug)]
pub struct DeviceRequest {
    /// Operation to perform
    pub action: DeviceAction,
    /// Reply channel of the originating connection
    pub reply: mpsc::Sender<Command>,
}

/// Owner of the hardware client, the watchdog and the brightness bounds
pub struct Dispatcher<P> {
    client: HardwareClient<P>,
    watchdog: Watchdog,
    config: Config,
    bounds: HardwareBounds,
    telemetry: HardwareTelemetry,
}

impl<P> Dispatcher<P>
where
    P: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Create a dispatcher; bounds start from the configuration
    pub fn new(client: HardwareClient<P>, config: Config, watchdog: Watchdog) -> Self {
        let bounds = config.bounds();
        Self {
            client,
            watchdog,
            config,
            bounds,
            telemetry: HardwareTelemetry::default(),
        }
    }

    /// Current brightness bounds
    pub fn bounds(&self) -> HardwareBounds {
        self.bounds
    }

    /// Telemetry from the last information request
    pub fn telemetry(&self) -> &HardwareTelemetry {
        &self.telemetry
    }

    /// Startup handshake: ping the device, then refresh its information
    pub async fn startup(&mut self) -> Result<(), ProtocolError> {
        if self.client.send_ping().await? {
            info!("device answered ping");
        } else {
            warn!("device did not acknowledge startup ping");
        }
        let raw = self.refresh_information().await?;
        info!(telemetry = %raw, "device information");
        Ok(())
    }

    /// Request the status string, parse it and apply any reported bounds
    ///
    /// Returns the raw status string.
    pub async fn refresh_information(&mut self) -> Result<String, ProtocolError> {
        let raw = self.client.send_request().await?;
        if raw.is_empty() {
            warn!("no information received from device");
            return Ok(raw);
        }

        let telemetry = HardwareTelemetry::parse(&raw);
        self.bounds.apply(&telemetry);
        self.telemetry = telemetry;
        Ok(raw)
    }

    /// Perform one operation and build the reply
    pub async fn execute(&mut self, action: &DeviceAction) -> Result<Command, ProtocolError> {
        let ok = match action {
            DeviceAction::Color(value) => {
                self.client.send_color(value, &self.config.colors).await?
            }
            DeviceAction::Brightness(value) => {
                self.client
                    .send_brightness(
                        value,
                        self.bounds.brightness_min,
                        self.bounds.brightness_max,
                    )
                    .await?
            }
            DeviceAction::Mode(name) => match self.config.mode_value(name) {
                Some(ordinal) => {
                    self.client
                        .send_mode(&ordinal.to_string(), self.config.mode_count())
                        .await?
                }
                None => {
                    warn!(mode = %name, "unknown mode, not sent to device");
                    false
                }
            },
            DeviceAction::Dim(on) => self.client.send_dim(if *on { "1" } else { "0" }).await?,
            DeviceAction::Information => {
                let raw = self.refresh_information().await?;
                return Ok(Command::response(raw));
            }
        };
        Ok(Command::status_response(ok))
    }

    /// Serve requests until every sender is gone
    ///
    /// Replies are never awaited: a connection whose reply queue is full
    /// loses the reply. A serial I/O error ends the loop and is returned to
    /// the caller.
    pub async fn run(
        mut self,
        mut requests: mpsc::Receiver<DeviceRequest>,
    ) -> Result<(), ProtocolError> {
        self.watchdog.kick();

        loop {
            tokio::select! {
                _ = self.watchdog.expired() => {
                    debug!("watchdog expired, pinging device");
                    if !self.client.send_ping().await? {
                        warn!("device did not acknowledge ping");
                    }
                    self.watchdog.kick();
                }
                request = requests.recv() => {
                    let Some(request) = request else {
                        break;
                    };
                    let reply = self.execute(&request.action).await?;
                    self.watchdog.kick();
                    match request.reply.try_send(reply) {
                        Ok(()) => {}
                        Err(TrySendError::Full(reply)) => {
                            warn!(?reply, "connection is not reading replies, dropping");
                        }
                        Err(TrySendError::Closed(_)) => {
                            debug!("connection closed before reply was delivered");
                        }
                    }
                }
            }
        }

        self.watchdog.stop();
        info!("command handler stopped");
        Ok(())
    }
}
