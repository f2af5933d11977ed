//! Connection management
//!
//! Performs write+read exchanges with the light and interprets its
//! acknowledgements.

use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::{
    commands::{
        get_brightness_string, get_color_string, get_dim_string, get_mode_string, DeviceCommand,
    },
    ProtocolError, DEFAULT_TIMEOUT_MS, FRAME_TERMINATOR, OK_RESPONSE, READ_BUFFER_SIZE,
};
use crate::config::ColorEntry;

/// Check if a raw response is the device's acknowledgement
pub fn is_ok(response: &str) -> bool {
    response == OK_RESPONSE
}

/// Client for the light's ASCII protocol
///
/// Owns the port exclusively; one exchange runs at a time because every
/// operation takes `&mut self`.
pub struct HardwareClient<P> {
    /// Serial port (or any byte stream standing in for one)
    port: P,
    /// Timeout for each read attempt
    read_timeout: Duration,
    /// Frames written
    tx_frames: u64,
    /// Non-empty responses received
    rx_frames: u64,
}

impl<P> HardwareClient<P>
where
    P: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a client with the default 2 second read timeout
    pub fn new(port: P) -> Self {
        Self::with_timeout(port, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    /// Create a client with a custom read timeout
    pub fn with_timeout(port: P, read_timeout: Duration) -> Self {
        Self {
            port,
            read_timeout,
            tx_frames: 0,
            rx_frames: 0,
        }
    }

    /// Read timeout applied to each read attempt
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Get cumulative (frames written, responses received)
    pub fn get_counters(&self) -> (u64, u64) {
        (self.tx_frames, self.rx_frames)
    }

    /// Release the underlying port
    pub fn into_inner(self) -> P {
        self.port
    }

    /// Write a raw frame to the device
    pub async fn write(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        debug!(frame = %String::from_utf8_lossy(data), "sending");
        self.port.write_all(data).await?;
        self.port.flush().await?;
        self.tx_frames = self.tx_frames.saturating_add(1);
        Ok(())
    }

    /// Read a response until the `#` terminator or until a read attempt yields nothing
    ///
    /// Returns an empty string if the device did not answer in time.
    pub async fn read_response(&mut self) -> Result<String, ProtocolError> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let mut output = String::new();

        loop {
            // Stale bytes from a previous read must never be replayed
            buffer.fill(0);

            let n = match tokio::time::timeout(self.read_timeout, self.port.read(&mut buffer)).await
            {
                Ok(Ok(n)) => n,
                Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => 0,
                Ok(Err(e)) => return Err(ProtocolError::IoError(e)),
                Err(_) => 0,
            };

            if n == 0 {
                debug!(partial = %output, "read returned no data");
                break;
            }

            debug!(raw = %String::from_utf8_lossy(&buffer[..n]), bytes = n, "receiving");

            for &byte in &buffer[..n] {
                // Zero is buffer filler, never part of a frame
                if byte == 0 {
                    continue;
                }
                output.push(char::from(byte));
                if byte == FRAME_TERMINATOR {
                    self.rx_frames = self.rx_frames.saturating_add(1);
                    return Ok(output);
                }
            }
        }

        if !output.is_empty() {
            self.rx_frames = self.rx_frames.saturating_add(1);
        }
        Ok(output)
    }

    /// Write a frame and return the raw response (empty on timeout)
    pub async fn exchange(&mut self, frame: &str) -> Result<String, ProtocolError> {
        self.write(frame.as_bytes()).await?;
        self.read_response().await
    }

    /// Send an acknowledgement to the device; it is not answered
    pub async fn send_ok(&mut self) -> Result<bool, ProtocolError> {
        self.write(DeviceCommand::Acknowledge.to_frame().as_bytes())
            .await?;
        Ok(true)
    }

    /// Ping the device
    pub async fn send_ping(&mut self) -> Result<bool, ProtocolError> {
        let response = self.exchange(&DeviceCommand::Ping.to_frame()).await?;
        Ok(is_ok(&response))
    }

    /// Request the device's status string
    pub async fn send_request(&mut self) -> Result<String, ProtocolError> {
        self.exchange(&DeviceCommand::RequestInformation.to_frame())
            .await
    }

    /// Set the LED color from `R:G:B` or a configured color name
    pub async fn send_color(
        &mut self,
        value: &str,
        colors: &[ColorEntry],
    ) -> Result<bool, ProtocolError> {
        let built = get_color_string(value, colors);
        self.send_validated("color", value, built).await
    }

    /// Set the LED brightness, bounded by `min..=max`
    pub async fn send_brightness(
        &mut self,
        value: &str,
        min: u16,
        max: u16,
    ) -> Result<bool, ProtocolError> {
        let built = get_brightness_string(value, min, max);
        self.send_validated("brightness", value, built).await
    }

    /// Set the display mode ordinal, bounded by `1..=mode_count`
    pub async fn send_mode(&mut self, value: &str, mode_count: usize) -> Result<bool, ProtocolError> {
        let built = get_mode_string(value, mode_count);
        self.send_validated("mode", value, built).await
    }

    /// Turn dimming on (`1`) or off (`0`)
    pub async fn send_dim(&mut self, value: &str) -> Result<bool, ProtocolError> {
        let built = get_dim_string(value);
        self.send_validated("dim", value, built).await
    }

    /// Send a validated frame, or report failure without touching the device
    async fn send_validated(
        &mut self,
        what: &str,
        value: &str,
        (frame, ok): (String, bool),
    ) -> Result<bool, ProtocolError> {
        if !ok {
            warn!(setting = what, value, "invalid argument, not sent to device");
            return Ok(false);
        }

        info!(setting = what, value, "setting {}", what);
        let response = self.exchange(&frame).await?;
        Ok(is_ok(&response))
    }
}
