//! Serial port handling

use std::time::Duration;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use super::{ProtocolError, DEFAULT_TIMEOUT_MS};

/// Open the light's serial port: 8 data bits, no parity, one stop bit, no flow control
///
/// Must be called from within a tokio runtime. The device needs
/// [`super::SETTLE_DELAY_MS`] after opening before it accepts commands.
pub fn open_port(name: &str, baud_rate: u32) -> Result<SerialStream, ProtocolError> {
    let port = tokio_serial::new(name, baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
        .open_native_async()?;

    tracing::info!(port = name, baud_rate, "serial port set: {}_N81", baud_rate);
    Ok(port)
}
