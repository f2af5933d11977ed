//! Hardware protocol against the emulated firmware

mod common;

use pretty_assertions::assert_eq;
use std::time::Duration;
use tokio::sync::mpsc;

use common::{MockDevice, MOCK_TELEMETRY};
use dsul_core::config::Config;
use dsul_core::daemon::{DeviceAction, DeviceRequest, Dispatcher};
use dsul_core::ipc::Command;
use dsul_core::protocol::{DeviceCommand, HardwareClient, ProtocolError};
use dsul_core::telemetry::{HardwareBounds, HardwareTelemetry};
use dsul_core::watchdog::Watchdog;

#[tokio::test]
async fn test_client_against_firmware() {
    let (port, device) = MockDevice::spawn(MOCK_TELEMETRY);
    let mut client = HardwareClient::new(port);
    let config = Config::default();

    assert!(client.send_ping().await.unwrap());
    assert_eq!(client.send_request().await.unwrap(), MOCK_TELEMETRY);
    assert!(client.send_color("warmwhite", &config.colors).await.unwrap());
    assert!(client.send_brightness("7", 0, 150).await.unwrap());
    assert!(!client.send_brightness("151", 0, 150).await.unwrap());
    assert!(client.send_mode("4", config.mode_count()).await.unwrap());
    assert!(!client.send_mode("5", config.mode_count()).await.unwrap());
    assert!(client.send_dim("1").await.unwrap());
    assert!(!client.send_dim("2").await.unwrap());

    assert_eq!(
        device.frames(),
        vec!["-?#", "-!#", "+l255230200#", "+b007#", "+m004#", "+d1#"]
    );
    assert_eq!(client.get_counters(), (6, 6));
}

#[test]
fn test_frame_catalog() {
    let frames = [
        (DeviceCommand::Ping, "-?#"),
        (DeviceCommand::RequestInformation, "-!#"),
        (DeviceCommand::Acknowledge, "+!#"),
        (
            DeviceCommand::SetColor {
                red: 1,
                green: 22,
                blue: 255,
            },
            "+l001022255#",
        ),
        (DeviceCommand::SetBrightness(42), "+b042#"),
        (DeviceCommand::SetMode(3), "+m003#"),
        (DeviceCommand::SetDim(false), "+d0#"),
    ];
    for (command, expected) in frames {
        assert_eq!(command.to_frame(), expected);
    }
}

#[tokio::test]
async fn test_closed_device_is_io_error() {
    let (port, device) = tokio::io::duplex(64);
    drop(device);
    let mut client = HardwareClient::new(port);
    assert!(matches!(
        client.send_ping().await,
        Err(ProtocolError::IoError(_))
    ));
}

#[tokio::test]
async fn test_startup_refreshes_bounds() {
    let (port, device) = MockDevice::spawn(MOCK_TELEMETRY);
    let mut dispatcher = Dispatcher::new(
        HardwareClient::new(port),
        Config::default(),
        Watchdog::default(),
    );

    dispatcher.startup().await.unwrap();
    assert_eq!(dispatcher.bounds(), HardwareBounds::new(10, 120));
    assert_eq!(dispatcher.telemetry(), &HardwareTelemetry::parse(MOCK_TELEMETRY));
    assert_eq!(device.frames(), vec!["-?#", "-!#"]);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_pings_only_when_idle() {
    let (port, device) = MockDevice::spawn(MOCK_TELEMETRY);
    let dispatcher = Dispatcher::new(
        HardwareClient::new(port),
        Config::default(),
        Watchdog::new(Duration::from_secs(30)),
    );
    let (requests, inbox) = mpsc::channel(1);
    let handle = tokio::spawn(dispatcher.run(inbox));

    // Activity at 20s pushes the first ping out to 50s
    tokio::time::sleep(Duration::from_secs(20)).await;
    let (reply_tx, mut reply_rx) = mpsc::channel(1);
    requests
        .send(DeviceRequest {
            action: DeviceAction::Dim(true),
            reply: reply_tx,
        })
        .await
        .unwrap();
    assert_eq!(reply_rx.recv().await, Some(Command::status_response(true)));

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(device.frames(), vec!["+d1#"]);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(device.frames(), vec!["+d1#", "-?#"]);

    // Idle from here on: one ping per interval
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(device.frames(), vec!["+d1#", "-?#", "-?#", "-?#"]);

    drop(requests);
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_device_timeout_still_kicks_watchdog() {
    let (port, device) = MockDevice::spawn_silent();
    let dispatcher = Dispatcher::new(
        HardwareClient::new(port),
        Config::default(),
        Watchdog::new(Duration::from_secs(30)),
    );
    let (requests, inbox) = mpsc::channel(1);
    let handle = tokio::spawn(dispatcher.run(inbox));

    let (reply_tx, mut reply_rx) = mpsc::channel(1);
    requests
        .send(DeviceRequest {
            action: DeviceAction::Dim(true),
            reply: reply_tx,
        })
        .await
        .unwrap();

    // The read timeout runs out at 2s; the watchdog restarts from there
    assert_eq!(reply_rx.recv().await, Some(Command::status_response(false)));

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert_eq!(device.frames(), vec!["+d1#"]);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(device.frames(), vec!["+d1#", "-?#"]);

    // Each unanswered ping times out too and kicks the watchdog again
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(device.frames(), vec!["+d1#", "-?#"]);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(device.frames(), vec!["+d1#", "-?#", "-?#"]);

    drop(requests);
    handle.await.unwrap().unwrap();
}
