//! Per-connection receive and send tasks

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use super::dispatcher::{DeviceAction, DeviceRequest};
use super::Session;
use crate::ipc::transport::IpcStream;
use crate::ipc::{Command, Envelope, EnvelopeCodec, IpcError, SEND_PACING};

/// Replies buffered per connection; further replies are dropped
const REPLY_QUEUE_SIZE: usize = 8;

/// Serve one client connection until it closes
///
/// Inbound envelopes are authenticated, mapped to device actions and handed
/// to the dispatcher one at a time. Replies flow back through this
/// connection's own queue and are written with a fixed pacing delay.
///
/// A transport read error ends only this connection and is returned.
pub async fn serve_connection<S: IpcStream>(
    stream: S,
    secret: Option<String>,
    requests: mpsc::Sender<DeviceRequest>,
) -> Result<(), IpcError> {
    let (mut sink, mut source) = Framed::new(stream, EnvelopeCodec::new()).split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<Command>(REPLY_QUEUE_SIZE);

    let sender = tokio::spawn(async move {
        while let Some(reply) = reply_rx.recv().await {
            debug!(?reply, "sending reply");
            sink.send(Envelope::data(&reply)).await?;
            sleep(SEND_PACING).await;
        }
        Ok::<_, IpcError>(())
    });

    let mut session = Session::new(secret.as_deref());
    let received = loop {
        let envelope = match source.next().await {
            Some(Ok(envelope)) => envelope,
            Some(Err(e)) => {
                warn!(error = %e, "connection read failed");
                break Err(IpcError::from(e));
            }
            None => break Ok(()),
        };

        let Some(command) = session.admit(&envelope) else {
            continue;
        };
        debug!(?command, "received");
        let Some(action) = DeviceAction::from_command(&command) else {
            continue;
        };

        let request = DeviceRequest {
            action,
            reply: reply_tx.clone(),
        };
        if requests.send(request).await.is_err() {
            break Err(IpcError::Transport("command handler is gone".to_string()));
        }
    };

    // The sender finishes once every in-flight reply has been written
    drop(reply_tx);
    let sent = sender
        .await
        .map_err(|e| IpcError::Transport(format!("send task failed: {}", e)))?;

    received?;
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::{decode, Key, MessageKind};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_forwards_and_replies() {
        let (client_end, server_end) = duplex(4096);
        let (req_tx, mut req_rx) = mpsc::channel(1);
        let server = tokio::spawn(serve_connection(server_end, None, req_tx));

        let mut client = Framed::new(client_end, EnvelopeCodec::new());
        client
            .send(Envelope::data(&Command::set(Key::Color, "blue")))
            .await
            .unwrap();

        let request = req_rx.recv().await.unwrap();
        assert_eq!(request.action, DeviceAction::Color("blue".to_string()));
        request
            .reply
            .send(Command::status_response(true))
            .await
            .unwrap();
        drop(request);

        let envelope = client.next().await.unwrap().unwrap();
        assert_eq!(envelope.kind, MessageKind::Data);
        assert_eq!(
            decode(&envelope.payload).unwrap(),
            Command::status_response(true)
        );

        drop(client);
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_locked_session_forwards_nothing() {
        let (client_end, server_end) = duplex(4096);
        let (req_tx, mut req_rx) = mpsc::channel(1);
        let server = tokio::spawn(serve_connection(
            server_end,
            Some("pw".to_string()),
            req_tx,
        ));

        let mut client = Framed::new(client_end, EnvelopeCodec::new());
        client
            .send(Envelope::data(&Command::set(Key::Dim, "true")))
            .await
            .unwrap();
        client.send(Envelope::authentication("pw")).await.unwrap();
        client
            .send(Envelope::data(&Command::set(Key::Dim, "false")))
            .await
            .unwrap();

        let request = req_rx.recv().await.unwrap();
        assert_eq!(request.action, DeviceAction::Dim(false));
        drop(request);

        drop(client);
        server.await.unwrap().unwrap();
        assert!(req_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_survives_malformed_messages() {
        let (client_end, server_end) = duplex(4096);
        let (req_tx, mut req_rx) = mpsc::channel(1);
        let server = tokio::spawn(serve_connection(server_end, None, req_tx));

        let mut client = Framed::new(client_end, EnvelopeCodec::new());
        client
            .send(Envelope {
                kind: MessageKind::Data,
                payload: Bytes::from_static(b"garbage"),
            })
            .await
            .unwrap();
        client
            .send(Envelope::data(&Command::set(Key::Response, "ok")))
            .await
            .unwrap();
        client
            .send(Envelope::data(&Command::set(Key::Brightness, "50")))
            .await
            .unwrap();

        let request = req_rx.recv().await.unwrap();
        assert_eq!(request.action, DeviceAction::Brightness("50".to_string()));
        drop(request);

        drop(client);
        server.await.unwrap().unwrap();
    }
}
