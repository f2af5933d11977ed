//! Wire codecs
//!
//! Two layers:
//! - [`encode`] / [`decode`] turn a [`Command`] into an opaque JSON blob and back.
//! - [`EnvelopeCodec`] frames blobs on a byte stream.
//!
//! Envelope format:
//! - 4 bytes: length of the rest of the frame (big-endian)
//! - 1 byte: message kind (1 = authentication, 2 = data)
//! - N bytes: payload

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde_json::json;
use std::io;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

use super::{Command, MAX_FRAME_SIZE};

/// Errors raised while decoding messages
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Serialize a command into a transport blob
pub fn encode(command: &Command) -> Vec<u8> {
    let mut value = json!({
        "action": command.action(),
        "key": command.key(),
        "value": command.value(),
    });
    if let Some(secret) = command.secret() {
        value["secret"] = json!(secret);
    }
    value.to_string().into_bytes()
}

/// Deserialize a transport blob into a command
///
/// Unknown actions or keys, missing fields and invalid JSON are all
/// [`CodecError::MalformedFrame`]; callers discard the message and carry on.
pub fn decode(data: &[u8]) -> Result<Command, CodecError> {
    serde_json::from_slice(data).map_err(|e| CodecError::MalformedFrame(e.to_string()))
}

/// Kind tag carried by every envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Payload is the shared secret
    Authentication,
    /// Payload is an encoded [`Command`]
    Data,
    /// Tag this version does not know; the envelope is skipped by receivers
    Other(u8),
}

impl MessageKind {
    /// Tag byte on the wire
    pub fn as_byte(&self) -> u8 {
        match self {
            MessageKind::Authentication => 1,
            MessageKind::Data => 2,
            MessageKind::Other(b) => *b,
        }
    }

    /// Kind for a tag byte
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => MessageKind::Authentication,
            2 => MessageKind::Data,
            other => MessageKind::Other(other),
        }
    }
}

/// A tagged payload on the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Message kind
    pub kind: MessageKind,
    /// Opaque payload
    pub payload: Bytes,
}

impl Envelope {
    /// Wrap an encoded command
    pub fn data(command: &Command) -> Self {
        Self {
            kind: MessageKind::Data,
            payload: Bytes::from(encode(command)),
        }
    }

    /// Wrap a shared secret
    pub fn authentication(secret: &str) -> Self {
        Self {
            kind: MessageKind::Authentication,
            payload: Bytes::copy_from_slice(secret.as_bytes()),
        }
    }
}

/// Framing codec for [`Envelope`]s
#[derive(Debug)]
pub struct EnvelopeCodec {
    inner: LengthDelimitedCodec,
}

impl EnvelopeCodec {
    /// Create a codec with the default frame size limit
    pub fn new() -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .max_frame_length(MAX_FRAME_SIZE)
                .new_codec(),
        }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Envelope>, CodecError> {
        loop {
            let Some(mut frame) = self.inner.decode(src)? else {
                return Ok(None);
            };

            // A frame without a kind byte carries nothing; skip it
            if !frame.has_remaining() {
                tracing::warn!("discarding empty envelope");
                continue;
            }

            let kind = MessageKind::from_byte(frame.get_u8());
            return Ok(Some(Envelope {
                kind,
                payload: frame.freeze(),
            }));
        }
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), CodecError> {
        let mut frame = BytesMut::with_capacity(1 + item.payload.len());
        frame.put_u8(item.kind.as_byte());
        frame.extend_from_slice(&item.payload);
        self.inner.encode(frame.freeze(), dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::Key;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roundtrip() {
        let commands = [
            Command::set(Key::Color, "255:0:0"),
            Command::set(Key::Brightness, "100").with_secret(Some("pw")),
            Command::information(),
            Command::response("v001.002.003ll016#"),
            Command::set(Key::Dim, ""),
        ];
        for cmd in commands {
            assert_eq!(decode(&encode(&cmd)).unwrap(), cmd);
        }
    }

    #[test]
    fn test_encoded_shape() {
        let bytes = encode(&Command::set(Key::Mode, "blink"));
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["action"], "set");
        assert_eq!(value["key"], "mode");
        assert_eq!(value["value"], "blink");
        assert!(value.get("secret").is_none());
    }

    #[test]
    fn test_malformed_frames() {
        let frames: [&[u8]; 5] = [
            b"",
            b"not json",
            br#"{"action":"set","key":"undim","value":"true"}"#,
            br#"{"action":"toggle","key":"dim","value":"true"}"#,
            br#"{"action":"set","key":"dim"}"#,
        ];
        for bad in frames {
            assert!(matches!(decode(bad), Err(CodecError::MalformedFrame(_))));
        }
    }

    #[test]
    fn test_envelope_framing() {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::new();
        let data = Envelope::data(&Command::information());
        let auth = Envelope::authentication("pw");

        codec.encode(data.clone(), &mut buf).unwrap();
        codec.encode(auth.clone(), &mut buf).unwrap();

        assert_eq!(codec.decode(&mut buf).unwrap(), Some(data));
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(auth));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_partial_envelope_waits() {
        let mut codec = EnvelopeCodec::new();
        let mut full = BytesMut::new();
        codec
            .encode(Envelope::authentication("secret"), &mut full)
            .unwrap();

        let mut partial = full.split_to(5);
        assert_eq!(codec.decode(&mut partial).unwrap(), None);
        partial.unsplit(full);
        assert_eq!(
            codec.decode(&mut partial).unwrap().map(|e| e.kind),
            Some(MessageKind::Authentication)
        );
    }

    #[test]
    fn test_empty_envelope_is_skipped() {
        let mut codec = EnvelopeCodec::new();
        let mut buf = BytesMut::new();
        buf.put_u32(0);
        codec
            .encode(Envelope::data(&Command::information()), &mut buf)
            .unwrap();

        let envelope = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(envelope.kind, MessageKind::Data);
    }

    #[test]
    fn test_unknown_kind_is_preserved() {
        assert_eq!(MessageKind::from_byte(7), MessageKind::Other(7));
        assert_eq!(MessageKind::Other(7).as_byte(), 7);
        assert_eq!(MessageKind::from_byte(1), MessageKind::Authentication);
    }
}
