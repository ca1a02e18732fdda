#![expect(
    clippy::module_name_repetitions,
    reason = "Codec types deliberately include the module name for clarity"
)]

//! Wire framing for the two connections.
//!
//! The hub speaks an RPC-style envelope, `{"target": ..., "arguments":
//! [...]}`; the event socket speaks a pub/sub envelope, `{"event": ...,
//! "data": ...}`. Both map onto the neutral [`Frame`] so the transport and
//! adapters stay framing-agnostic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TransportError;
use super::traits::{Frame, FrameCodec};
use crate::Result;

#[derive(Serialize, Deserialize)]
struct HubEnvelope {
    target: String,
    arguments: Vec<Value>,
}

/// Codec for the RPC-style hub connection.
///
/// Decoding: a single argument becomes the frame payload directly; multiple
/// arguments become a JSON array, preserved in order. Encoding mirrors this:
/// an array payload is sent as the argument list, anything else as a single
/// argument.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct HubCodec;

impl FrameCodec for HubCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Frame>> {
        let envelope: HubEnvelope =
            serde_json::from_slice(bytes).map_err(TransportError::Decode)?;

        let mut arguments = envelope.arguments;
        let payload = match arguments.len() {
            0 => Value::Null,
            1 => arguments.remove(0),
            _ => Value::Array(arguments),
        };

        Ok(vec![Frame::new(envelope.target, payload)])
    }

    fn encode(&self, frame: &Frame) -> Result<String> {
        let arguments = match &frame.payload {
            Value::Array(args) => args.clone(),
            Value::Null => Vec::new(),
            other => vec![other.clone()],
        };

        let envelope = HubEnvelope {
            target: frame.event.clone(),
            arguments,
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}

#[derive(Serialize, Deserialize)]
struct SocketEnvelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Codec for the bidirectional event socket.
///
/// Handles both a single envelope object and a JSON array of envelopes,
/// which the server uses to batch events under load.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketCodec;

impl FrameCodec for SocketCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Frame>> {
        let value: Value = serde_json::from_slice(bytes).map_err(TransportError::Decode)?;

        let envelopes: Vec<SocketEnvelope> = match value {
            Value::Array(items) => items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<std::result::Result<_, _>>()
                .map_err(TransportError::Decode)?,
            object @ Value::Object(_) => {
                vec![serde_json::from_value(object).map_err(TransportError::Decode)?]
            }
            other => {
                return Err(TransportError::InvalidFrame(format!(
                    "expected object or array, got {other}"
                ))
                .into());
            }
        };

        Ok(envelopes
            .into_iter()
            .map(|e| Frame::new(e.event, e.data))
            .collect())
    }

    fn encode(&self, frame: &Frame) -> Result<String> {
        let envelope = SocketEnvelope {
            event: frame.event.clone(),
            data: frame.payload.clone(),
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}
