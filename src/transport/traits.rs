//! Core traits the adapters and manager program against.

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::{broadcast, watch};

use super::ConnectionState;
use crate::Result;

/// One decoded inbound or outbound message, independent of wire framing.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Logical event name (`new-bid`, `ReceiveNotification`, ...)
    pub event: String,
    /// Event payload, forwarded without transformation
    pub payload: Value,
}

impl Frame {
    #[must_use]
    pub fn new<E: Into<String>>(event: E, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// Wire framing strategy for one transport.
///
/// The hub and the event socket use different JSON envelopes; a codec maps
/// between the envelope and the neutral [`Frame`] both directions.
pub trait FrameCodec: Send + Sync + 'static {
    /// Parse raw text into frames.
    ///
    /// May return an empty vec for frames that carry no application payload
    /// (acknowledgements, keep-alives).
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Frame>>;

    /// Encode a frame into outbound wire text.
    fn encode(&self, frame: &Frame) -> Result<String>;
}

/// A long-lived, token-authenticated real-time connection.
///
/// Implemented by [`WsTransport`](super::WsTransport) for production and by
/// in-memory mocks in tests. The contract deliberately mirrors the adapter
/// needs and nothing more: connect/disconnect lifecycle, fire-and-forget
/// emit, awaited invoke, and broadcast-style inbound delivery.
#[async_trait]
pub trait RealtimeTransport: Send + Sync + 'static {
    /// Establish a connection bound to `token`.
    ///
    /// If a connection is already running it is fully stopped (awaited)
    /// first; connections are rebuilt per token, never mutated in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established. The state
    /// is left `Disconnected`; no retry is attempted.
    async fn connect(&self, token: &SecretString) -> Result<()>;

    /// Stop the connection, if any. Safe to call when never connected.
    async fn disconnect(&self) -> Result<()>;

    /// Queue an outbound frame, fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is not connected.
    fn emit(&self, event: &str, payload: Value) -> Result<()>;

    /// Send an outbound frame and wait until it has been written to the
    /// socket.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport is not connected or the write
    /// fails.
    async fn invoke(&self, event: &str, payload: Value) -> Result<()>;

    /// Attach a new receiver for inbound frames.
    fn subscribe(&self) -> broadcast::Receiver<Frame>;

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    /// Receiver notified on every state transition.
    fn state_receiver(&self) -> watch::Receiver<ConnectionState>;

    /// Whether the connection is currently active.
    fn is_connected(&self) -> bool {
        self.state().is_connected()
    }
}
