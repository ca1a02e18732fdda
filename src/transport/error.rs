#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

/// Transport error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum TransportError {
    /// Error connecting to or communicating with the WebSocket server
    Connection(tokio_tungstenite::tungstenite::Error),
    /// Error decoding an inbound frame
    Decode(serde_json::Error),
    /// Inbound frame did not match the expected envelope
    InvalidFrame(String),
    /// Outbound call attempted while not connected
    NotConnected,
    /// The connection was closed
    ConnectionClosed,
    /// An awaited invoke did not complete
    InvokeFailed(String),
    /// Subscriber lagged and missed messages
    Lagged {
        /// Number of messages that were missed
        count: u64,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "connection error: {e}"),
            Self::Decode(e) => write!(f, "failed to decode frame: {e}"),
            Self::InvalidFrame(msg) => write!(f, "invalid frame: {msg}"),
            Self::NotConnected => write!(f, "transport is not connected"),
            Self::ConnectionClosed => write!(f, "connection closed"),
            Self::InvokeFailed(reason) => write!(f, "invoke failed: {reason}"),
            Self::Lagged { count } => write!(f, "subscriber lagged, missed {count} messages"),
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for crate::error::Error {
    fn from(e: TransportError) -> Self {
        crate::error::Error::with_source(crate::error::Kind::Transport, e)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for crate::error::Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        crate::error::Error::with_source(
            crate::error::Kind::Transport,
            TransportError::Connection(e),
        )
    }
}
