//! Transport abstraction for the two real-time connections.
//!
//! Both the hub and the event socket are WebSocket connections that differ
//! only in wire framing. [`RealtimeTransport`] is the seam the adapters and
//! the manager program against; [`WsTransport`] is the tokio-tungstenite
//! implementation, parameterized by a [`FrameCodec`] for the framing
//! strategy. Tests substitute mock transports through the same trait.

pub mod codec;
pub mod error;
pub mod traits;
pub mod ws;

use std::time::Instant;

pub use codec::{HubCodec, SocketCodec};
pub use error::TransportError;
pub use traits::{Frame, FrameCodec, RealtimeTransport};
pub use ws::WsTransport;

/// Connection state of a single transport.
///
/// Transitions are driven only by transport lifecycle calls:
/// `Idle → Connecting → Connected`, `Connected → Disconnected` on failure or
/// stop, and `Disconnected → Reconnecting` only via an explicit reconnect.
/// There is no automatic retry loop.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected
    Idle,
    /// First connection attempt in progress
    Connecting,
    /// Successfully connected
    Connected {
        /// When the connection was established
        since: Instant,
    },
    /// Not connected, after a failure or an explicit stop
    Disconnected,
    /// An explicit reconnect attempt is in progress
    Reconnecting {
        /// How many connection attempts have been made so far, this one
        /// included
        attempt: u32,
    },
}

impl ConnectionState {
    /// Check whether the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}
