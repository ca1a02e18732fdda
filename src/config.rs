#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

//! Configuration for the connectivity bridge.

use std::time::Duration;

use url::Url;

use crate::Result;

/// Local-development fallback for the notification hub endpoint.
pub const DEFAULT_HUB_URL: &str = "ws://localhost:5041/hubs/auction";

/// Local-development fallback for the bidding event socket endpoint.
pub const DEFAULT_EVENT_SOCKET_URL: &str = "ws://localhost:3001/socket";

const DEFAULT_STATUS_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(15);

/// Endpoints and timing knobs for both real-time connections.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint of the RPC-style hub connection
    pub hub_url: Url,
    /// Endpoint of the bidirectional event socket
    pub event_socket_url: Url,
    /// How often the status watcher re-reads the connection snapshot
    pub status_poll_interval: Duration,
    /// Transport-level liveness settings, shared by both connections
    pub transport: TransportConfig,
}

impl Config {
    /// Build a configuration from explicit endpoint URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if either URL fails to parse.
    pub fn new(hub_url: &str, event_socket_url: &str) -> Result<Self> {
        Ok(Self {
            hub_url: Url::parse(hub_url)?,
            event_socket_url: Url::parse(event_socket_url)?,
            status_poll_interval: DEFAULT_STATUS_POLL_INTERVAL,
            transport: TransportConfig::default(),
        })
    }
}

impl Default for Config {
    /// Local-development configuration pointing at [`DEFAULT_HUB_URL`] and
    /// [`DEFAULT_EVENT_SOCKET_URL`].
    fn default() -> Self {
        Self::new(DEFAULT_HUB_URL, DEFAULT_EVENT_SOCKET_URL)
            .expect("default endpoints should parse")
    }
}

/// Liveness settings for a single WebSocket connection.
///
/// There is deliberately no reconnect/backoff section here: reconnection is
/// manual, via the manager's `reconnect_*` calls.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Interval between outgoing PING frames
    pub heartbeat_interval: Duration,
    /// Maximum silence after a PING before the connection is considered dead
    pub heartbeat_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_endpoints() {
        let config = Config::default();

        assert_eq!(config.hub_url.as_str(), DEFAULT_HUB_URL);
        assert_eq!(config.event_socket_url.as_str(), DEFAULT_EVENT_SOCKET_URL);
    }

    #[test]
    fn default_poll_interval_is_two_seconds() {
        let config = Config::default();
        assert_eq!(config.status_poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(Config::new("not a url", DEFAULT_EVENT_SOCKET_URL).is_err());
    }
}
