#![expect(
    clippy::module_name_repetitions,
    reason = "The manager type carries its role in the name for API clarity"
)]

//! The connection manager owning both real-time connections.

use std::sync::{Arc, PoisonError, RwLock};

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};

use crate::Result;
use crate::config::Config;
use crate::error::Error;
use crate::events::{AppEvent, EventDispatcher};
use crate::hub::HubAdapter;
use crate::socket::EventSocketAdapter;
use crate::status::{AuctionRoomGuard, StatusWatcher};
use crate::transport::{HubCodec, RealtimeTransport, SocketCodec, WsTransport};
use crate::types::{BidData, ConnectionStatus, UserIdentity};

/// Query parameter carrying the token on the hub connection.
const HUB_TOKEN_PARAM: &str = "access_token";
/// Query parameter carrying the token on the event socket.
const SOCKET_TOKEN_PARAM: &str = "token";

/// Orchestrator for the hub and event-socket connections.
///
/// Constructed once at application bootstrap and shared by reference
/// (typically inside an [`Arc`]) for the process lifetime; there is no
/// module-level global. All connection mutation goes through this type.
///
/// The manager is the swallow boundary of the error design: connect
/// failures and outbound calls while disconnected are logged and reflected
/// in [`connection_status`](Self::connection_status), never surfaced as
/// errors to UI callers.
///
/// # Examples
///
/// ```rust, no_run
/// use auction_realtime_client::{Config, ConnectionManager};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let manager = std::sync::Arc::new(ConnectionManager::new(Config::default()));
///     manager.initialize_connections("abc123").await;
///
///     let status = manager.connection_status();
///     println!("hub={} socket={}", status.hub, status.event_socket);
///
///     manager.disconnect_all().await;
///     Ok(())
/// }
/// ```
pub struct ConnectionManager<H = WsTransport, S = WsTransport>
where
    H: RealtimeTransport,
    S: RealtimeTransport,
{
    hub: HubAdapter<H>,
    socket: EventSocketAdapter<S>,
    dispatcher: EventDispatcher,
    config: Config,
    /// Serializes initialize/reconnect/disconnect so duplicate concurrent
    /// calls cannot race into duplicate underlying connections
    lifecycle: Mutex<()>,
    /// Most recently supplied auth token, reused by tokenless reconnects
    token: RwLock<Option<SecretString>>,
    /// Authenticated user identity merged into outbound bids
    identity: RwLock<Option<UserIdentity>>,
}

impl ConnectionManager {
    /// Create a manager with WebSocket transports for both connections,
    /// per the endpoints in `config`. Nothing is connected yet.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let hub = WsTransport::new(
            config.hub_url.clone(),
            HUB_TOKEN_PARAM,
            config.transport.clone(),
            HubCodec,
        );
        let socket = WsTransport::new(
            config.event_socket_url.clone(),
            SOCKET_TOKEN_PARAM,
            config.transport.clone(),
            SocketCodec,
        );
        Self::with_transports(config, hub, socket)
    }
}

impl<H, S> ConnectionManager<H, S>
where
    H: RealtimeTransport,
    S: RealtimeTransport,
{
    /// Create a manager over caller-supplied transports.
    ///
    /// This is the substitution seam: tests pass mock transports, and an
    /// alternative wire stack can be swapped in without touching the
    /// manager.
    pub fn with_transports(config: Config, hub: H, event_socket: S) -> Self {
        let dispatcher = EventDispatcher::default();

        Self {
            hub: HubAdapter::new(hub, dispatcher.clone()),
            socket: EventSocketAdapter::new(event_socket, dispatcher.clone()),
            dispatcher,
            config,
            lifecycle: Mutex::new(()),
            token: RwLock::new(None),
            identity: RwLock::new(None),
        }
    }

    /// Connect both transports with `token`, in parallel.
    ///
    /// Each transport has its own failure boundary: one failing to connect
    /// neither prevents nor rejects the other, and no error is returned —
    /// outcomes are observable via [`connection_status`](Self::connection_status).
    /// Idempotent under concurrent and repeated calls; a transport that is
    /// already connected is left untouched.
    pub async fn initialize_connections(&self, token: &str) {
        let _guard = self.lifecycle.lock().await;

        let token = SecretString::from(token.to_owned());
        self.store_token(token.clone());

        let hub = async {
            if self.hub.is_connected() {
                return;
            }
            if let Err(e) = self.hub.connect(&token).await {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "hub connect failed");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
            }
        };

        let socket = async {
            if self.socket.is_connected() {
                return;
            }
            if let Err(e) = self.socket.connect(&token).await {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %e, "event socket connect failed");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
            }
        };

        tokio::join!(hub, socket);
    }

    /// Current connectivity snapshot, read fresh from transport state.
    ///
    /// `overall` is the OR of both flags; bid-critical callers should check
    /// `event_socket` directly.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus::new(self.hub.is_connected(), self.socket.is_connected())
    }

    /// Join the auction room, if the event socket is connected.
    ///
    /// A join attempted before the socket is up is skipped, not queued;
    /// this mirrors the mount-time gating of the consuming UI. Returns
    /// whether the client is a member of the room after the call, so
    /// callers holding membership state can track the actual outcome
    /// rather than the attempt.
    pub fn join_auction(&self, auction_id: &str) -> bool {
        if !self.socket.is_connected() {
            #[cfg(feature = "tracing")]
            tracing::debug!(%auction_id, "join skipped, event socket not connected");
            return false;
        }
        match self.socket.join_room(auction_id) {
            Ok(()) => true,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(%auction_id, error = %e, "join failed");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                false
            }
        }
    }

    /// Leave the auction room. No-op while disconnected or never joined.
    pub fn leave_auction(&self, auction_id: &str) {
        if !self.socket.is_connected() {
            return;
        }
        if let Err(e) = self.socket.leave_room(auction_id) {
            #[cfg(feature = "tracing")]
            tracing::warn!(%auction_id, error = %e, "leave failed");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
    }

    /// Send a bid, fire-and-forget. Silently a no-op while the event
    /// socket is disconnected; there is no queuing for later delivery.
    pub fn place_bid(&self, bid: &BidData) {
        if !self.socket.is_connected() {
            #[cfg(feature = "tracing")]
            tracing::debug!(auction_id = %bid.auction_id, "bid dropped, event socket not connected");
            return;
        }
        if let Err(e) = self.socket.place_bid(bid) {
            #[cfg(feature = "tracing")]
            tracing::warn!(auction_id = %bid.auction_id, error = %e, "bid emit failed");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
    }

    /// Build a [`BidData`] from the stored identity and send it.
    ///
    /// Dropped with a warning if no identity has been stored via
    /// [`set_identity`](Self::set_identity).
    pub fn submit_bid(&self, auction_id: &str, amount: Decimal) {
        let identity = self
            .identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let Some(identity) = identity else {
            #[cfg(feature = "tracing")]
            tracing::warn!(%auction_id, "bid dropped, no authenticated identity stored");
            return;
        };

        self.place_bid(&BidData {
            auction_id: auction_id.to_owned(),
            bid_amount: amount,
            user_id: identity.user_id,
            user_name: identity.user_name,
        });
    }

    /// Store the authenticated user's identity for outbound bids.
    pub fn set_identity(&self, identity: UserIdentity) {
        *self
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }

    /// Invoke the remote notification procedure on the hub and wait for
    /// completion. Failures are logged and swallowed, per the status-flag
    /// error contract.
    pub async fn send_notification(&self, message: &str, data: Option<Value>) {
        if let Err(e) = self.hub.send_notification(message, data).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "notification send failed");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
    }

    /// Stop both transports. Safe to call when one or both were never
    /// connected.
    pub async fn disconnect_all(&self) {
        let _guard = self.lifecycle.lock().await;

        if let Err(e) = self.hub.disconnect().await {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "hub disconnect failed");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
        if let Err(e) = self.socket.disconnect().await {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "event socket disconnect failed");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
    }

    /// Reconnect the hub. No-op while it already reports connected, which
    /// prevents duplicate concurrent connections. `token` of `None` reuses
    /// the most recently supplied token.
    ///
    /// # Errors
    ///
    /// Returns an error if no token was ever supplied, or if the connect
    /// attempt itself fails. Unlike `initialize_connections`, a manual
    /// reconnect reports its outcome so the retrying caller can react.
    pub async fn reconnect_hub(&self, token: Option<&str>) -> Result<()> {
        let _guard = self.lifecycle.lock().await;

        if self.hub.is_connected() {
            return Ok(());
        }
        let token = self.refresh_token(token)?;
        self.hub.connect(&token).await
    }

    /// Reconnect the event socket; same contract as [`reconnect_hub`](Self::reconnect_hub).
    pub async fn reconnect_event_socket(&self, token: Option<&str>) -> Result<()> {
        let _guard = self.lifecycle.lock().await;

        if self.socket.is_connected() {
            return Ok(());
        }
        let token = self.refresh_token(token)?;
        self.socket.connect(&token).await
    }

    /// Attach a new subscriber to the application event channel.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<AppEvent> {
        self.dispatcher.subscribe()
    }

    /// The dispatcher fanning out application events.
    #[must_use]
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Snapshot of currently joined auction rooms.
    #[must_use]
    pub fn joined_auctions(&self) -> Vec<String> {
        self.socket.joined_rooms()
    }

    /// Start a polling status watcher using the configured interval.
    #[must_use]
    pub fn watch_status(self: &Arc<Self>) -> StatusWatcher {
        StatusWatcher::spawn(Arc::clone(self), self.config.status_poll_interval)
    }

    /// Join the auction room for the lifetime of the returned guard.
    ///
    /// The join is skipped (not queued) if the event socket is not yet
    /// connected; the leave on drop is always attempted and is a no-op for
    /// rooms that were never joined.
    #[must_use]
    pub fn enter_auction(self: &Arc<Self>, auction_id: &str) -> AuctionRoomGuard<H, S> {
        AuctionRoomGuard::new(Arc::clone(self), auction_id)
    }

    fn store_token(&self, token: SecretString) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    fn refresh_token(&self, supplied: Option<&str>) -> Result<SecretString> {
        let mut slot = self.token.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = supplied {
            *slot = Some(SecretString::from(token.to_owned()));
        }
        slot.clone().ok_or_else(|| {
            Error::validation("no auth token available: call initialize_connections first")
        })
    }
}
