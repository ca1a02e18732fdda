//! Adapter for the bidirectional bidding event socket.
//!
//! The event socket carries live bidding data, partitioned into rooms keyed
//! by auction id. Connection is always explicit; the adapter never connects
//! on construction, so the application controls exactly when the socket
//! comes up. Five inbound event kinds are forwarded verbatim to the
//! [`EventDispatcher`].

use dashmap::DashSet;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::Result;
use crate::events::{AppEvent, EventDispatcher};
use crate::transport::{ConnectionState, Frame, RealtimeTransport};
use crate::types::{AuctionStatusEvent, BidData, ParticipantCount};

/// Inbound socket event names.
const NEW_BID: &str = "new-bid";
const AUCTION_STATUS_UPDATE: &str = "auction-status-update";
const AUCTION_START: &str = "auction-start";
const AUCTION_END: &str = "auction-end";
const PARTICIPANT_COUNT: &str = "participant-count";

/// Outbound socket event names.
const JOIN_AUCTION: &str = "join-auction";
const LEAVE_AUCTION: &str = "leave-auction";
const PLACE_BID: &str = "place-bid";

/// Owns the event-socket transport: room membership, outbound bids, and
/// forwarding of the five inbound event kinds.
pub struct EventSocketAdapter<T: RealtimeTransport> {
    transport: T,
    /// Auction ids this client has joined; joins are idempotent
    rooms: DashSet<String>,
    forwarder: JoinHandle<()>,
}

impl<T: RealtimeTransport> EventSocketAdapter<T> {
    /// Wrap `transport` and start forwarding inbound events to `dispatcher`.
    pub fn new(transport: T, dispatcher: EventDispatcher) -> Self {
        let mut rx = transport.subscribe();

        let forwarder = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(frame) => forward(&dispatcher, frame),
                    Err(RecvError::Lagged(n)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("event-socket forwarder lagged, missed {n} frames");
                        #[cfg(not(feature = "tracing"))]
                        let _ = n;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            transport,
            rooms: DashSet::new(),
            forwarder,
        }
    }

    /// (Re)connect with `token`, tearing down any running connection first.
    ///
    /// Room membership is not replayed: the server drops room state with
    /// the old socket, and rejoining is the consumer's mount/unmount
    /// responsibility.
    pub async fn connect(&self, token: &SecretString) -> Result<()> {
        self.rooms.clear();
        self.transport.connect(token).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.rooms.clear();
        self.transport.disconnect().await
    }

    /// Join the room for `auction_id`. Joining a room twice sends nothing
    /// the second time.
    pub fn join_room(&self, auction_id: &str) -> Result<()> {
        if !self.rooms.insert(auction_id.to_owned()) {
            return Ok(());
        }

        if let Err(e) = self
            .transport
            .emit(JOIN_AUCTION, json!({ "auctionId": auction_id }))
        {
            self.rooms.remove(auction_id);
            return Err(e);
        }
        Ok(())
    }

    /// Leave the room for `auction_id`. Leaving a room that was never
    /// joined is a no-op.
    pub fn leave_room(&self, auction_id: &str) -> Result<()> {
        if self.rooms.remove(auction_id).is_none() {
            return Ok(());
        }

        self.transport
            .emit(LEAVE_AUCTION, json!({ "auctionId": auction_id }))
    }

    /// Send a bid, fire-and-forget. There is no acknowledgement contract;
    /// delivery is only as good as the connection.
    pub fn place_bid(&self, bid: &BidData) -> Result<()> {
        self.transport.emit(PLACE_BID, serde_json::to_value(bid)?)
    }

    /// Emit an arbitrary outbound event.
    pub fn emit(&self, event: &str, payload: Value) -> Result<()> {
        self.transport.emit(event, payload)
    }

    /// Snapshot of currently joined auction ids.
    #[must_use]
    pub fn joined_rooms(&self) -> Vec<String> {
        self.rooms.iter().map(|room| room.key().clone()).collect()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.transport.state()
    }
}

impl<T: RealtimeTransport> Drop for EventSocketAdapter<T> {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Translate one socket frame into an application event. Payloads are
/// forwarded without transformation; frames that fail to deserialize are
/// dropped with a warning rather than tearing the connection down.
fn forward(dispatcher: &EventDispatcher, frame: Frame) {
    match frame.event.as_str() {
        NEW_BID => publish_typed::<BidData>(dispatcher, frame.payload, AppEvent::NewBid),
        AUCTION_STATUS_UPDATE => {
            publish_typed::<AuctionStatusEvent>(dispatcher, frame.payload, AppEvent::StatusUpdate);
        }
        AUCTION_START => dispatcher.publish(AppEvent::AuctionStart(frame.payload)),
        AUCTION_END => dispatcher.publish(AppEvent::AuctionEnd(frame.payload)),
        PARTICIPANT_COUNT => {
            publish_typed::<ParticipantCount>(dispatcher, frame.payload, AppEvent::ParticipantCount);
        }
        _other => {
            #[cfg(feature = "tracing")]
            tracing::trace!(event = %frame.event, "unhandled socket event");
        }
    }
}

fn publish_typed<P: serde::de::DeserializeOwned>(
    dispatcher: &EventDispatcher,
    payload: Value,
    wrap: impl FnOnce(P) -> AppEvent,
) {
    match serde_json::from_value(payload) {
        Ok(parsed) => dispatcher.publish(wrap(parsed)),
        Err(e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %e, "malformed socket payload, dropped");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
        }
    }
}
