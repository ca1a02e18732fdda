//! Application-wide event fan-out.
//!
//! Transport adapters publish [`AppEvent`]s here; any number of UI consumers
//! subscribe without holding a reference to either adapter. Fan-out is a
//! [`tokio::sync::broadcast`] channel: each subscriber gets an independent
//! receiver, and dropping the receiver detaches it. Payloads are forwarded
//! exactly as received from the wire, with no enrichment.

use async_stream::try_stream;
use futures::Stream;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::Result;
use crate::transport::TransportError;
use crate::types::{AuctionStatusEvent, BidData, NotificationEvent, ParticipantCount};

/// Default capacity of the broadcast channel.
const BROADCAST_CAPACITY: usize = 1024;

/// Stable application event names.
///
/// These are part of the public contract; consumers may rely on
/// [`AppEvent::name`] returning exactly these strings.
pub mod names {
    pub const AUCTION_NEW_BID: &str = "auction-new-bid";
    pub const AUCTION_STATUS_UPDATE: &str = "auction-status-update";
    pub const AUCTION_START: &str = "auction-start";
    pub const AUCTION_END: &str = "auction-end";
    pub const AUCTION_PARTICIPANT_COUNT: &str = "auction-participant-count";
    pub const NOTIFICATION: &str = "notification";
    pub const SYSTEM_UPDATE: &str = "system-update";
}

/// A typed application event, one variant per published event name.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A bid was placed in some auction
    NewBid(BidData),
    /// An auction changed status
    StatusUpdate(AuctionStatusEvent),
    /// An auction started; payload is forwarded verbatim
    AuctionStart(Value),
    /// An auction ended; payload is forwarded verbatim
    AuctionEnd(Value),
    /// Participant count changed in a joined auction room
    ParticipantCount(ParticipantCount),
    /// Account notification from the hub
    Notification(NotificationEvent),
    /// System-wide update from the hub; payload is forwarded verbatim
    SystemUpdate(Value),
}

impl AppEvent {
    /// The stable name this event is published under.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NewBid(_) => names::AUCTION_NEW_BID,
            Self::StatusUpdate(_) => names::AUCTION_STATUS_UPDATE,
            Self::AuctionStart(_) => names::AUCTION_START,
            Self::AuctionEnd(_) => names::AUCTION_END,
            Self::ParticipantCount(_) => names::AUCTION_PARTICIPANT_COUNT,
            Self::Notification(_) => names::NOTIFICATION,
            Self::SystemUpdate(_) => names::SYSTEM_UPDATE,
        }
    }
}

/// Process-wide dispatcher turning adapter callbacks into broadcast events.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventDispatcher {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(BROADCAST_CAPACITY)
    }
}

impl EventDispatcher {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Publishing with no subscribers attached is not an error; the event is
    /// simply dropped.
    pub fn publish(&self, event: AppEvent) {
        _ = self.tx.send(event);
    }

    /// Attach a new subscriber.
    ///
    /// Each call returns an independent receiver. Dropping the receiver
    /// detaches it; holding one that is never drained will eventually make it
    /// observe [`RecvError::Lagged`].
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Attach a new subscriber as a [`Stream`].
    ///
    /// A slow consumer sees an explicit [`TransportError::Lagged`] error
    /// instead of silently missing events. The stream ends when the
    /// dispatcher and all its clones are dropped.
    pub fn stream(&self) -> impl Stream<Item = Result<AppEvent>> + use<> {
        let mut rx = self.subscribe();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(n)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("event subscriber lagged, missed {n} events");
                        Err(TransportError::Lagged { count: n })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    /// Number of currently attached subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt as _;
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn sample_bid() -> BidData {
        BidData {
            auction_id: "A1".to_owned(),
            bid_amount: dec!(1000),
            user_id: "u1".to_owned(),
            user_name: "Ana".to_owned(),
        }
    }

    #[test]
    fn event_names_are_stable() {
        assert_eq!(AppEvent::NewBid(sample_bid()).name(), "auction-new-bid");
        assert_eq!(
            AppEvent::ParticipantCount(ParticipantCount { count: 3 }).name(),
            "auction-participant-count"
        );
        assert_eq!(
            AppEvent::SystemUpdate(json!({"v": 1})).name(),
            "system-update"
        );
    }

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let dispatcher = EventDispatcher::default();
        let mut first = dispatcher.subscribe();
        let mut second = dispatcher.subscribe();

        dispatcher.publish(AppEvent::NewBid(sample_bid()));

        for rx in [&mut first, &mut second] {
            match rx.recv().await.expect("event") {
                AppEvent::NewBid(bid) => assert_eq!(bid, sample_bid()),
                other => panic!("expected NewBid, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn dropping_receiver_detaches_it() {
        let dispatcher = EventDispatcher::default();
        let rx = dispatcher.subscribe();
        assert_eq!(dispatcher.receiver_count(), 1);

        drop(rx);
        assert_eq!(dispatcher.receiver_count(), 0);

        // Publishing with nobody listening must not panic.
        dispatcher.publish(AppEvent::AuctionStart(json!({"auctionId": "A1"})));
    }

    #[tokio::test]
    async fn slow_stream_consumer_sees_lag_as_an_error() {
        let dispatcher = EventDispatcher::new(2);
        let stream = dispatcher.stream();
        let mut stream = Box::pin(stream);

        // Overrun the channel before the stream is polled once.
        for _ in 0..5 {
            dispatcher.publish(AppEvent::NewBid(sample_bid()));
        }

        let first = stream.next().await.expect("stream item");
        let err = first.expect_err("an overrun consumer must see the miss");
        assert!(
            matches!(
                err.downcast_ref::<TransportError>(),
                Some(TransportError::Lagged { count: 3 })
            ),
            "expected three missed events, got {err}"
        );

        // After reporting the lag the stream resumes with retained events.
        let next = stream.next().await.expect("stream item").expect("event");
        assert!(matches!(next, AppEvent::NewBid(_)));
    }

    #[tokio::test]
    async fn publish_before_subscribe_is_not_delivered() {
        let dispatcher = EventDispatcher::default();
        dispatcher.publish(AppEvent::NewBid(sample_bid()));

        let mut rx = dispatcher.subscribe();
        dispatcher.publish(AppEvent::AuctionEnd(json!({"auctionId": "A1"})));

        // Only the event published after attaching is visible.
        match rx.recv().await.expect("event") {
            AppEvent::AuctionEnd(_) => {}
            other => panic!("expected AuctionEnd, got {other:?}"),
        }
    }
}
