//! Core data model shared across the connectivity bridge.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outbound bid payload.
///
/// Built by [`ConnectionManager::submit_bid`](crate::ConnectionManager::submit_bid)
/// from caller-supplied bid fields merged with the authenticated user's
/// identity. Never persisted locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidData {
    pub auction_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub bid_amount: Decimal,
    pub user_id: String,
    pub user_name: String,
}

/// Identity of the authenticated user, sourced from the application's
/// authentication state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: String,
    pub user_name: String,
}

/// Auction lifecycle status change pushed over the event socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionStatusEvent {
    pub auction_id: String,
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Account/system notification pushed over the hub connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Live participant count for one auction room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantCount {
    pub count: u64,
}

/// Aggregate connectivity snapshot, regenerated on demand from transport
/// state flags.
///
/// `overall` is the logical OR of the two transport flags: the bridge is
/// considered usable while either channel is up. Callers that need the
/// bidding channel specifically must check `event_socket` directly rather
/// than `overall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub hub: bool,
    pub event_socket: bool,
    pub overall: bool,
}

impl ConnectionStatus {
    #[must_use]
    pub fn new(hub: bool, event_socket: bool) -> Self {
        Self {
            hub,
            event_socket,
            overall: hub || event_socket,
        }
    }
}
