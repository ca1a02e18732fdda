#![expect(
    clippy::module_name_repetitions,
    reason = "Adapter types expose their transport in the name for clarity"
)]

//! Adapter for the persistent RPC-style hub connection.
//!
//! The hub carries account and system notifications. Exactly two inbound
//! message kinds are handled; everything else is logged and dropped. There
//! is no retry built in: a failed connect simply leaves the transport
//! `Disconnected` until the manager explicitly reconnects.

use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::Result;
use crate::events::{AppEvent, EventDispatcher};
use crate::transport::{ConnectionState, Frame, RealtimeTransport};
use crate::types::NotificationEvent;

/// Inbound target for generic notifications, `(message, data)`.
const RECEIVE_NOTIFICATION: &str = "ReceiveNotification";
/// Inbound target for system updates, `(payload)`.
const RECEIVE_SYSTEM_UPDATE: &str = "ReceiveSystemUpdate";
/// Remote procedure invoked for outbound notifications.
const SEND_NOTIFICATION: &str = "SendNotification";

/// Owns the hub transport and forwards its two inbound message kinds to the
/// [`EventDispatcher`].
pub struct HubAdapter<T: RealtimeTransport> {
    transport: T,
    forwarder: JoinHandle<()>,
}

impl<T: RealtimeTransport> HubAdapter<T> {
    /// Wrap `transport` and start forwarding inbound frames to `dispatcher`.
    ///
    /// The transport is not connected here; connection is an explicit,
    /// separate step.
    pub fn new(transport: T, dispatcher: EventDispatcher) -> Self {
        let mut rx = transport.subscribe();

        let forwarder = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(frame) => forward(&dispatcher, frame),
                    Err(RecvError::Lagged(n)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("hub forwarder lagged, missed {n} frames");
                        #[cfg(not(feature = "tracing"))]
                        let _ = n;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            transport,
            forwarder,
        }
    }

    /// (Re)connect with `token`, tearing down any running connection first.
    pub async fn connect(&self, token: &SecretString) -> Result<()> {
        self.transport.connect(token).await
    }

    pub async fn disconnect(&self) -> Result<()> {
        self.transport.disconnect().await
    }

    /// Invoke the remote notification procedure and wait for the write to
    /// complete.
    pub async fn send_notification(&self, message: &str, data: Option<Value>) -> Result<()> {
        self.transport
            .invoke(SEND_NOTIFICATION, json!([message, data]))
            .await
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

impl<T: RealtimeTransport> Drop for HubAdapter<T> {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// Translate one hub frame into an application event.
fn forward(dispatcher: &EventDispatcher, frame: Frame) {
    match frame.event.as_str() {
        RECEIVE_NOTIFICATION => match notification_from(frame.payload) {
            Some(event) => dispatcher.publish(AppEvent::Notification(event)),
            None => {
                #[cfg(feature = "tracing")]
                tracing::warn!("malformed notification payload, dropped");
            }
        },
        RECEIVE_SYSTEM_UPDATE => dispatcher.publish(AppEvent::SystemUpdate(frame.payload)),
        _other => {
            #[cfg(feature = "tracing")]
            tracing::trace!(target = %frame.event, "unhandled hub target");
        }
    }
}

/// The hub sends notifications as `(message, data)` argument pairs; a bare
/// string is accepted as a message without data.
fn notification_from(payload: Value) -> Option<NotificationEvent> {
    match payload {
        Value::Array(args) => {
            let mut args = args.into_iter();
            let message = match args.next()? {
                Value::String(message) => message,
                _ => return None,
            };
            let data = args.next().filter(|d| !d.is_null());
            Some(NotificationEvent { message, data })
        }
        Value::String(message) => Some(NotificationEvent {
            message,
            data: None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn notification_from_argument_pair() {
        let event = notification_from(json!(["outbid", {"auctionId": "A1"}]))
            .expect("valid payload");

        assert_eq!(event.message, "outbid");
        assert_eq!(event.data, Some(json!({"auctionId": "A1"})));
    }

    #[test]
    fn notification_null_data_becomes_none() {
        let event = notification_from(json!(["outbid", null])).expect("valid payload");
        assert!(event.data.is_none());
    }

    #[test]
    fn notification_from_bare_string() {
        let event = notification_from(json!("maintenance at noon")).expect("valid payload");
        assert_eq!(event.message, "maintenance at noon");
        assert!(event.data.is_none());
    }

    #[test]
    fn notification_rejects_non_string_message() {
        assert!(notification_from(json!([42, "data"])).is_none());
        assert!(notification_from(json!({"weird": true})).is_none());
    }
}
