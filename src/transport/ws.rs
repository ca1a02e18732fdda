#![expect(
    clippy::module_name_repetitions,
    reason = "The transport type names its wire protocol for clarity"
)]

//! tokio-tungstenite implementation of [`RealtimeTransport`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use futures::{SinkExt as _, StreamExt as _};
use secrecy::{ExposeSecret as _, SecretString};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::traits::{Frame, FrameCodec, RealtimeTransport};
use super::{ConnectionState, TransportError};
use crate::Result;
use crate::config::TransportConfig;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Broadcast channel capacity for inbound frames.
const BROADCAST_CAPACITY: usize = 1024;

/// One queued outbound message, optionally acknowledged once written.
struct Outbound {
    text: String,
    ack: Option<oneshot::Sender<Result<()>>>,
}

/// Handles to the connection task of the currently active socket.
struct Active {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

type SenderSlot = Arc<RwLock<Option<mpsc::UnboundedSender<Outbound>>>>;

/// A single token-authenticated WebSocket connection.
///
/// The transport never connects on construction and never retries on its
/// own: [`connect`](RealtimeTransport::connect) dials exactly once, and a
/// failed attempt or a dropped socket leaves the state `Disconnected` until
/// the caller explicitly reconnects. Each connect fully stops any running
/// connection task before dialing, so a token refresh always gets a fresh
/// socket.
pub struct WsTransport {
    endpoint: Url,
    /// Query parameter name carrying the auth token
    token_param: String,
    config: TransportConfig,
    codec: Arc<dyn FrameCodec>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    broadcast_tx: broadcast::Sender<Frame>,
    /// Outbound queue of the active connection, `None` while disconnected
    sender_slot: SenderSlot,
    /// Serializes connect/disconnect; held for the whole dial so a connect
    /// cannot be cancelled halfway by a competing lifecycle call
    active: Mutex<Option<Active>>,
    attempts: AtomicU32,
}

impl WsTransport {
    /// Create a transport for `endpoint`, authenticating via the given query
    /// parameter and framing messages with `codec`.
    pub fn new<C: FrameCodec>(
        endpoint: Url,
        token_param: &str,
        config: TransportConfig,
        codec: C,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);

        Self {
            endpoint,
            token_param: token_param.to_owned(),
            config,
            codec: Arc::new(codec),
            state_tx,
            state_rx,
            broadcast_tx,
            sender_slot: Arc::new(RwLock::new(None)),
            active: Mutex::new(None),
            attempts: AtomicU32::new(0),
        }
    }

    /// Stop the running connection task, if any, and wait for it to finish.
    async fn stop_active(&self, active: &mut Option<Active>) {
        if let Some(conn) = active.take() {
            _ = conn.shutdown_tx.send(true);
            _ = conn.task.await;
        }
    }

    fn store_sender(&self, sender: Option<mpsc::UnboundedSender<Outbound>>) {
        *self
            .sender_slot
            .write()
            .unwrap_or_else(PoisonError::into_inner) = sender;
    }

    fn current_sender(&self) -> Option<mpsc::UnboundedSender<Outbound>> {
        self.sender_slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// I/O loop of one active connection. Runs until the socket drops, the
    /// heartbeat expires, or a shutdown is signalled; always leaves the
    /// state `Disconnected` on exit.
    async fn run_connection(
        ws_stream: WsStream,
        mut sender_rx: mpsc::UnboundedReceiver<Outbound>,
        mut shutdown_rx: watch::Receiver<bool>,
        broadcast_tx: broadcast::Sender<Frame>,
        codec: Arc<dyn FrameCodec>,
        state_tx: watch::Sender<ConnectionState>,
        sender_slot: SenderSlot,
        config: TransportConfig,
    ) {
        let (mut write, mut read) = ws_stream.split();
        let mut ping_interval = interval(config.heartbeat_interval);
        let mut last_pong = Instant::now();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match codec.decode(text.as_bytes()) {
                                Ok(frames) => {
                                    for frame in frames {
                                        #[cfg(feature = "tracing")]
                                        tracing::trace!(event = %frame.event, "inbound frame");
                                        _ = broadcast_tx.send(frame);
                                    }
                                }
                                Err(e) => {
                                    #[cfg(feature = "tracing")]
                                    tracing::warn!(%text, error = %e, "undecodable frame, dropped");
                                    #[cfg(not(feature = "tracing"))]
                                    let _ = (&text, &e);
                                }
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            last_pong = Instant::now();
                        }
                        // Pings are answered by the websocket layer itself
                        Some(Ok(Message::Ping(_) | Message::Binary(_) | Message::Frame(_))) => {}
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(e)) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(error = %e, "socket read failed");
                            #[cfg(not(feature = "tracing"))]
                            let _ = &e;
                            break;
                        }
                    }
                }

                out = sender_rx.recv() => {
                    let Some(out) = out else { break };
                    let result = write.send(Message::Text(out.text.into())).await;
                    let failed = result.is_err();
                    if let Some(ack) = out.ack {
                        _ = ack.send(result.map_err(Into::into));
                    }
                    if failed {
                        break;
                    }
                }

                _ = ping_interval.tick() => {
                    if last_pong.elapsed() > config.heartbeat_timeout {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            "heartbeat timeout: no PONG within {:?}",
                            config.heartbeat_timeout
                        );
                        break;
                    }
                    if write.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }

                _ = shutdown_rx.changed() => {
                    _ = write.send(Message::Close(None)).await;
                    break;
                }
            }
        }

        *sender_slot.write().unwrap_or_else(PoisonError::into_inner) = None;
        _ = state_tx.send(ConnectionState::Disconnected);
    }
}

#[async_trait]
impl RealtimeTransport for WsTransport {
    async fn connect(&self, token: &SecretString) -> Result<()> {
        let mut active = self.active.lock().await;

        // A running connection is fully stopped before the new one is
        // dialed; sockets are rebuilt per token, never reused.
        self.stop_active(&mut active).await;

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        _ = self.state_tx.send(if attempt == 1 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting { attempt }
        });

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(&self.token_param, token.expose_secret());

        let ws_stream = match connect_async(url.as_str()).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                _ = self.state_tx.send(ConnectionState::Disconnected);
                #[cfg(feature = "tracing")]
                tracing::warn!(endpoint = %self.endpoint, error = %e, "connect failed");
                return Err(e.into());
            }
        };

        let (sender_tx, sender_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.store_sender(Some(sender_tx));
        _ = self.state_tx.send(ConnectionState::Connected {
            since: Instant::now(),
        });

        let task = tokio::spawn(Self::run_connection(
            ws_stream,
            sender_rx,
            shutdown_rx,
            self.broadcast_tx.clone(),
            Arc::clone(&self.codec),
            self.state_tx.clone(),
            Arc::clone(&self.sender_slot),
            self.config.clone(),
        ));

        *active = Some(Active { shutdown_tx, task });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut active = self.active.lock().await;
        self.stop_active(&mut active).await;
        self.store_sender(None);
        // An explicit stop ends the connection's history; the next connect
        // is a fresh `Connecting`, not a resumed `Reconnecting`.
        self.attempts.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn emit(&self, event: &str, payload: Value) -> Result<()> {
        let Some(sender) = self.current_sender() else {
            return Err(TransportError::NotConnected.into());
        };

        let text = self.codec.encode(&Frame::new(event, payload))?;
        sender
            .send(Outbound { text, ack: None })
            .map_err(|_e| TransportError::ConnectionClosed)?;
        Ok(())
    }

    async fn invoke(&self, event: &str, payload: Value) -> Result<()> {
        let Some(sender) = self.current_sender() else {
            return Err(TransportError::NotConnected.into());
        };

        let text = self.codec.encode(&Frame::new(event, payload))?;
        let (ack_tx, ack_rx) = oneshot::channel();
        sender
            .send(Outbound {
                text,
                ack: Some(ack_tx),
            })
            .map_err(|_e| TransportError::ConnectionClosed)?;

        ack_rx.await.map_err(|_e| {
            TransportError::InvokeFailed("connection closed before the write completed".to_owned())
        })?
    }

    fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.broadcast_tx.subscribe()
    }

    fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}
