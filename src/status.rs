#![expect(
    clippy::module_name_repetitions,
    reason = "Status types expose their domain in the name for clarity"
)]

//! Consumer-facing status and lifecycle helpers.
//!
//! These sit on top of the manager's public contract; nothing here touches
//! transport internals.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::manager::ConnectionManager;
use crate::transport::RealtimeTransport;
use crate::types::ConnectionStatus;

/// Periodic poller of [`ConnectionManager::connection_status`].
///
/// Polling is a deliberate staleness/simplicity tradeoff: a snapshot can be
/// up to one interval old. Consumers that need instant transitions can use
/// the transports' state receivers instead.
///
/// Dropping the watcher stops the polling task.
pub struct StatusWatcher {
    rx: watch::Receiver<ConnectionStatus>,
    task: JoinHandle<()>,
}

impl StatusWatcher {
    /// Start polling `manager` every `period`.
    pub(crate) fn spawn<H, S>(manager: Arc<ConnectionManager<H, S>>, period: Duration) -> Self
    where
        H: RealtimeTransport,
        S: RealtimeTransport,
    {
        let (tx, rx) = watch::channel(manager.connection_status());

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                if tx.send(manager.connection_status()).is_err() {
                    break;
                }
            }
        });

        Self { rx, task }
    }

    /// The most recently polled snapshot.
    #[must_use]
    pub fn current(&self) -> ConnectionStatus {
        *self.rx.borrow()
    }

    /// A receiver notified on every poll.
    #[must_use]
    pub fn receiver(&self) -> watch::Receiver<ConnectionStatus> {
        self.rx.clone()
    }
}

impl Drop for StatusWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// RAII room membership tied to a UI component's lifetime: join on
/// construction, leave on drop.
///
/// The join is gated on the event socket already reporting connected — if
/// it is not, or the join message fails to send, [`joined`](Self::joined)
/// returns `false`. The leave on drop is always attempted; leaving a room
/// that was never entered is a no-op.
pub struct AuctionRoomGuard<H, S>
where
    H: RealtimeTransport,
    S: RealtimeTransport,
{
    manager: Arc<ConnectionManager<H, S>>,
    auction_id: String,
    joined: bool,
}

impl<H, S> AuctionRoomGuard<H, S>
where
    H: RealtimeTransport,
    S: RealtimeTransport,
{
    pub(crate) fn new(manager: Arc<ConnectionManager<H, S>>, auction_id: &str) -> Self {
        let joined = manager.join_auction(auction_id);

        Self {
            manager,
            auction_id: auction_id.to_owned(),
            joined,
        }
    }

    /// Whether the join actually took effect at construction time.
    #[must_use]
    pub fn joined(&self) -> bool {
        self.joined
    }

    /// The auction this guard is scoped to.
    #[must_use]
    pub fn auction_id(&self) -> &str {
        &self.auction_id
    }
}

impl<H, S> Drop for AuctionRoomGuard<H, S>
where
    H: RealtimeTransport,
    S: RealtimeTransport,
{
    fn drop(&mut self) {
        self.manager.leave_auction(&self.auction_id);
    }
}
