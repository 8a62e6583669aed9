use common::RateSnapshot;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

pub type SubscriberId = u64;

/// Fan-out of live snapshots to in-process subscribers.
///
/// Delivery is best effort. Publishing never blocks the sampling loop, one
/// dead subscriber cannot affect the others, and a receiver that went away
/// is pruned on the next publish.
pub struct SnapshotBroadcaster {
    subscribers: DashMap<SubscriberId, UnboundedSender<RateSnapshot>>,
    next_id: AtomicU64,
}

impl SnapshotBroadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> (SubscriberId, UnboundedReceiver<RateSnapshot>) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.insert(id, tx);
        debug!("Snapshot subscriber {} registered", id);
        (id, rx)
    }

    /// Returns false when the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            debug!("Snapshot subscriber {} removed", id);
        }
        removed
    }

    pub fn publish(&self, snapshot: &RateSnapshot) {
        self.subscribers.retain(|id, tx| {
            let alive = tx.send(*snapshot).is_ok();
            if !alive {
                debug!("Snapshot subscriber {} disconnected", id);
            }
            alive
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for SnapshotBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
