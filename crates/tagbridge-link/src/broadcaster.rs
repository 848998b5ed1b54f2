//! Fan-out event hub.
//!
//! Every event the bridge produces goes through one [`EventHub`], which
//! delivers it to every subscriber attached at publish time. There is no
//! replay: a subscriber attached after an event was published never sees
//! that event.
//!
//! # Delivery policy
//!
//! Publish must never stall the detection pipeline, so delivery is
//! bounded-effort: each subscriber owns a bounded queue
//! ([`SUBSCRIBER_QUEUE_DEPTH`] deep), a full queue drops the event for
//! that subscriber only, and a closed receiver unsubscribes implicitly.
//! Events are ordered per subscriber; ordering across subscribers is
//! unspecified.
//!
//! # Concurrency
//!
//! Subscribe, unsubscribe and publish may race freely. Publish snapshots
//! the registry under a short mutex and sends outside it, so an attach or
//! detach concurrent with a publish costs at most one boundary event —
//! never a crash.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tagbridge_core::{ScanEvent, constants::SUBSCRIBER_QUEUE_DEPTH};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Identifies one subscriber registration.
pub type SubscriberId = u64;

struct SubscriberEntry {
    tx: mpsc::Sender<ScanEvent>,
    attached_at: DateTime<Utc>,
}

#[derive(Default)]
struct HubInner {
    next_id: SubscriberId,
    subscribers: HashMap<SubscriberId, SubscriberEntry>,
}

/// A live subscriber registration.
///
/// Dropping the subscription (or just its receiver) detaches implicitly:
/// the next publish notices the closed channel and removes the entry.
#[derive(Debug)]
pub struct Subscription {
    /// Registration id, used for explicit unsubscribe.
    pub id: SubscriberId,

    /// When this subscriber attached.
    pub attached_at: DateTime<Utc>,

    receiver: mpsc::Receiver<ScanEvent>,
}

impl Subscription {
    /// Receive the next event, or `None` once the hub is gone.
    pub async fn recv(&mut self) -> Option<ScanEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking receive for tests and polling callers.
    pub fn try_recv(&mut self) -> Option<ScanEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Fan-out publish/subscribe hub for scan events.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Attach a new subscriber.
    ///
    /// The subscriber receives every event published from this moment on,
    /// in publish order, subject to the bounded-queue drop policy.
    pub fn subscribe(&self) -> Subscription {
        let (tx, receiver) = mpsc::channel(SUBSCRIBER_QUEUE_DEPTH);
        let attached_at = Utc::now();

        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.insert(id, SubscriberEntry { tx, attached_at });

        debug!(subscriber = id, total = inner.subscribers.len(), "subscriber attached");

        Subscription {
            id,
            attached_at,
            receiver,
        }
    }

    /// Detach a subscriber. Returns `false` if the id was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut inner = self.lock();
        let removed = inner.subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber = id, total = inner.subscribers.len(), "subscriber detached");
        }
        removed
    }

    /// Deliver an event to every currently attached subscriber.
    ///
    /// Never blocks. Returns the number of subscribers that accepted the
    /// event.
    pub fn publish(&self, event: &ScanEvent) -> usize {
        // Point-in-time snapshot; sends happen outside the lock.
        let snapshot: Vec<(SubscriberId, mpsc::Sender<ScanEvent>)> = {
            let inner = self.lock();
            inner
                .subscribers
                .iter()
                .map(|(id, entry)| (*id, entry.tx.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut closed = Vec::new();

        for (id, tx) in snapshot {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // Lagging subscriber: drop this event for them only.
                    warn!(subscriber = id, "subscriber queue full, event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut inner = self.lock();
            for id in closed {
                if inner.subscribers.remove(&id).is_some() {
                    debug!(subscriber = id, "closed subscriber pruned");
                }
            }
        }

        trace!(delivered, "event published");
        delivered
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}
