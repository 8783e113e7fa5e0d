//! Broadcaster - fan-out of persisted records to live subscribers

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::PersistedRecord;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, instrument, warn};

use crate::metrics::{BroadcastMetrics, DropReason};
use crate::subscription::{Subscription, SubscriptionId};

/// Subscriber registry shared by the broadcaster and its subscriptions
pub(crate) struct Registry {
    senders: Mutex<HashMap<SubscriptionId, mpsc::Sender<PersistedRecord>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
    metrics: BroadcastMetrics,
}

impl Registry {
    /// Remove a subscriber; returns false if it was already gone
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut senders = self.senders.lock();
        let removed = senders.remove(&id).is_some();
        self.metrics.set_active(senders.len());
        removed
    }
}

/// Outcome of one `publish`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers that received every record of the batch
    pub delivered: usize,

    /// Subscribers removed during this publish
    pub dropped_subscribers: Vec<SubscriptionId>,
}

/// Fan-out broadcaster
///
/// Cheap to clone; clones share one registry. Each subscriber owns a bounded queue;
/// a subscriber whose queue is full is dropped instead of blocking the publisher.
#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Registry>,
}

impl Broadcaster {
    /// Create a broadcaster whose subscribers each queue up to `queue_capacity` records
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            inner: Arc::new(Registry {
                senders: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                queue_capacity: queue_capacity.max(1),
                metrics: BroadcastMetrics::new(),
            }),
        }
    }

    pub fn queue_capacity(&self) -> usize {
        self.inner.queue_capacity
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.inner.queue_capacity);

        let mut senders = self.inner.senders.lock();
        senders.insert(id, tx);
        self.inner.metrics.set_active(senders.len());
        drop(senders);

        info!(subscriber_id = id, "Subscriber connected");
        Subscription::new(id, rx, Arc::downgrade(&self.inner))
    }

    /// Explicitly unregister a subscriber
    pub fn unsubscribe(&self, subscription: Subscription) {
        let id = subscription.id();
        drop(subscription);
        debug!(subscriber_id = id, "Subscriber unsubscribed");
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.senders.lock().len()
    }

    pub fn metrics(&self) -> &BroadcastMetrics {
        &self.inner.metrics
    }

    /// Enqueue `records` on every live subscription
    ///
    /// Never waits for delivery. The registry lock is held for the enqueue pass only,
    /// so concurrent publishes reach every subscriber in the same order. A subscriber
    /// whose queue fills up mid-batch is removed; a subscriber that has gone away
    /// is removed silently.
    #[instrument(
        name = "broadcaster_publish",
        skip(self, records),
        fields(batch_size = records.len())
    )]
    pub fn publish(&self, records: &[PersistedRecord]) -> PublishReport {
        let mut report = PublishReport::default();
        if records.is_empty() {
            return report;
        }

        let metrics = &self.inner.metrics;
        metrics.add_published(records.len());

        let mut senders = self.inner.senders.lock();
        let mut dropped: Vec<(SubscriptionId, DropReason)> = Vec::new();

        for (&id, tx) in senders.iter() {
            match Self::enqueue(tx, records) {
                Ok(()) => {
                    report.delivered += 1;
                    metrics.add_enqueued(records.len() as u64);
                }
                Err((sent, reason)) => {
                    metrics.add_enqueued(sent);
                    dropped.push((id, reason));
                }
            }
        }

        for (id, reason) in dropped {
            senders.remove(&id);
            metrics.inc_dropped(reason);
            match reason {
                DropReason::Overflow => {
                    warn!(subscriber_id = id, "Subscriber queue full, dropping subscriber")
                }
                DropReason::Closed => debug!(subscriber_id = id, "Subscriber already closed"),
            }
            report.dropped_subscribers.push(id);
        }
        metrics.set_active(senders.len());

        report
    }

    /// Enqueue a whole batch on one queue; on failure returns how many made it
    fn enqueue(
        tx: &mpsc::Sender<PersistedRecord>,
        records: &[PersistedRecord],
    ) -> Result<(), (u64, DropReason)> {
        for (sent, record) in records.iter().enumerate() {
            match tx.try_send(*record) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => return Err((sent as u64, DropReason::Overflow)),
                Err(TrySendError::Closed(_)) => return Err((sent as u64, DropReason::Closed)),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("queue_capacity", &self.inner.queue_capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
