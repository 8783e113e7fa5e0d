//! Subscription - one observer's bounded queue

use std::sync::Weak;

use contracts::PersistedRecord;
use tokio::sync::mpsc;
use tracing::debug;

use crate::broadcaster::Registry;

/// Subscription identifier (unique per broadcaster)
pub type SubscriptionId = u64;

pub use tokio::sync::mpsc::error::TryRecvError;

/// Handle bound to one observer's outbound queue
///
/// Dropping the handle unregisters it. Once the broadcaster drops the
/// subscription (queue overflow), `recv` yields what is still queued and then `None`.
pub struct Subscription {
    id: SubscriptionId,
    rx: mpsc::Receiver<PersistedRecord>,
    registry: Weak<Registry>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        rx: mpsc::Receiver<PersistedRecord>,
        registry: Weak<Registry>,
    ) -> Self {
        Self { id, rx, registry }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next record
    ///
    /// Returns `None` once the subscription has been dropped by the broadcaster
    /// and its queue is drained.
    pub async fn recv(&mut self) -> Option<PersistedRecord> {
        self.rx.recv().await
    }

    /// Take the next queued record without waiting
    pub fn try_recv(&mut self) -> Result<PersistedRecord, TryRecvError> {
        self.rx.try_recv()
    }

    /// Records currently queued
    pub fn queued(&self) -> usize {
        self.rx.len()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if registry.remove(self.id) {
            debug!(subscriber_id = self.id, "Subscription closed");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("queued", &self.rx.len())
            .finish()
    }
}
