//! Broadcaster metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Why a subscriber was removed by `publish`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Queue full: the consumer fell behind
    Overflow,
    /// Receiver already gone
    Closed,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overflow => "overflow",
            Self::Closed => "closed",
        }
    }
}

/// Metrics for the fan-out registry
#[derive(Debug, Default)]
pub struct BroadcastMetrics {
    /// Live subscriptions
    active: AtomicUsize,
    /// Records handed to `publish`
    published: AtomicU64,
    /// Record enqueues across all subscribers
    enqueued: AtomicU64,
    /// Subscribers dropped because their queue filled
    dropped_overflow: AtomicU64,
    /// Subscribers found closed during publish
    dropped_closed: AtomicU64,
}

impl BroadcastMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, count: usize) {
        self.active.store(count, Ordering::Relaxed);
        metrics::gauge!("roadwatch_subscribers_active").set(count as f64);
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn add_published(&self, count: usize) {
        self.published.fetch_add(count as u64, Ordering::Relaxed);
        metrics::counter!("roadwatch_records_published_total").increment(count as u64);
    }

    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    pub fn add_enqueued(&self, count: u64) {
        self.enqueued.fetch_add(count, Ordering::Relaxed);
    }

    pub fn dropped(&self, reason: DropReason) -> u64 {
        match reason {
            DropReason::Overflow => self.dropped_overflow.load(Ordering::Relaxed),
            DropReason::Closed => self.dropped_closed.load(Ordering::Relaxed),
        }
    }

    pub fn inc_dropped(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::Overflow => &self.dropped_overflow,
            DropReason::Closed => &self.dropped_closed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("roadwatch_subscribers_dropped_total", "reason" => reason.as_str())
            .increment(1);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active: self.active(),
            published: self.published(),
            enqueued: self.enqueued(),
            dropped_overflow: self.dropped(DropReason::Overflow),
            dropped_closed: self.dropped(DropReason::Closed),
        }
    }
}

/// Snapshot of broadcaster metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub active: usize,
    pub published: u64,
    pub enqueued: u64,
    pub dropped_overflow: u64,
    pub dropped_closed: u64,
}
