//! Reconciliation counters
//!
//! The counters use Relaxed ordering: they are purely observational and do
//! not synchronize any other memory operations.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::merge::MergeOutcome;

/// Live counters owned by a reconciler
#[derive(Debug, Default)]
pub struct ReconcileMetrics {
    processed: AtomicU64,
    first_sightings: AtomicU64,
    content_updates: AtomicU64,
    origin_updates: AtomicU64,
    unchanged: AtomicU64,
    failures: AtomicU64,
}

/// Point-in-time copy of [`ReconcileMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileStats {
    /// Successful `process` calls
    pub processed: u64,
    /// Keys seen for the first time
    pub first_sightings: u64,
    /// Merges that adopted newer content
    pub content_updates: u64,
    /// Merges that adopted an earlier origin
    pub origin_updates: u64,
    /// Merges that kept the stored record as is
    pub unchanged: u64,
    /// Failed `process` calls
    pub failures: u64,
}

impl ReconcileMetrics {
    pub(crate) fn record_outcome(&self, outcome: &MergeOutcome) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if outcome.first_sight {
            self.first_sightings.fetch_add(1, Ordering::Relaxed);
        }
        if outcome.content_adopted {
            self.content_updates.fetch_add(1, Ordering::Relaxed);
        }
        if outcome.origin_adopted {
            self.origin_updates.fetch_add(1, Ordering::Relaxed);
        }
        if outcome.is_unchanged() {
            self.unchanged.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    pub fn snapshot(&self) -> ReconcileStats {
        ReconcileStats {
            processed: self.processed.load(Ordering::Relaxed),
            first_sightings: self.first_sightings.load(Ordering::Relaxed),
            content_updates: self.content_updates.load(Ordering::Relaxed),
            origin_updates: self.origin_updates.load(Ordering::Relaxed),
            unchanged: self.unchanged.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}
