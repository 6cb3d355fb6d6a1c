//! Reconciler: serialized read-merge-write per key
//!
//! ## Protocol
//!
//! ```text
//! 1. acquire(key)         - failure aborts, nothing to release
//! 2. get(key)             - NotFound means first sighting; other errors abort
//! 3. merge(existing, in)  - pure, see `merge`
//! 4. put(merged)          - failure aborts, stored value stays pre-merge
//! 5. release(key)         - always, on every exit path after step 1
//! 6. return merged
//! ```
//!
//! Step 5 is tied to a [`KeyGuard`] that releases on drop, so it also runs
//! when steps 2-4 return early or unwind. A release failure is logged but
//! does not turn a completed merge into an error.
//!
//! Records cross the exclusion boundary by value: the incoming record is
//! moved in, and the caller gets an owned copy of what was stored.

use std::sync::Arc;

use tracing::{debug, warn};

use docmerge_core::{Record, Result, Store};

use crate::merge::{merge, MergeOutcome};
use crate::metrics::{ReconcileMetrics, ReconcileStats};

/// Holds the exclusion section for one key until dropped
pub struct KeyGuard<'a, S: Store + ?Sized> {
    store: &'a S,
    key: String,
}

impl<'a, S: Store + ?Sized> KeyGuard<'a, S> {
    /// Acquire `key` on `store`
    ///
    /// # Errors
    ///
    /// Whatever `Store::acquire` returns; no guard exists in that case.
    pub fn acquire(store: &'a S, key: &str) -> Result<Self> {
        store.acquire(key)?;
        Ok(Self {
            store,
            key: key.to_string(),
        })
    }

    /// Key this guard holds
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<S: Store + ?Sized> Drop for KeyGuard<'_, S> {
    fn drop(&mut self) {
        if let Err(e) = self.store.release(&self.key) {
            warn!(key = %self.key, error = %e, "release after reconcile failed");
        }
    }
}

/// Applies the merge policy to a store under per-key exclusion
pub struct Reconciler<S: Store + ?Sized> {
    store: Arc<S>,
    metrics: ReconcileMetrics,
}

impl<S: Store + ?Sized> Reconciler<S> {
    /// Create a reconciler over `store`
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            metrics: ReconcileMetrics::default(),
        }
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Counter snapshot
    pub fn stats(&self) -> ReconcileStats {
        self.metrics.snapshot()
    }

    /// Reconcile one observation and return the stored result
    ///
    /// # Errors
    ///
    /// - `Error::InvalidRecord` for an empty key (nothing is acquired)
    /// - the `acquire` error, before any read
    /// - a `get` error other than `NotFound`
    /// - the `put` error; the stored record is left unchanged
    pub fn process(&self, incoming: Record) -> Result<Record> {
        self.process_outcome(incoming).map(|outcome| outcome.record)
    }

    /// Like [`process`](Self::process) but reports which merge rules fired
    pub fn process_outcome(&self, incoming: Record) -> Result<MergeOutcome> {
        let result = self.reconcile(incoming);
        match &result {
            Ok(outcome) => self.metrics.record_outcome(outcome),
            Err(e) => {
                self.metrics.record_failure();
                debug!(error = %e, "reconcile failed");
            }
        }
        result
    }

    fn reconcile(&self, incoming: Record) -> Result<MergeOutcome> {
        incoming.validate()?;

        let guard = KeyGuard::acquire(&*self.store, &incoming.key)?;

        let existing = match self.store.get(guard.key()) {
            Ok(record) => Some(record),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let outcome = merge(existing, incoming);
        self.store.put(&outcome.record)?;

        debug!(
            key = %guard.key(),
            first_sight = outcome.first_sight,
            content_adopted = outcome.content_adopted,
            origin_adopted = outcome.origin_adopted,
            "reconciled"
        );

        drop(guard);
        Ok(outcome)
    }
}

impl<S: Store + ?Sized> std::fmt::Debug for Reconciler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
