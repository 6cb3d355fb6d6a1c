//! Concurrency layer for docmerge
//!
//! This crate implements merge-on-write reconciliation:
//! - merge: pure temporal merge policy (newer content, earlier origin)
//! - Reconciler: acquire → get → merge → put → release per key
//! - KeyGuard: releases the key's exclusion section on every exit path
//! - ReconcileMetrics: outcome counters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod merge;
pub mod metrics;
pub mod reconciler;

pub use merge::{merge, MergeOutcome};
pub use metrics::{ReconcileMetrics, ReconcileStats};
pub use reconciler::{KeyGuard, Reconciler};
