//! Reconciliation Integration Tests
//!
//! End-to-end behavior of the public facade: merge scenarios, lock
//! lifecycle through the reconciler, config-driven pipelines, and opt-in
//! stress runs.

#[path = "../common/mod.rs"]
mod common;

mod lock_lifecycle;
mod pipeline_config;
mod scenarios;
mod stress;
