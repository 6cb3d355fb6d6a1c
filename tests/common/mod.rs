//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::{Arc, Barrier};
use std::thread;

pub use docmerge::{InMemoryStore, MemoryStoreConfig, Reconciler, Record, ReleasePolicy, Store};

// ============================================================================
// Fixtures
// ============================================================================

pub const URL: &str = "http://example.com/article";

/// Observation with `pub_date` derived from the fetch time
pub fn observation(fetch_time: u64, text: &str) -> Record {
    Record::new(URL, fetch_time / 10, fetch_time, text)
}

/// Reconciler over a fresh default in-process store
pub fn memory_reconciler() -> (Arc<InMemoryStore>, Reconciler<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let reconciler = Reconciler::new(Arc::clone(&store));
    (store, reconciler)
}

// ============================================================================
// Threads
// ============================================================================

/// Run `f(i)` on `threads` threads released together by a barrier
pub fn run_concurrently<F>(threads: usize, f: F)
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let f = Arc::clone(&f);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                f(i);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
