//! Stress Tests
//!
//! Heavy-workload reconciliation runs. All marked #[ignore] for opt-in execution.
//! Run with: cargo test --test reconcile stress -- --ignored

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::common::*;

/// Hot keys shared by every thread, interleaved with cold per-thread keys
#[test]
#[ignore]
fn stress_hot_and_cold_keys() {
    let (store, reconciler) = memory_reconciler();
    let reconciler = Arc::new(reconciler);
    let threads = 16;
    let per_thread = 2_000u64;
    let hot_keys = 8u64;
    let clock = Arc::new(AtomicU64::new(1));

    let start = Instant::now();
    {
        let reconciler = Arc::clone(&reconciler);
        let clock = Arc::clone(&clock);
        run_concurrently(threads, move |t| {
            for i in 0..per_thread {
                let now = clock.fetch_add(1, Ordering::Relaxed);
                let url = if i % 2 == 0 {
                    format!("http://hot.example/{}", (i / 2) % hot_keys)
                } else {
                    format!("http://cold.example/{}/{}", t, i)
                };
                reconciler
                    .process(Record::new(url, now, now, format!("v{}", now)))
                    .unwrap();
            }
        });
    }
    let elapsed = start.elapsed();

    let stats = reconciler.stats();
    assert_eq!(stats.processed, threads as u64 * per_thread);
    assert_eq!(stats.failures, 0);
    assert_eq!(store.locks().tracked_keys(), 0);
    assert_eq!(
        store.len() as u64,
        hot_keys + threads as u64 * per_thread / 2
    );
    assert!(elapsed < Duration::from_secs(60));
    println!(
        "{} reconciles in {:?} ({:.0}/s)",
        stats.processed,
        elapsed,
        stats.processed as f64 / elapsed.as_secs_f64()
    );
}

/// Shuffled replay of one key's history converges to min/max bounds
#[test]
#[ignore]
fn stress_replayed_history_converges() {
    let (store, reconciler) = memory_reconciler();
    let reconciler = Arc::new(reconciler);
    let threads = 8;
    let history = 5_000u64;

    {
        let reconciler = Arc::clone(&reconciler);
        run_concurrently(threads, move |t| {
            // Every thread replays the whole history in its own order
            let offset = t as u64 * 617;
            for i in 0..history {
                let fetch_time = 1 + (i * 7_919 + offset) % history;
                reconciler
                    .process(observation(fetch_time, &format!("body-{}", fetch_time)))
                    .unwrap();
            }
        });
    }

    let stored = store.get(URL).unwrap();
    assert_eq!(stored.first_observed_at, 1);
    assert_eq!(stored.observed_at, history);
    assert_eq!(stored.payload, format!("body-{}", history));
    assert_eq!(stored.published_at, 0);
}
