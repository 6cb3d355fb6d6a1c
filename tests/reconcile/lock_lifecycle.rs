//! Lock lifecycle through the reconciler
//!
//! Covers the unheld-release contract per backend mode, idle eviction,
//! and acquire timeouts on the in-process store.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::common::*;
use docmerge::{Error, KeyGuard};

fn store_with(config: MemoryStoreConfig) -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_config(&config))
}

#[test]
fn strict_release_of_unknown_key_is_not_held() {
    let store = InMemoryStore::new();
    assert_eq!(store.release_policy(), ReleasePolicy::Strict);
    let err = store.release("http://never-locked").unwrap_err();
    assert!(err.is_not_held());
}

#[test]
fn lenient_release_of_unknown_key_succeeds() {
    let store = store_with(MemoryStoreConfig {
        release_policy: ReleasePolicy::Lenient,
        ..MemoryStoreConfig::default()
    });
    store.release("http://never-locked").unwrap();
}

#[test]
fn double_release_is_not_held() {
    let store = InMemoryStore::new();
    store.acquire(URL).unwrap();
    store.release(URL).unwrap();
    assert!(store.release(URL).unwrap_err().is_not_held());
}

#[test]
fn eviction_drains_the_lock_table() {
    let (store, reconciler) = memory_reconciler();
    for i in 0..100u64 {
        reconciler
            .process(Record::new(format!("http://example.com/{}", i), 1, i, "x"))
            .unwrap();
    }
    assert_eq!(store.len(), 100);
    assert_eq!(store.locks().tracked_keys(), 0);
}

#[test]
fn retention_keeps_one_gate_per_key() {
    let store = store_with(MemoryStoreConfig {
        evict_idle_locks: false,
        ..MemoryStoreConfig::default()
    });
    let reconciler = Reconciler::new(Arc::clone(&store));
    for i in 0..10u64 {
        reconciler
            .process(Record::new(format!("http://example.com/{}", i), 1, i, "x"))
            .unwrap();
        // Second observation of the same key reuses its gate
        reconciler
            .process(Record::new(format!("http://example.com/{}", i), 1, i + 1, "y"))
            .unwrap();
    }
    assert_eq!(store.locks().tracked_keys(), 10);
    assert!(!store.locks().is_held("http://example.com/0"));
}

#[test]
fn acquire_timeout_surfaces_lock_failure_and_leaves_record() {
    let store = store_with(MemoryStoreConfig {
        lock_timeout_ms: Some(50),
        ..MemoryStoreConfig::default()
    });
    let reconciler = Reconciler::new(Arc::clone(&store));
    reconciler.process(observation(100, "kept")).unwrap();

    let guard = KeyGuard::acquire(&*store, URL).unwrap();
    let err = reconciler.process(observation(200, "lost")).unwrap_err();
    assert!(matches!(err, Error::LockFailure { .. }));
    drop(guard);

    assert_eq!(store.get(URL).unwrap().payload, "kept");
    assert_eq!(reconciler.stats().failures, 1);
    assert_eq!(store.locks().tracked_keys(), 0);
}

#[test]
fn waiter_proceeds_once_guard_drops() {
    let (store, reconciler) = memory_reconciler();
    let reconciler = Arc::new(reconciler);

    let guard = KeyGuard::acquire(&*store, URL).unwrap();
    let handle = {
        let reconciler = Arc::clone(&reconciler);
        thread::spawn(move || reconciler.process(observation(100, "after")).unwrap())
    };

    thread::sleep(Duration::from_millis(50));
    assert!(store.get(URL).unwrap_err().is_not_found());
    assert_eq!(store.locks().users(URL), 2);
    drop(guard);

    let merged = handle.join().unwrap();
    assert_eq!(merged.payload, "after");
    assert_eq!(store.locks().tracked_keys(), 0);
}
