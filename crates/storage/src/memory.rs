//! InMemoryStore: in-process `Store` backend
//!
//! Records live in a `DashMap` keyed by URL; exclusion comes from a
//! [`KeyLockTable`]. `get` hands out an owned clone, so nothing the caller
//! keeps after `release` aliases the stored value.

use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docmerge_core::{Error, Record, ReleasePolicy, Result, Store};

use crate::lock_table::KeyLockTable;

/// Settings for [`InMemoryStore`], the `[memory]` section of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStoreConfig {
    /// Drop a key's gate once nobody holds or waits on it
    #[serde(default = "default_evict_idle_locks")]
    pub evict_idle_locks: bool,
    /// Outcome of releasing an unheld key
    #[serde(default)]
    pub release_policy: ReleasePolicy,
    /// Give up acquiring after this many milliseconds (unset waits forever)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_timeout_ms: Option<u64>,
}

fn default_evict_idle_locks() -> bool {
    true
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            evict_idle_locks: default_evict_idle_locks(),
            release_policy: ReleasePolicy::Strict,
            lock_timeout_ms: None,
        }
    }
}

/// In-process keyed store with per-key mutual exclusion
#[derive(Debug)]
pub struct InMemoryStore {
    records: DashMap<String, Record>,
    locks: KeyLockTable,
    release_policy: ReleasePolicy,
}

impl InMemoryStore {
    /// Create a store with default settings (strict release, idle eviction)
    pub fn new() -> Self {
        Self::with_config(&MemoryStoreConfig::default())
    }

    /// Create a store from its config section
    pub fn with_config(config: &MemoryStoreConfig) -> Self {
        Self {
            records: DashMap::new(),
            locks: KeyLockTable::new(
                config.evict_idle_locks,
                config.lock_timeout_ms.map(Duration::from_millis),
            ),
            release_policy: config.release_policy,
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no records are stored
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Per-key lock table, for inspection
    pub fn locks(&self) -> &KeyLockTable {
        &self.locks
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for InMemoryStore {
    fn get(&self, key: &str) -> Result<Record> {
        self.records
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::not_found(key))
    }

    fn put(&self, record: &Record) -> Result<()> {
        record.validate()?;
        self.records.insert(record.key.clone(), record.clone());
        Ok(())
    }

    fn acquire(&self, key: &str) -> Result<()> {
        self.locks.acquire(key)
    }

    fn release(&self, key: &str) -> Result<()> {
        match self.locks.release(key) {
            Err(e) if e.is_not_held() && self.release_policy == ReleasePolicy::Lenient => {
                debug!(key = %key, "release of unheld key ignored");
                Ok(())
            }
            other => other,
        }
    }

    fn release_policy(&self) -> ReleasePolicy {
        self.release_policy
    }
}
