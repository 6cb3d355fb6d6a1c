//! Per-key exclusion table
//!
//! Maps each key to a dedicated gate. The table itself is guarded by a
//! single coarse `parking_lot::Mutex` that only protects lookup, insert and
//! the user count; it is never held across the blocking wait on a gate, so
//! a contended key never stalls acquisitions of unrelated keys.
//!
//! # Gate vs mutex guard
//!
//! A gate is a `held` flag plus a `Condvar` rather than a mutex guard,
//! because the exclusion section is opened by `acquire` and closed by a
//! separate `release` call, possibly on another thread.
//!
//! # Eviction
//!
//! Every slot counts its users (the holder plus parked waiters). The count
//! is changed under the coarse lock, so a slot whose count reaches zero has
//! nobody referencing its gate and can be dropped. With eviction disabled
//! slots accumulate for every key ever seen.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use docmerge_core::{Error, Result};

/// Blocking gate for a single key
#[derive(Debug, Default)]
struct KeyGate {
    held: Mutex<bool>,
    released: Condvar,
}

impl KeyGate {
    /// Wait until the gate is free and take it
    ///
    /// Returns false if `deadline` passed while the gate was still held.
    fn lock(&self, deadline: Option<Instant>) -> bool {
        let mut held = self.held.lock();
        while *held {
            match deadline {
                Some(deadline) => {
                    if self.released.wait_until(&mut held, deadline).timed_out() && *held {
                        return false;
                    }
                }
                None => self.released.wait(&mut held),
            }
        }
        *held = true;
        true
    }

    /// Free the gate, waking one waiter. Returns false if it was not held.
    fn unlock(&self) -> bool {
        let mut held = self.held.lock();
        if !*held {
            return false;
        }
        *held = false;
        drop(held);
        self.released.notify_one();
        true
    }

    fn is_held(&self) -> bool {
        *self.held.lock()
    }
}

#[derive(Debug, Default)]
struct Slot {
    gate: Arc<KeyGate>,
    /// Holder plus waiters
    users: usize,
}

/// Table of per-key exclusion gates
#[derive(Debug)]
pub struct KeyLockTable {
    slots: Mutex<HashMap<String, Slot>>,
    evict_idle: bool,
    timeout: Option<Duration>,
}

impl KeyLockTable {
    /// Create a table
    ///
    /// # Arguments
    /// * `evict_idle` - drop a key's gate once nobody holds or waits on it
    /// * `timeout` - give up waiting after this long (`None` waits forever)
    pub fn new(evict_idle: bool, timeout: Option<Duration>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            evict_idle,
            timeout,
        }
    }

    /// Block until `key` is held by the caller
    ///
    /// # Errors
    ///
    /// `Error::LockFailure` if the configured timeout elapses first.
    pub fn acquire(&self, key: &str) -> Result<()> {
        let gate = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(key.to_string()).or_default();
            slot.users += 1;
            Arc::clone(&slot.gate)
        };

        let deadline = self.timeout.map(|t| Instant::now() + t);
        if gate.lock(deadline) {
            debug!(key = %key, "key lock acquired");
            return Ok(());
        }

        self.withdraw(key);
        Err(Error::lock_failure(
            key,
            format!(
                "timed out after {}ms waiting for holder",
                self.timeout.unwrap_or_default().as_millis()
            ),
        ))
    }

    /// Release `key`
    ///
    /// # Errors
    ///
    /// `Error::NotHeld` if the key is unknown or currently free.
    pub fn release(&self, key: &str) -> Result<()> {
        let mut slots = self.slots.lock();
        let Some(slot) = slots.get_mut(key) else {
            return Err(Error::not_held(key));
        };
        if !slot.gate.unlock() {
            return Err(Error::not_held(key));
        }
        slot.users = slot.users.saturating_sub(1);
        if self.evict_idle && slot.users == 0 {
            slots.remove(key);
        }
        debug!(key = %key, "key lock released");
        Ok(())
    }

    /// Whether some caller currently holds `key`
    pub fn is_held(&self, key: &str) -> bool {
        self.slots
            .lock()
            .get(key)
            .map(|slot| slot.gate.is_held())
            .unwrap_or(false)
    }

    /// Number of keys with a gate in the table
    pub fn tracked_keys(&self) -> usize {
        self.slots.lock().len()
    }

    /// Holder plus waiters for `key`
    pub fn users(&self, key: &str) -> usize {
        self.slots.lock().get(key).map(|slot| slot.users).unwrap_or(0)
    }

    // A timed-out waiter gives up its place without touching the gate
    fn withdraw(&self, key: &str) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(key) {
            slot.users = slot.users.saturating_sub(1);
            if self.evict_idle && slot.users == 0 {
                slots.remove(key);
            }
        }
    }
}

impl Default for KeyLockTable {
    fn default() -> Self {
        Self::new(true, None)
    }
}
