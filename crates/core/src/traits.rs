//! Core traits for storage and codec abstraction
//!
//! These traits are the seams between the reconciler and its collaborators:
//! - `Store`: keyed record storage plus per-key mutual exclusion
//! - `Decoder` / `Encoder`: opaque byte formats at the pipeline boundary
//!
//! Swapping the in-process store for the durable one (or one codec for
//! another) does not touch the reconciler.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::Record;

/// Behaviour of `Store::release` for a key with no current holder
///
/// Backends disagree here: the in-process store reports the contract
/// violation, while PostgreSQL advisory unlocks of an unheld key are a
/// silent no-op. Each backend reports which contract it honours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleasePolicy {
    /// Releasing an unheld key fails with `Error::NotHeld`
    #[default]
    Strict,
    /// Releasing an unheld key succeeds and does nothing
    Lenient,
}

/// Storage abstraction for reconciled records
///
/// `acquire`/`release` form a per-key exclusion section, not a data lock:
/// `get`/`put` never block on it. Different keys never block each other;
/// the same key serializes until the holder releases.
///
/// Thread safety: all methods must be safe to call concurrently from
/// multiple threads (requires Send + Sync). A key acquired on one thread
/// may be released on another.
pub trait Store: Send + Sync {
    /// Current stored record for `key`
    ///
    /// # Errors
    ///
    /// `Error::NotFound` if nothing is stored; `Error::ReadFailure` if the
    /// backend could not answer.
    fn get(&self, key: &str) -> Result<Record>;

    /// Upsert: insert if absent, otherwise overwrite entirely
    ///
    /// Atomic from the caller's point of view: on error the previous value
    /// is still in place.
    ///
    /// # Errors
    ///
    /// `Error::PersistFailure` if the write did not take effect.
    fn put(&self, record: &Record) -> Result<()>;

    /// Block until the exclusion section for `key` is held by the caller
    ///
    /// # Errors
    ///
    /// `Error::LockFailure` if exclusion could not be obtained.
    fn acquire(&self, key: &str) -> Result<()>;

    /// Give back the exclusion section for `key`
    ///
    /// # Errors
    ///
    /// Under `ReleasePolicy::Strict`, `Error::NotHeld` when there is no
    /// holder. `Error::LockFailure` if the backend could not release.
    fn release(&self, key: &str) -> Result<()>;

    /// How `release` treats a key with no holder
    fn release_policy(&self) -> ReleasePolicy;
}

/// Turns inbound bytes into a record
pub trait Decoder: Send + Sync {
    /// Decode one message
    ///
    /// # Errors
    ///
    /// `Error::Decode` if the bytes are not a valid record.
    fn decode(&self, bytes: &[u8]) -> Result<Record>;
}

/// Turns a record into outbound bytes
pub trait Encoder: Send + Sync {
    /// Encode one record
    ///
    /// # Errors
    ///
    /// `Error::Encode` if the record cannot be represented.
    fn encode(&self, record: &Record) -> Result<Vec<u8>>;
}
