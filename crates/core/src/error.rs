//! Error types for docmerge
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! `NotFound` is the only variant the reconciler expects during normal
//! operation: it means "first sighting of this key". Every other variant is
//! surfaced to the caller.

use std::io;
use thiserror::Error;

/// Result type alias for docmerge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for docmerge
#[derive(Debug, Error)]
pub enum Error {
    /// No record is stored for the key
    #[error("document not found: {key}")]
    NotFound {
        /// Key that was looked up
        key: String,
    },

    /// Release was called for a key that has no current holder
    #[error("lock not held for key: {key}")]
    NotHeld {
        /// Key that was released
        key: String,
    },

    /// Per-key exclusion could not be obtained (or given back)
    #[error("lock failure for key {key}: {reason}")]
    LockFailure {
        /// Key being locked
        key: String,
        /// Backend-provided reason
        reason: String,
    },

    /// Reading the stored record failed for a reason other than absence
    #[error("read failure for key {key}: {reason}")]
    ReadFailure {
        /// Key being read
        key: String,
        /// Backend-provided reason
        reason: String,
    },

    /// Write did not take effect; the stored record is unchanged
    #[error("persist failure for key {key}: {reason}")]
    PersistFailure {
        /// Key being written
        key: String,
        /// Backend-provided reason
        reason: String,
    },

    /// Backend could not be reached or set up
    #[error("backend error: {0}")]
    Backend(String),

    /// Record violates a data-model invariant (e.g. empty key)
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Inbound bytes could not be decoded into a record
    #[error("decode error: {0}")]
    Decode(String),

    /// Record could not be encoded for forwarding
    #[error("encode error: {0}")]
    Encode(String),

    /// Configuration is missing or malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (stdin/stdout framing, config files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Build a `NotFound` error
    pub fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound { key: key.into() }
    }

    /// Build a `NotHeld` error
    pub fn not_held(key: impl Into<String>) -> Self {
        Error::NotHeld { key: key.into() }
    }

    /// Build a `LockFailure` error
    pub fn lock_failure(key: impl Into<String>, reason: impl ToString) -> Self {
        Error::LockFailure {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a `ReadFailure` error
    pub fn read_failure(key: impl Into<String>, reason: impl ToString) -> Self {
        Error::ReadFailure {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a `PersistFailure` error
    pub fn persist_failure(key: impl Into<String>, reason: impl ToString) -> Self {
        Error::PersistFailure {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// True for the expected "no stored record" outcome of `get`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True when a release had no matching acquire
    pub fn is_not_held(&self) -> bool {
        matches!(self, Error::NotHeld { .. })
    }
}
