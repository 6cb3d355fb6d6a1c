//! Document record being reconciled
//!
//! A `Record` is keyed by its source URL. Timestamps are opaque `u64`
//! values that only need to be totally ordered.
//!
//! Serialized field names (`url`, `pub_date`, `fetch_time`, `text`,
//! `first_fetch_time`) are shared by every codec and by the SQL columns of
//! the durable backend.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A document observation, or the reconciled state stored for a key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    /// Identity of the document (its URL)
    #[serde(rename = "url")]
    pub key: String,
    /// Nominal publication time
    #[serde(rename = "pub_date")]
    pub published_at: u64,
    /// When this observation was produced
    #[serde(rename = "fetch_time")]
    pub observed_at: u64,
    /// Earliest observation ever recorded for the key
    #[serde(rename = "first_fetch_time", default)]
    pub first_observed_at: u64,
    /// Document body, replaced wholesale by newer observations
    #[serde(rename = "text", default)]
    pub payload: String,
}

impl Record {
    /// Create an observation with `first_observed_at` left at zero
    ///
    /// Inbound records normally do not know the first observation time;
    /// the reconciler fills it in.
    pub fn new(
        key: impl Into<String>,
        published_at: u64,
        observed_at: u64,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            published_at,
            observed_at,
            first_observed_at: 0,
            payload: payload.into(),
        }
    }

    /// Builder-style setter for `first_observed_at`
    pub fn with_first_observed_at(mut self, first_observed_at: u64) -> Self {
        self.first_observed_at = first_observed_at;
        self
    }

    /// Reject records that may not be stored
    pub fn validate(&self) -> Result<()> {
        if self.key.is_empty() {
            return Err(Error::InvalidRecord("record key must be non-empty".into()));
        }
        Ok(())
    }

    /// Steady-state ordering of the two observation timestamps
    pub fn is_ordered(&self) -> bool {
        self.first_observed_at <= self.observed_at
    }
}
