//! Temporal merge policy
//!
//! Rules, applied to the stored record when one exists:
//! - Newer content: `incoming.observed_at > stored.observed_at` adopts the
//!   incoming payload and observation time
//! - Earlier origin: `incoming.observed_at < stored.first_observed_at`
//!   adopts the incoming publication time and lowers `first_observed_at`
//!
//! The rules are independent and may both fire. Both use strict
//! inequalities, so replaying an identical observation changes nothing.
//!
//! With no stored record the incoming record is taken as-is, except that
//! `first_observed_at` is set to its own `observed_at`.
//!
//! For observations with distinct `observed_at` values the final state does
//! not depend on arrival order: content and observation time come from the
//! latest observation, publication time and first observation time from the
//! earliest.

use docmerge_core::Record;

/// Result of merging one observation into the stored state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Record to persist
    pub record: Record,
    /// No record was stored for the key
    pub first_sight: bool,
    /// Payload and `observed_at` came from the incoming record
    pub content_adopted: bool,
    /// `published_at` and `first_observed_at` came from the incoming record
    pub origin_adopted: bool,
}

impl MergeOutcome {
    /// True if the stored record was kept exactly as it was
    pub fn is_unchanged(&self) -> bool {
        !self.first_sight && !self.content_adopted && !self.origin_adopted
    }
}

/// Merge `incoming` into `existing`
///
/// Pure and deterministic. Both records must share the same key.
pub fn merge(existing: Option<Record>, incoming: Record) -> MergeOutcome {
    let Some(mut merged) = existing else {
        let mut record = incoming;
        record.first_observed_at = record.observed_at;
        return MergeOutcome {
            record,
            first_sight: true,
            content_adopted: false,
            origin_adopted: false,
        };
    };
    debug_assert_eq!(merged.key, incoming.key, "merge across different keys");

    let content_adopted = incoming.observed_at > merged.observed_at;
    let origin_adopted = incoming.observed_at < merged.first_observed_at;

    if content_adopted {
        merged.payload = incoming.payload;
        merged.observed_at = incoming.observed_at;
    }
    if origin_adopted {
        merged.published_at = incoming.published_at;
        merged.first_observed_at = incoming.observed_at;
    }

    MergeOutcome {
        record: merged,
        first_sight: false,
        content_adopted,
        origin_adopted,
    }
}
