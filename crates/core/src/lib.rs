//! Core types and traits for docmerge
//!
//! This crate defines the foundational types used throughout the system:
//! - Record: the document value being reconciled, keyed by URL
//! - Error: Error type hierarchy
//! - Traits: Store (keyed storage + per-key exclusion), Decoder, Encoder

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod traits;

pub use error::{Error, Result};
pub use record::Record;
pub use traits::{Decoder, Encoder, ReleasePolicy, Store};
