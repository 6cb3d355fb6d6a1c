//! Storage layer for docmerge
//!
//! This crate implements the in-process `Store` backend:
//! - KeyLockTable: per-key exclusion gates behind a coarse table lock,
//!   with optional eviction of idle gates and optional acquire timeout
//! - InMemoryStore: DashMap-backed records + KeyLockTable
//!
//! The durable PostgreSQL backend lives in `docmerge-durability`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock_table;
pub mod memory;

pub use lock_table::KeyLockTable;
pub use memory::{InMemoryStore, MemoryStoreConfig};
