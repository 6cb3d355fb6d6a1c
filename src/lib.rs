//! docmerge - merge-on-write reconciliation of URL-keyed documents
//!
//! Observations of the same document arrive out of order and concurrently.
//! For each key, docmerge serializes a read-merge-write cycle so the stored
//! record always carries the newest content and the earliest origin.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use docmerge::{InMemoryStore, Reconciler, Record};
//!
//! let reconciler = Reconciler::new(Arc::new(InMemoryStore::new()));
//! reconciler.process(Record::new("http://example.com", 10, 200, "new"))?;
//! let merged = reconciler.process(Record::new("http://example.com", 5, 100, "old"))?;
//!
//! assert_eq!(merged.payload, "new");
//! assert_eq!(merged.first_observed_at, 100);
//! # Ok::<(), docmerge::Error>(())
//! ```
//!
//! # Architecture
//!
//! - core: `Record`, `Error`, and the `Store`/`Decoder`/`Encoder` seams
//! - storage: in-process store with a per-key lock table
//! - durability: PostgreSQL store with advisory locks
//! - concurrency: merge policy and the `Reconciler`
//! - engine: config, codecs, framing, and the message `Pipeline`

pub use docmerge_concurrency::{merge, KeyGuard, MergeOutcome, ReconcileStats, Reconciler};
pub use docmerge_core::{Decoder, Encoder, Error, Record, ReleasePolicy, Result, Store};
pub use docmerge_durability::{PostgresConfig, PostgresStore};
pub use docmerge_engine::{
    open_store, CodecKind, DocmergeConfig, ErrorPolicy, JsonCodec, MsgpackCodec, Pipeline,
    PipelineStats,
};
pub use docmerge_storage::{InMemoryStore, KeyLockTable, MemoryStoreConfig};
