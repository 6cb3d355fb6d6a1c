//! Durability layer for docmerge
//!
//! This crate implements the PostgreSQL `Store` backend:
//!
//! - PostgresStore: `documents` table upserts + session-level advisory locks
//! - PostgresConfig: `[postgres]` connection settings
//! - Schema bootstrap for the `documents` table

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod postgres_store;
pub mod schema;

pub use config::PostgresConfig;
pub use postgres_store::PostgresStore;
