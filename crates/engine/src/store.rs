//! Backend selection

use std::sync::Arc;

use tracing::info;

use docmerge_core::{Result, Store};
use docmerge_durability::PostgresStore;
use docmerge_storage::InMemoryStore;

use crate::config::{BackendKind, DocmergeConfig};

/// Open the store named by `config.backend`
///
/// `init_schema` creates the `documents` table if it is missing; the
/// in-process backend ignores it.
///
/// # Errors
///
/// An invalid backend name, bad connection settings, or an unreachable
/// server.
pub fn open_store(config: &DocmergeConfig, init_schema: bool) -> Result<Arc<dyn Store>> {
    match config.backend_kind()? {
        BackendKind::Memory => {
            info!(
                evict_idle_locks = config.memory.evict_idle_locks,
                release_policy = ?config.memory.release_policy,
                "opening in-process store"
            );
            Ok(Arc::new(InMemoryStore::with_config(&config.memory)))
        }
        BackendKind::Postgres => {
            let store = PostgresStore::connect(&config.postgres)?;
            if init_schema {
                store.ensure_schema()?;
            }
            info!(host = %config.postgres.host, "opened postgres store");
            Ok(Arc::new(store))
        }
    }
}
