//! PostgresStore: durable `Store` backend
//!
//! Records live in the `documents` table; exclusion is delegated to
//! PostgreSQL session-level advisory locks keyed by `hashtext(url)`.
//!
//! # Sessions
//!
//! Advisory locks belong to the session that took them, so the session that
//! ran `pg_advisory_lock` must also run `pg_advisory_unlock`. Each
//! `acquire` checks a session out of a small idle pool (or opens one), takes
//! the lock on it, and parks it in `held` under the key. `release` takes the
//! parked session back out, unlocks, and returns it to the pool.
//!
//! A second in-process `acquire` of the same key runs on a different
//! session and blocks inside the server, not in this process.
//!
//! `get`/`put` check a data session out of a separate idle pool for the
//! length of one statement, so reconciles of distinct keys do not queue
//! behind each other. Data sessions never wait on advisory locks and carry
//! no `lock_timeout`.
//!
//! # Unheld release
//!
//! Releasing a key with no parked session is a successful no-op
//! (`ReleasePolicy::Lenient`), matching `pg_advisory_unlock` semantics.
//!
//! # Failure
//!
//! A session that errors is dropped instead of pooled. Closing a session
//! makes the server drop every advisory lock it held, so a failed release
//! never leaves the key locked.

use std::collections::HashMap;

use parking_lot::Mutex;
use postgres::{Client, NoTls, Row};
use tracing::{debug, warn};

use docmerge_core::{Error, Record, ReleasePolicy, Result, Store};

use crate::config::PostgresConfig;
use crate::schema;

const SELECT_DOCUMENT: &str =
    "SELECT url, pub_date, fetch_time, text, first_fetch_time FROM documents WHERE url = $1";

const UPSERT_DOCUMENT: &str = "INSERT INTO documents (url, pub_date, fetch_time, text, first_fetch_time) \
     VALUES ($1, $2, $3, $4, $5) \
     ON CONFLICT (url) DO UPDATE SET pub_date = EXCLUDED.pub_date, \
     fetch_time = EXCLUDED.fetch_time, \
     text = EXCLUDED.text, \
     first_fetch_time = EXCLUDED.first_fetch_time";

const ADVISORY_LOCK: &str = "SELECT pg_advisory_lock(hashtext($1))";
const ADVISORY_UNLOCK: &str = "SELECT pg_advisory_unlock(hashtext($1))";

/// Bounded stack of open sessions waiting for reuse
struct SessionPool {
    idle: Mutex<Vec<Client>>,
    max_idle: usize,
}

impl SessionPool {
    fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
        }
    }

    /// Pop a live idle session, or open a new one with `open`
    fn checkout<F>(&self, open: F) -> std::result::Result<Client, postgres::Error>
    where
        F: FnOnce() -> std::result::Result<Client, postgres::Error>,
    {
        let mut idle = self.idle.lock();
        while let Some(session) = idle.pop() {
            if !session.is_closed() {
                return Ok(session);
            }
        }
        drop(idle);
        open()
    }

    /// Keep `session` for reuse unless it is closed or the pool is full
    fn checkin(&self, session: Client) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle && !session.is_closed() {
            idle.push(session);
        }
    }

    fn len(&self) -> usize {
        self.idle.lock().len()
    }
}

/// PostgreSQL-backed store with advisory-lock exclusion
pub struct PostgresStore {
    connection: postgres::Config,
    lock_timeout_ms: Option<u64>,
    max_idle_sessions: usize,
    data_sessions: SessionPool,
    lock_sessions: SessionPool,
    held: Mutex<HashMap<String, Client>>,
}

impl PostgresStore {
    /// Connect a first data session to check the server is reachable
    ///
    /// Further data sessions open on demand; lock sessions are opened
    /// lazily on first `acquire`.
    ///
    /// # Errors
    ///
    /// `Error::Config` for unusable settings, `Error::Backend` if the
    /// server cannot be reached.
    pub fn connect(config: &PostgresConfig) -> Result<Self> {
        let connection = config.connection_config()?;
        let data = connection
            .connect(NoTls)
            .map_err(|e| Error::Backend(format!("connect failed: {}", e)))?;

        debug!(
            dbname = connection.get_dbname().unwrap_or_default(),
            "connected to postgres"
        );

        let data_sessions = SessionPool::new(config.max_idle_sessions.max(1));
        data_sessions.checkin(data);

        Ok(Self {
            connection,
            lock_timeout_ms: config.lock_timeout_ms,
            max_idle_sessions: config.max_idle_sessions,
            data_sessions,
            lock_sessions: SessionPool::new(config.max_idle_sessions),
            held: Mutex::new(HashMap::new()),
        })
    }

    /// Create the `documents` table if it does not exist
    pub fn ensure_schema(&self) -> Result<()> {
        self.with_data_session(|session| session.batch_execute(schema::CREATE_DOCUMENTS))
            .map_err(|e| Error::Backend(format!("schema setup failed: {}", e)))
    }

    /// Remove every stored document
    pub fn truncate(&self) -> Result<()> {
        self.with_data_session(|session| session.batch_execute(schema::TRUNCATE_DOCUMENTS))
            .map_err(|e| Error::Backend(format!("truncate failed: {}", e)))
    }

    /// Number of keys whose advisory lock this process currently holds
    pub fn held_keys(&self) -> usize {
        self.held.lock().len()
    }

    /// Data sessions currently idle in the pool
    pub fn idle_data_sessions(&self) -> usize {
        self.data_sessions.len()
    }

    /// Lock sessions currently idle in the pool
    pub fn idle_lock_sessions(&self) -> usize {
        self.lock_sessions.len()
    }

    fn open_lock_session(&self) -> std::result::Result<Client, postgres::Error> {
        let mut session = self.connection.connect(NoTls)?;
        if let Some(ms) = self.lock_timeout_ms {
            session.batch_execute(&format!("SET lock_timeout = {}", ms))?;
        }
        Ok(session)
    }

    /// Run `f` on a pooled data session, returning the session afterwards
    fn with_data_session<T, F>(&self, f: F) -> std::result::Result<T, postgres::Error>
    where
        F: FnOnce(&mut Client) -> std::result::Result<T, postgres::Error>,
    {
        let mut session = self
            .data_sessions
            .checkout(|| self.connection.connect(NoTls))?;
        let result = f(&mut session);
        self.data_sessions.checkin(session);
        result
    }
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("dbname", &self.connection.get_dbname())
            .field("lock_timeout_ms", &self.lock_timeout_ms)
            .field("max_idle_sessions", &self.max_idle_sessions)
            .finish_non_exhaustive()
    }
}

impl Store for PostgresStore {
    fn get(&self, key: &str) -> Result<Record> {
        let row = self
            .with_data_session(|session| session.query_opt(SELECT_DOCUMENT, &[&key]))
            .map_err(|e| Error::read_failure(key, e))?;
        match row {
            Some(row) => record_from_row(key, &row),
            None => Err(Error::not_found(key)),
        }
    }

    fn put(&self, record: &Record) -> Result<()> {
        record.validate()?;
        let key = record.key.as_str();
        let published_at = to_column(key, "pub_date", record.published_at)?;
        let observed_at = to_column(key, "fetch_time", record.observed_at)?;
        let first_observed_at = to_column(key, "first_fetch_time", record.first_observed_at)?;

        self.with_data_session(|session| {
            session.execute(
                UPSERT_DOCUMENT,
                &[
                    &record.key,
                    &published_at,
                    &observed_at,
                    &record.payload,
                    &first_observed_at,
                ],
            )
        })
        .map_err(|e| Error::persist_failure(key, e))?;
        Ok(())
    }

    fn acquire(&self, key: &str) -> Result<()> {
        let mut session = self
            .lock_sessions
            .checkout(|| self.open_lock_session())
            .map_err(|e| Error::lock_failure(key, e))?;

        session
            .execute(ADVISORY_LOCK, &[&key])
            .map_err(|e| Error::lock_failure(key, e))?;

        if self.held.lock().insert(key.to_string(), session).is_some() {
            // The displaced session is dropped, which closes it and frees its locks
            warn!(key = %key, "replaced a parked advisory-lock session");
        }
        debug!(key = %key, "advisory lock acquired");
        Ok(())
    }

    fn release(&self, key: &str) -> Result<()> {
        let Some(mut session) = self.held.lock().remove(key) else {
            debug!(key = %key, "advisory unlock of unheld key ignored");
            return Ok(());
        };

        let row = session
            .query_one(ADVISORY_UNLOCK, &[&key])
            .map_err(|e| Error::lock_failure(key, e))?;
        if !row.get::<_, bool>(0) {
            warn!(key = %key, "advisory lock was not held by its session");
        }

        self.lock_sessions.checkin(session);
        debug!(key = %key, "advisory lock released");
        Ok(())
    }

    fn release_policy(&self) -> ReleasePolicy {
        ReleasePolicy::Lenient
    }
}

fn record_from_row(key: &str, row: &Row) -> Result<Record> {
    let column = |name: &str| -> Result<u64> {
        let value: i64 = row
            .try_get(name)
            .map_err(|e| Error::read_failure(key, e))?;
        from_column(key, name, value)
    };
    let url: String = row.try_get("url").map_err(|e| Error::read_failure(key, e))?;
    let payload: String = row
        .try_get("text")
        .map_err(|e| Error::read_failure(key, e))?;

    Ok(Record {
        key: url,
        published_at: column("pub_date")?,
        observed_at: column("fetch_time")?,
        first_observed_at: column("first_fetch_time")?,
        payload,
    })
}

/// `u64` timestamp to a `BIGINT` column value
pub(crate) fn to_column(key: &str, column: &str, value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| {
        Error::persist_failure(key, format!("{} = {} exceeds BIGINT range", column, value))
    })
}

/// `BIGINT` column value back to a `u64` timestamp
pub(crate) fn from_column(key: &str, column: &str, value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| Error::read_failure(key, format!("{} = {} is negative", column, value)))
}
