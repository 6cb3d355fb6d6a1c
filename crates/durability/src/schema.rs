//! SQL for the `documents` table

/// Create the table if it is missing
pub const CREATE_DOCUMENTS: &str = "CREATE TABLE IF NOT EXISTS documents (
    url TEXT PRIMARY KEY,
    pub_date BIGINT NOT NULL,
    fetch_time BIGINT NOT NULL,
    text TEXT NOT NULL,
    first_fetch_time BIGINT NOT NULL
)";

/// Remove all rows (tests and local resets)
pub const TRUNCATE_DOCUMENTS: &str = "TRUNCATE TABLE documents";
