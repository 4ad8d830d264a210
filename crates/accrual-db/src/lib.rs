//! # accrual-db
//!
//! SQLite store behind the accrual daemon, one file at
//! `$ACCRUAL_DATA_DIR/accrual.db`.
//!
//! What is kept is exactly what a restart needs to resume accrual: the global
//! row, a row per participant that was ever given a weight (never pruned),
//! the weight-source allow-list, ledger balances and the reward source's own
//! state. The notification log is written alongside for auditing and is never
//! read back into the engine.
//!
//! Column conventions live in [`codec`]: 256-bit amounts are decimal TEXT,
//! account and token ids are 32-byte BLOBs. The schema version is
//! `PRAGMA user_version`, see [`migrations`].

pub mod codec;
pub mod migrations;
pub mod queries;
pub mod schema;

use std::path::Path;

use rusqlite::Connection;

/// Schema version this build reads and writes.
pub const SCHEMA_VERSION: u32 = 1;

/// Storage failures.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// SQLite refused a statement.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The file's schema cannot be brought to [`SCHEMA_VERSION`].
    #[error("migration failed: {0}")]
    Migration(String),

    /// A row the caller required is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored value does not decode.
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open the database file at `path`, creating and migrating it as needed.
pub fn open(path: &Path) -> Result<Connection> {
    prepare(Connection::open(path)?)
}

/// A private in-memory database with the full schema.
pub fn open_memory() -> Result<Connection> {
    prepare(Connection::open_in_memory()?)
}

/// Commits must survive power loss, so `synchronous` stays at FULL even in
/// WAL mode.
fn prepare(conn: Connection) -> Result<Connection> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = FULL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    migrations::run(&conn)?;
    Ok(conn)
}
