//! Settings query functions.
//!
//! Settings are untyped key/value rows. The daemon's own keys have typed
//! accessors below.

use std::str::FromStr;

use rusqlite::Connection;

use accrual_types::BlockHeight;

use crate::{DbError, Result};

const CLOCK_BLOCK: &str = "clock_block";
const BOOTSTRAP_COMPLETE: &str = "bootstrap_complete";

/// Get a setting value by key.
pub fn get(conn: &Connection, key: &str) -> Result<String> {
    conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
        row.get(0)
    })
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("setting '{key}'")),
        other => DbError::Sqlite(other),
    })
}

/// Set a setting value.
pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Parse a setting, falling back to `default` when the key is absent.
pub fn get_parsed<T>(conn: &Connection, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(conn, key) {
        Ok(v) => v
            .parse()
            .map_err(|e: T::Err| DbError::Serialization(format!("setting '{key}': {e}"))),
        Err(DbError::NotFound(_)) => Ok(default),
        Err(e) => Err(e),
    }
}

/// Last block height the daemon recorded.
pub fn clock_block(conn: &Connection) -> Result<BlockHeight> {
    get_parsed(conn, CLOCK_BLOCK, 0)
}

pub fn set_clock_block(conn: &Connection, block: BlockHeight) -> Result<()> {
    set(conn, CLOCK_BLOCK, &block.to_string())
}

/// Whether a fresh engine has been created and persisted.
pub fn bootstrap_complete(conn: &Connection) -> Result<bool> {
    get_parsed(conn, BOOTSTRAP_COMPLETE, false)
}

pub fn mark_bootstrapped(conn: &Connection) -> Result<()> {
    set(conn, BOOTSTRAP_COMPLETE, "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_defaults_after_migration() {
        let conn = test_db();
        assert_eq!(clock_block(&conn).expect("clock"), 0);
        assert!(!bootstrap_complete(&conn).expect("flag"));
    }

    #[test]
    fn test_clock_block_roundtrip() {
        let conn = test_db();
        set_clock_block(&conn, 1200).expect("set");
        assert_eq!(clock_block(&conn).expect("get"), 1200);
        mark_bootstrapped(&conn).expect("mark");
        assert!(bootstrap_complete(&conn).expect("flag"));
    }

    #[test]
    fn test_missing_key() {
        let conn = test_db();
        assert!(matches!(get(&conn, "nonexistent"), Err(DbError::NotFound(_))));
        assert_eq!(get_parsed(&conn, "nonexistent", 7u32).expect("default"), 7);
    }

    #[test]
    fn test_malformed_value() {
        let conn = test_db();
        set(&conn, CLOCK_BLOCK, "soon").expect("set");
        assert!(matches!(clock_block(&conn), Err(DbError::Serialization(_))));
    }
}
