//! Schema migrations keyed on `PRAGMA user_version`.
//!
//! Version 0 means an empty file: the full current schema and the default
//! settings are installed in one transaction. Later versions step forward one
//! at a time; there is no downgrade path, and a file written by a newer build
//! is refused rather than guessed at.

use std::cmp::Ordering;

use rusqlite::Connection;

use crate::{schema, DbError, Result, SCHEMA_VERSION};

/// Settings every fresh database starts with.
const DEFAULT_SETTINGS: &[(&str, &str)] = &[("clock_block", "0"), ("bootstrap_complete", "false")];

/// Bring `conn` up to [`SCHEMA_VERSION`].
pub fn run(conn: &Connection) -> Result<()> {
    let found = schema_version(conn)?;

    match found.cmp(&SCHEMA_VERSION) {
        Ordering::Equal => Ok(()),
        Ordering::Greater => Err(DbError::Migration(format!(
            "database is at schema v{found}, this build understands up to v{SCHEMA_VERSION}"
        ))),
        Ordering::Less if found == 0 => install(conn),
        Ordering::Less => {
            for target in found + 1..=SCHEMA_VERSION {
                tracing::info!(from = target - 1, to = target, "migrating accrual schema");
                let tx = conn.unchecked_transaction()?;
                step(&tx, target)?;
                tx.pragma_update(None, "user_version", target)?;
                tx.commit()?;
            }
            Ok(())
        }
    }
}

/// Schema version recorded in the file.
pub fn schema_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

fn install(conn: &Connection) -> Result<()> {
    tracing::info!(version = SCHEMA_VERSION, "creating accrual schema");
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(schema::SCHEMA_V1)?;
    {
        let mut insert =
            tx.prepare("INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)")?;
        for (key, value) in DEFAULT_SETTINGS {
            insert.execute(rusqlite::params![key, value])?;
        }
    }
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}

/// Upgrade from `target - 1` to `target`. No upgrade steps exist while v1 is
/// the only schema.
fn step(_conn: &Connection, target: u32) -> Result<()> {
    Err(DbError::Migration(format!("no upgrade step to schema v{target}")))
}
