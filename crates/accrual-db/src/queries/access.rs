//! Weight-source allow-list queries.

use rusqlite::Connection;

use accrual_types::{AccountId, BlockHeight};

use crate::codec::{decode_account, encode_block};
use crate::Result;

/// Record `account` as an authorized weight source. Returns `true` if newly added.
pub fn grant(conn: &Connection, account: &AccountId, block: BlockHeight) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO authorized_callers (account, granted_block) VALUES (?1, ?2)",
        rusqlite::params![&account.as_bytes()[..], encode_block(block)?],
    )?;
    Ok(changed > 0)
}

/// Remove `account` from the allow-list. Returns `true` if it was present.
pub fn revoke(conn: &Connection, account: &AccountId) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM authorized_callers WHERE account = ?1",
        [&account.as_bytes()[..]],
    )?;
    Ok(changed > 0)
}

/// Every authorized weight source, ordered by account.
pub fn list(conn: &Connection) -> Result<Vec<AccountId>> {
    let mut stmt = conn.prepare("SELECT account FROM authorized_callers ORDER BY account")?;
    let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;

    let mut out = Vec::new();
    for row in rows {
        out.push(decode_account(&row?)?);
    }
    Ok(out)
}
