//! Notification audit log queries.
//!
//! The log is append-only from the daemon's point of view and is never read
//! back into engine state.

use rusqlite::Connection;

use accrual_types::events::AccrualEvent;
use accrual_types::{AccountId, BlockHeight};

use crate::codec::{decode_block, encode_block};
use crate::{DbError, Result};

/// A stored notification with its sequence number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggedEvent {
    pub seq: i64,
    pub event: AccrualEvent,
}

/// Append one notification. Returns its sequence number.
pub fn append(conn: &Connection, event: &AccrualEvent) -> Result<i64> {
    let payload =
        serde_json::to_string(event).map_err(|e| DbError::Serialization(e.to_string()))?;
    let subject = event.subject().map(|s| s.as_bytes().to_vec());
    conn.execute(
        "INSERT INTO notification_log (event_type, block, subject, payload)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            event.event_type().as_str(),
            encode_block(event.block())?,
            subject,
            payload,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Most recent notifications, newest first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<LoggedEvent>> {
    collect(
        conn,
        "SELECT seq, payload FROM notification_log ORDER BY seq DESC LIMIT ?1",
        rusqlite::params![limit],
    )
}

/// Notifications concerning `account`, newest first.
pub fn for_account(conn: &Connection, account: &AccountId, limit: u32) -> Result<Vec<LoggedEvent>> {
    collect(
        conn,
        "SELECT seq, payload FROM notification_log
         WHERE subject = ?1 ORDER BY seq DESC LIMIT ?2",
        rusqlite::params![&account.as_bytes()[..], limit],
    )
}

/// Notifications recorded at or after `block`, oldest first.
pub fn since_block(conn: &Connection, block: BlockHeight) -> Result<Vec<LoggedEvent>> {
    collect(
        conn,
        "SELECT seq, payload FROM notification_log WHERE block >= ?1 ORDER BY seq ASC",
        rusqlite::params![encode_block(block)?],
    )
}

/// Delete notifications recorded before `block`. Returns the number removed.
pub fn prune_before(conn: &Connection, block: BlockHeight) -> Result<usize> {
    let removed = conn.execute(
        "DELETE FROM notification_log WHERE block < ?1",
        [encode_block(block)?],
    )?;
    Ok(removed)
}

/// Height of the newest notification, if any.
pub fn latest_block(conn: &Connection) -> Result<Option<BlockHeight>> {
    let max: Option<i64> =
        conn.query_row("SELECT MAX(block) FROM notification_log", [], |row| row.get(0))?;
    max.map(decode_block).transpose()
}

fn collect(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<LoggedEvent>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (seq, payload) = row?;
        let event = serde_json::from_str(&payload)
            .map_err(|e| DbError::Serialization(e.to_string()))?;
        out.push(LoggedEvent { seq, event });
    }
    Ok(out)
}
