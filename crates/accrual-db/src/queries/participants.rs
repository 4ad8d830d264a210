//! Participant record queries.

use rusqlite::{Connection, OptionalExtension};

use accrual_engine::ParticipantState;
use accrual_types::{AccountId, Amount, BlockHeight};

use crate::codec::{decode_account, decode_amount, encode_amount, encode_block};
use crate::{DbError, Result};

/// Insert or overwrite a participant record.
pub fn upsert(
    conn: &Connection,
    account: &AccountId,
    state: &ParticipantState,
    block: BlockHeight,
) -> Result<()> {
    conn.execute(
        "INSERT INTO participants (account, weight, reward_baseline, updated_block)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(account) DO UPDATE SET
            weight = excluded.weight,
            reward_baseline = excluded.reward_baseline,
            updated_block = excluded.updated_block",
        rusqlite::params![
            &account.as_bytes()[..],
            encode_amount(&state.weight),
            encode_amount(&state.reward_baseline),
            encode_block(block)?,
        ],
    )?;
    Ok(())
}

/// Fetch a participant record.
pub fn get(conn: &Connection, account: &AccountId) -> Result<ParticipantState> {
    find(conn, account)?.ok_or_else(|| DbError::NotFound(format!("participant {account}")))
}

/// Fetch a participant record if one has ever been written.
pub fn find(conn: &Connection, account: &AccountId) -> Result<Option<ParticipantState>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT weight, reward_baseline FROM participants WHERE account = ?1",
            [&account.as_bytes()[..]],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    row.map(|(weight, baseline)| {
        Ok(ParticipantState {
            weight: decode_amount(&weight)?,
            reward_baseline: decode_amount(&baseline)?,
        })
    })
    .transpose()
}

/// All participant records, ordered by account.
pub fn list(conn: &Connection) -> Result<Vec<(AccountId, ParticipantState)>> {
    let mut stmt = conn.prepare(
        "SELECT account, weight, reward_baseline FROM participants ORDER BY account",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, Vec<u8>>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (account, weight, baseline) = row?;
        out.push((
            decode_account(&account)?,
            ParticipantState {
                weight: decode_amount(&weight)?,
                reward_baseline: decode_amount(&baseline)?,
            },
        ));
    }
    Ok(out)
}

/// Number of participant records.
pub fn count(conn: &Connection) -> Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM participants", [], |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

/// Sum of stored weights.
///
/// SQLite cannot add 256-bit TEXT values, so the sum is folded here.
pub fn total_weight(conn: &Connection) -> Result<Amount> {
    list(conn)?
        .iter()
        .try_fold(Amount::zero(), |acc, (_, p)| acc.checked_add(p.weight))
        .ok_or_else(|| DbError::Serialization("stored weights overflow".into()))
}
