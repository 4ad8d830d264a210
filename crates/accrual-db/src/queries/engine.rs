//! Engine-level persistence: identity, global record, whole snapshots and
//! per-operation commits.
//!
//! Multi-table writes run inside a single SQLite transaction so that a crash
//! never leaves the global record out of step with participant rows.

use rusqlite::{Connection, OptionalExtension};

use accrual_engine::{EngineSnapshot, GlobalAccrualState, ParticipantState};
use accrual_types::events::AccrualEvent;
use accrual_types::{AccountId, Amount, BlockHeight};
use accrual_vault::Vault;

use crate::codec::{
    decode_account, decode_amount, decode_block, decode_token, encode_amount, encode_block,
};
use crate::queries::{access, ledger, notifications, participants, settings, source};
use crate::{DbError, Result};

/// Everything one committed engine operation changed.
#[derive(Debug, Default)]
pub struct Commit<'a> {
    pub block: BlockHeight,
    pub global: Option<&'a GlobalAccrualState>,
    pub participants: &'a [(AccountId, ParticipantState)],
    pub balances: &'a [(AccountId, Amount)],
    pub events: &'a [AccrualEvent],
    /// Serialized reward source state, when the source moved.
    pub source_state: Option<&'a serde_json::Value>,
}

/// Write the engine identity row.
pub fn save_identity(
    conn: &Connection,
    engine_account: &AccountId,
    admin: &AccountId,
    vault: &Vault,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO engine_identity
            (id, engine_account, admin, vault_account, vault_owner, reward_token)
         VALUES (1, ?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            &engine_account.as_bytes()[..],
            &admin.as_bytes()[..],
            &vault.account().as_bytes()[..],
            &vault.owner().as_bytes()[..],
            &vault.token().as_bytes()[..],
        ],
    )?;
    Ok(())
}

/// Write the global accrual record.
pub fn save_global(conn: &Connection, global: &GlobalAccrualState) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO accrual_global
            (id, total_weight, acc_reward_per_weight, tracked_vault_balance, last_update_block)
         VALUES (1, ?1, ?2, ?3, ?4)",
        rusqlite::params![
            encode_amount(&global.total_weight),
            encode_amount(&global.acc_reward_per_weight),
            encode_amount(&global.tracked_vault_balance),
            encode_block(global.last_update_block)?,
        ],
    )?;
    Ok(())
}

/// Read the global accrual record.
pub fn load_global(conn: &Connection) -> Result<GlobalAccrualState> {
    let (total, acc, tracked, last): (String, String, String, i64) = conn
        .query_row(
            "SELECT total_weight, acc_reward_per_weight, tracked_vault_balance, last_update_block
             FROM accrual_global WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DbError::NotFound("global accrual record".into())
            }
            other => DbError::Sqlite(other),
        })?;

    Ok(GlobalAccrualState {
        total_weight: decode_amount(&total)?,
        acc_reward_per_weight: decode_amount(&acc)?,
        tracked_vault_balance: decode_amount(&tracked)?,
        last_update_block: decode_block(last)?,
    })
}

/// Replace all engine state with `snapshot`.
pub fn save_snapshot(conn: &Connection, snapshot: &EngineSnapshot) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    let block = snapshot.global.last_update_block;

    save_identity(&tx, &snapshot.engine_account, &snapshot.admin, &snapshot.vault)?;
    save_global(&tx, &snapshot.global)?;

    tx.execute("DELETE FROM participants", [])?;
    for (account, state) in &snapshot.participants {
        participants::upsert(&tx, account, state, block)?;
    }

    tx.execute("DELETE FROM authorized_callers", [])?;
    for account in &snapshot.weight_sources {
        access::grant(&tx, account, block)?;
    }

    tx.commit()?;
    tracing::debug!(
        participants = snapshot.participants.len(),
        block,
        "engine snapshot saved"
    );
    Ok(())
}

/// Rebuild a snapshot from storage. `None` on a fresh database.
pub fn load_snapshot(conn: &Connection) -> Result<Option<EngineSnapshot>> {
    let identity: Option<(Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>, Vec<u8>)> = conn
        .query_row(
            "SELECT engine_account, admin, vault_account, vault_owner, reward_token
             FROM engine_identity WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .optional()?;

    let Some((engine, admin, vault_account, vault_owner, token)) = identity else {
        return Ok(None);
    };

    let vault = Vault::new(
        decode_token(&token)?,
        decode_account(&vault_owner)?,
        decode_account(&vault_account)?,
    );

    Ok(Some(EngineSnapshot {
        engine_account: decode_account(&engine)?,
        admin: decode_account(&admin)?,
        vault,
        global: load_global(conn)?,
        participants: participants::list(conn)?,
        weight_sources: access::list(conn)?,
    }))
}

/// Persist one committed operation atomically.
pub fn record_commit(conn: &Connection, commit: &Commit<'_>) -> Result<()> {
    let tx = conn.unchecked_transaction()?;

    if let Some(global) = commit.global {
        save_global(&tx, global)?;
    }
    for (account, state) in commit.participants {
        participants::upsert(&tx, account, state, commit.block)?;
    }
    for (account, amount) in commit.balances {
        ledger::set_balance(&tx, account, amount)?;
    }
    if let Some(state) = commit.source_state {
        source::save(&tx, state)?;
    }
    for event in commit.events {
        match event {
            AccrualEvent::AccessGranted { account, block } => {
                access::grant(&tx, account, *block)?;
            }
            AccrualEvent::AccessRevoked { account, .. } => {
                access::revoke(&tx, account)?;
            }
            _ => {}
        }
        notifications::append(&tx, event)?;
    }
    settings::set_clock_block(&tx, commit.block)?;

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrual_types::TokenId;

    fn snapshot() -> EngineSnapshot {
        let engine = AccountId::derive("engine");
        EngineSnapshot {
            engine_account: engine,
            admin: AccountId::derive("admin"),
            vault: Vault::new(TokenId::derive("reward"), engine, AccountId::derive("vault")),
            global: GlobalAccrualState {
                total_weight: Amount::from(30u64),
                acc_reward_per_weight: Amount::from(10u64).pow(Amount::from(27u64)),
                tracked_vault_balance: Amount::from(12u64),
                last_update_block: 140,
            },
            participants: vec![
                (
                    AccountId::derive("alice"),
                    ParticipantState {
                        weight: Amount::from(10u64),
                        reward_baseline: Amount::from(10u64),
                    },
                ),
                (
                    AccountId::derive("bob"),
                    ParticipantState {
                        weight: Amount::from(20u64),
                        reward_baseline: Amount::from(20u64),
                    },
                ),
            ],
            weight_sources: vec![AccountId::derive("farm")],
        }
    }

    fn sorted(mut s: EngineSnapshot) -> EngineSnapshot {
        s.participants.sort_by(|a, b| a.0.cmp(&b.0));
        s.weight_sources.sort();
        s
    }

    #[test]
    fn test_fresh_database_has_no_snapshot() {
        let conn = crate::open_memory().expect("open");
        assert!(load_snapshot(&conn).expect("load").is_none());
        assert!(matches!(load_global(&conn), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let conn = crate::open_memory().expect("open");
        let original = snapshot();
        save_snapshot(&conn, &original).expect("save");

        let loaded = load_snapshot(&conn).expect("load").expect("present");
        assert_eq!(sorted(loaded), sorted(original));
    }

    #[test]
    fn test_snapshot_replaces_previous() {
        let conn = crate::open_memory().expect("open");
        save_snapshot(&conn, &snapshot()).expect("first");

        let mut next = snapshot();
        next.participants.truncate(1);
        next.weight_sources.clear();
        save_snapshot(&conn, &next).expect("second");

        let loaded = load_snapshot(&conn).expect("load").expect("present");
        assert_eq!(loaded.participants.len(), 1);
        assert!(loaded.weight_sources.is_empty());
    }

    #[test]
    fn test_record_commit() {
        let conn = crate::open_memory().expect("open");
        save_snapshot(&conn, &snapshot()).expect("seed");

        let alice = AccountId::derive("alice");
        let carol = AccountId::derive("carol");
        let vault = AccountId::derive("vault");
        let mut global = snapshot().global;
        global.last_update_block = 150;

        let touched = [(
            alice,
            ParticipantState {
                weight: Amount::from(10u64),
                reward_baseline: Amount::from(13u64),
            },
        )];
        let balances = [(vault, Amount::from(4u64)), (alice, Amount::from(3u64))];
        let events = [
            AccrualEvent::RewardsPaid {
                block: 150,
                participant: alice,
                amount: Amount::from(3u64),
            },
            AccrualEvent::AccessGranted {
                block: 150,
                account: carol,
            },
        ];

        record_commit(
            &conn,
            &Commit {
                block: 150,
                global: Some(&global),
                participants: &touched,
                balances: &balances,
                events: &events,
                source_state: Some(&serde_json::json!({"rate": "7"})),
            },
        )
        .expect("commit");

        assert_eq!(load_global(&conn).expect("global").last_update_block, 150);
        assert_eq!(
            participants::get(&conn, &alice).expect("alice").reward_baseline,
            Amount::from(13u64)
        );
        assert_eq!(ledger::balance(&conn, &vault).expect("vault"), Amount::from(4u64));
        assert!(access::list(&conn).expect("acl").contains(&carol));
        assert_eq!(notifications::recent(&conn, 10).expect("log").len(), 2);
        assert_eq!(settings::clock_block(&conn).expect("clock"), 150);
        let stored: serde_json::Value = source::load(&conn).expect("load").expect("source");
        assert_eq!(stored["rate"], "7");
    }
}
