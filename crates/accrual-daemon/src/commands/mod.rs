//! IPC command handlers.
//!
//! Each submodule implements the commands for one IPC category. Mutating
//! commands go through [`mutate`]: the engine lock is held across the
//! operation and its persistence, so the database never sees two operations
//! interleave, and an operation whose write fails is undone in memory too.

pub mod accrual;
pub mod admin;
pub mod diagnostics;

use serde_json::Value;
use tracing::error;

use accrual_db::queries::engine::Commit;
use accrual_types::units::parse_amount;
use accrual_types::{AccountId, Amount, BlockHeight};
use accrual_vault::TokenLedger;

use crate::bootstrap::Engine;
use crate::config::resolve_account;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Read an account parameter: 64 hex characters or a label.
pub(crate) fn param_account(params: &Value, key: &str) -> Result<AccountId, RpcError> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(resolve_account)
        .ok_or_else(|| RpcError::invalid_params(&format!("{key} required")))
}

/// Read an amount parameter: a JSON integer, or a decimal / `0x` hex string.
pub(crate) fn param_amount(params: &Value, key: &str) -> Result<Amount, RpcError> {
    match params.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .map(Amount::from)
            .ok_or_else(|| RpcError::invalid_params(&format!("{key} must be a non-negative integer"))),
        Some(Value::String(s)) => {
            parse_amount(s).map_err(|e| RpcError::invalid_params(&format!("{key}: {e}")))
        }
        _ => Err(RpcError::invalid_params(&format!("{key} required"))),
    }
}

/// Amounts go out as decimal strings; JSON numbers cannot hold 256 bits.
pub(crate) fn amount_json(amount: &Amount) -> Value {
    Value::String(amount.to_string())
}

/// Run `op` against the engine and persist what it changed.
///
/// If the database refuses the write, the engine, its ledger and its reward
/// source are put back to where they were before `op`, and the operation's
/// notifications are dropped unbroadcast.
pub(crate) async fn mutate<T>(
    state: &DaemonState,
    engine: &mut Engine,
    block: BlockHeight,
    touched: &[AccountId],
    op: impl FnOnce(&mut Engine) -> Result<T, RpcError>,
) -> Result<T, RpcError> {
    let snapshot = engine.snapshot();
    let ledger = engine.ledger().clone();
    let source = engine.source().clone();

    let value = op(engine)?;

    if let Err(err) = persist(state, engine, block, touched).await {
        error!(block, code = err.code, error = %err.message, detail = ?err.data, "commit not persisted, rolling engine back");
        *engine = Engine::from_snapshot(snapshot, ledger, source)
            .map_err(|e| RpcError::internal_error(&format!("engine rollback failed: {e}")))?;
        return Err(err);
    }
    Ok(value)
}

/// Persist what the last committed operation changed and broadcast its
/// notifications.
///
/// `touched` lists the participants and ledger accounts the operation may
/// have changed besides the vault and the reward source. Accounts without a
/// participant record get none written.
async fn persist(
    state: &DaemonState,
    engine: &mut Engine,
    block: BlockHeight,
    touched: &[AccountId],
) -> Result<(), RpcError> {
    let events = engine.drain_events();

    let participants: Vec<(AccountId, _)> = touched
        .iter()
        .filter_map(|account| engine.find_participant(account).map(|p| (*account, p)))
        .collect();

    let mut accounts = vec![engine.vault().account(), engine.source().account()];
    accounts.extend_from_slice(touched);
    accounts.sort();
    accounts.dedup();
    let balances: Vec<(AccountId, Amount)> = accounts
        .into_iter()
        .map(|account| (account, engine.ledger().balance_of(&account)))
        .collect();

    let source_state = serde_json::to_value(engine.source())
        .map_err(|e| RpcError::internal_error(&format!("source state: {e}")))?;
    let global = *engine.global();

    {
        let db = state.db.lock().await;
        accrual_db::queries::engine::record_commit(
            &db,
            &Commit {
                block,
                global: Some(&global),
                participants: &participants,
                balances: &balances,
                events: &events,
                source_state: Some(&source_state),
            },
        )?;
    }

    for event in &events {
        state.event_bus.emit_accrual(event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_amount_forms() {
        let params = serde_json::json!({"a": 12, "b": "340", "c": "0xff", "d": -1, "e": "x"});
        assert_eq!(param_amount(&params, "a").expect("a"), Amount::from(12u64));
        assert_eq!(param_amount(&params, "b").expect("b"), Amount::from(340u64));
        assert_eq!(param_amount(&params, "c").expect("c"), Amount::from(255u64));
        assert!(param_amount(&params, "d").is_err());
        assert!(param_amount(&params, "e").is_err());
        assert!(param_amount(&params, "missing").is_err());
    }

    #[test]
    fn test_param_account() {
        let alice = AccountId::derive("alice");
        let params = serde_json::json!({"hex": alice.to_hex(), "label": "alice", "empty": ""});
        assert_eq!(param_account(&params, "hex").expect("hex"), alice);
        assert_eq!(param_account(&params, "label").expect("label"), alice);
        assert!(param_account(&params, "empty").is_err());
    }
}
