//! Diagnostics command handlers.

use std::sync::Arc;

use serde_json::Value;

use super::{amount_json, param_account};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

const MAX_NOTIFICATIONS: u32 = 1000;

/// Current block height.
pub async fn current_block(state: &Arc<DaemonState>) -> Result {
    Ok(serde_json::json!({"block": state.clock.current()}))
}

/// Recent entries from the notification audit log, newest first.
pub async fn get_notifications(state: &Arc<DaemonState>, params: &Value) -> Result {
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|l| l.min(u64::from(MAX_NOTIFICATIONS)) as u32)
        .unwrap_or(100);

    let db = state.db.lock().await;
    let entries = if params.get("account").is_some() {
        let account = param_account(params, "account")?;
        accrual_db::queries::notifications::for_account(&db, &account, limit)?
    } else {
        accrual_db::queries::notifications::recent(&db, limit)?
    };

    let result: Vec<Value> = entries
        .iter()
        .map(|entry| {
            serde_json::json!({
                "seq": entry.seq,
                "event": entry.event,
            })
        })
        .collect();
    Ok(serde_json::json!(result))
}

/// Export a diagnostics bundle.
pub async fn export_diagnostics(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    let global = *engine.global();
    let vault_balance = engine.vault_balance();
    let participants = engine.participant_count();
    let total_supply = engine.ledger().total_supply();
    drop(engine);

    Ok(serde_json::json!({
        "diagnostics": {
            "version": env!("CARGO_PKG_VERSION"),
            "block": state.clock.current(),
            "last_update_block": global.last_update_block,
            "participants": participants,
            "total_weight": amount_json(&global.total_weight),
            "tracked_vault_balance": amount_json(&global.tracked_vault_balance),
            "vault_balance": amount_json(&vault_balance),
            "token_supply": amount_json(&total_supply),
            "events_emitted": state.event_bus.sequence(),
        }
    }))
}

/// Ask the daemon to stop.
pub async fn shutdown(state: &Arc<DaemonState>) -> Result {
    let _ = state.shutdown_tx.send(());
    Ok(serde_json::json!({"stopping": true}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_block() {
        let state = crate::tests::test_state().await;
        state.clock.advance(3);
        let resp = current_block(&state).await.expect("block");
        assert_eq!(resp["block"], 3);
    }

    #[tokio::test]
    async fn test_notifications_filtered() {
        let state = crate::tests::test_state().await;
        let source = state.config.weight_sources()[0].to_hex();
        for who in ["alice", "bob"] {
            crate::commands::accrual::set_weight(
                &state,
                &serde_json::json!({"caller": source, "participant": who, "weight": 1}),
            )
            .await
            .expect("set weight");
        }

        let all = get_notifications(&state, &serde_json::json!({})).await.expect("all");
        let alice = get_notifications(&state, &serde_json::json!({"account": "alice"}))
            .await
            .expect("alice");
        assert!(all.as_array().expect("array").len() >= 2);
        assert_eq!(alice.as_array().expect("array").len(), 1);
        assert_eq!(alice[0]["event"]["type"], "weight_set");
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let state = crate::tests::test_state().await;
        let mut rx = state.shutdown_tx.subscribe();
        shutdown(&state).await.expect("shutdown");
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_export_diagnostics() {
        let state = crate::tests::test_state().await;
        let resp = export_diagnostics(&state).await.expect("diagnostics");
        assert_eq!(resp["diagnostics"]["participants"], 0);
        assert_eq!(resp["diagnostics"]["vault_balance"], "0");
        assert_eq!(resp["diagnostics"]["token_supply"], "1000");
    }
}
