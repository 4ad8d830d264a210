//! Administration command handlers.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use accrual_engine::{AccrualError, CallContext};
use accrual_vault::TokenLedger;

use super::{amount_json, mutate, param_account, param_amount};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Add an account to the weight-source allow-list. Admin only.
pub async fn grant_weight_source(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = param_account(params, "caller")?;
    let account = param_account(params, "account")?;

    let mut engine = state.engine.lock().await;
    let ctx = CallContext::new(caller, state.clock.current());
    let added = mutate(state, &mut engine, ctx.block, &[], |engine| {
        Ok(engine.grant_weight_source(&ctx, &account)?)
    })
    .await?;

    Ok(serde_json::json!({"account": account.to_hex(), "changed": added}))
}

/// Remove an account from the weight-source allow-list. Admin only.
pub async fn revoke_weight_source(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = param_account(params, "caller")?;
    let account = param_account(params, "account")?;

    let mut engine = state.engine.lock().await;
    let ctx = CallContext::new(caller, state.clock.current());
    let removed = mutate(state, &mut engine, ctx.block, &[], |engine| {
        Ok(engine.revoke_weight_source(&ctx, &account)?)
    })
    .await?;

    Ok(serde_json::json!({"account": account.to_hex(), "changed": removed}))
}

/// Current allow-list.
pub async fn get_weight_sources(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    let members: Vec<String> = engine.weight_sources().members().map(|a| a.to_hex()).collect();
    Ok(serde_json::json!(members))
}

/// Mint new reward tokens into the reward source's account.
///
/// The daemon's ledger is in-process, so this is how operators top the
/// source up. Reward scheduled but not yet delivered is paid out of the new
/// funds first.
pub async fn fund_source(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = param_account(params, "caller")?;
    let amount = param_amount(params, "amount")?;

    let mut engine = state.engine.lock().await;
    if caller != engine.admin() {
        return Err(AccrualError::Unauthorized {
            caller,
            action: "fund_source",
        }
        .into());
    }

    let source_account = engine.source().account();
    let block = state.clock.current();
    mutate(state, &mut engine, block, &[], |engine| {
        engine
            .ledger_mut()
            .mint(&source_account, amount)
            .map_err(|e| RpcError::transfer_failed(e.to_string()))
    })
    .await?;

    let balance = engine.ledger().balance_of(&source_account);
    info!(%amount, balance = %balance, "reward source funded");
    Ok(serde_json::json!({
        "source": source_account.to_hex(),
        "balance": amount_json(&balance),
        "owed": amount_json(&engine.source().owed()),
    }))
}

/// Change the reward source's per-block rate from the current block. Admin only.
pub async fn set_source_rate(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = param_account(params, "caller")?;
    let rate = param_amount(params, "rate_per_block")?;

    let mut engine = state.engine.lock().await;
    if caller != engine.admin() {
        return Err(AccrualError::Unauthorized {
            caller,
            action: "set_source_rate",
        }
        .into());
    }

    let block = state.clock.current();
    mutate(state, &mut engine, block, &[], |engine| {
        engine.source_mut().set_rate(rate, block);
        Ok(())
    })
    .await?;

    Ok(serde_json::json!({"rate_per_block": amount_json(&rate), "block": block}))
}
