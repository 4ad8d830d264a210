//! Accrual command handlers.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use accrual_engine::{CallContext, RewardSource};

use super::{amount_json, mutate, param_account, param_amount};
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Set a participant's weight. Caller must be an authorized weight source.
pub async fn set_weight(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = param_account(params, "caller")?;
    let participant = param_account(params, "participant")?;
    let weight = param_amount(params, "weight")?;

    let mut engine = state.engine.lock().await;
    let ctx = CallContext::new(caller, state.clock.current());
    let paid = mutate(state, &mut engine, ctx.block, &[participant], |engine| {
        Ok(engine.set_weight(&ctx, &participant, weight)?)
    })
    .await?;

    info!(participant = %participant, weight = %weight, block = ctx.block, "weight set via rpc");
    Ok(serde_json::json!({
        "participant": participant.to_hex(),
        "weight": amount_json(&weight),
        "paid": amount_json(&paid),
        "block": ctx.block,
    }))
}

/// Pay the caller everything they have accrued.
pub async fn claim(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = param_account(params, "caller")?;

    let mut engine = state.engine.lock().await;
    let ctx = CallContext::new(caller, state.clock.current());
    let paid = mutate(state, &mut engine, ctx.block, &[caller], |engine| {
        Ok(engine.claim(&ctx)?)
    })
    .await?;

    Ok(serde_json::json!({
        "participant": caller.to_hex(),
        "paid": amount_json(&paid),
        "block": ctx.block,
    }))
}

/// Bring the accumulator up to the current block. Anyone may call.
pub async fn update_pool(state: &Arc<DaemonState>, params: &Value) -> Result {
    let caller = param_account(params, "caller").unwrap_or_default();

    let mut engine = state.engine.lock().await;
    let ctx = CallContext::new(caller, state.clock.current());
    mutate(state, &mut engine, ctx.block, &[], |engine| {
        Ok(engine.update_pool(&ctx)?)
    })
    .await?;

    global_json(&engine)
}

/// Projected reward for a participant at the current (or given) block.
pub async fn pending_reward(state: &Arc<DaemonState>, params: &Value) -> Result {
    let participant = param_account(params, "participant")?;
    let block = params
        .get("block")
        .and_then(|v| v.as_u64())
        .unwrap_or_else(|| state.clock.current());

    let engine = state.engine.lock().await;
    let pending = engine.pending_reward(&participant, block)?;

    Ok(serde_json::json!({
        "participant": participant.to_hex(),
        "pending": amount_json(&pending),
        "block": block,
    }))
}

/// Advertised reward per weight unit per block, scaled by 10^18.
pub async fn reward_rate(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    let rate = engine.reward_rate()?;
    Ok(serde_json::json!({
        "rate_per_weight_wad": amount_json(&rate),
        "source_rate_per_block": amount_json(&engine.source().advertised_rate_per_block()),
    }))
}

/// The global accrual record.
pub async fn get_global_state(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    global_json(&engine)
}

/// One participant's record. Unknown participants read as zero.
pub async fn get_participant(state: &Arc<DaemonState>, params: &Value) -> Result {
    let participant = param_account(params, "participant")?;
    let engine = state.engine.lock().await;
    let p = engine.participant(&participant);
    Ok(serde_json::json!({
        "participant": participant.to_hex(),
        "weight": amount_json(&p.weight),
        "reward_baseline": amount_json(&p.reward_baseline),
    }))
}

/// Current vault balance against the tracked figure.
pub async fn get_vault_balance(state: &Arc<DaemonState>) -> Result {
    let engine = state.engine.lock().await;
    Ok(serde_json::json!({
        "vault": engine.vault().account().to_hex(),
        "balance": amount_json(&engine.vault_balance()),
        "tracked": amount_json(&engine.global().tracked_vault_balance),
    }))
}

fn global_json(engine: &crate::bootstrap::Engine) -> Result {
    let g = engine.global();
    Ok(serde_json::json!({
        "total_weight": amount_json(&g.total_weight),
        "acc_reward_per_weight": amount_json(&g.acc_reward_per_weight),
        "tracked_vault_balance": amount_json(&g.tracked_vault_balance),
        "last_update_block": g.last_update_block,
        "participants": engine.participant_count(),
    }))
}
